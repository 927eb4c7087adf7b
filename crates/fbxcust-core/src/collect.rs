//! Scene collection
//!
//! Filters the scene's objects by type and selection and builds the ordered
//! export set every later stage indexes into. Parent and armature links are
//! name lookups resolved here into indices of the export set.

use crate::config::ExportConfig;
use crate::scene::{ArmatureData, MeshData, ObjectData, ObjectKind, Scene, SceneObject};
use crate::warning::{Warning, Warnings};
use glam::Mat4;
use std::collections::{HashMap, HashSet};

/// Hands out names that are unique within one file
#[derive(Debug, Clone, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name`, or the first free `name.NNN` variant
    pub fn claim(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{name}.{n:03}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// An object accepted for export
#[derive(Debug, Clone)]
pub struct ExportObject<'a> {
    /// Unique name in the output file
    pub name: String,
    pub source: &'a SceneObject,
    /// Nearest exported ancestor
    pub parent: Option<usize>,
    /// Exported armature deforming this mesh
    pub armature: Option<usize>,
    /// Mesh to write, after the modifier choice
    pub mesh: Option<&'a MeshData>,
    pub world: Mat4,
    /// Transform relative to `parent`; the global matrix is applied to roots
    pub local: Mat4,
}

impl ExportObject<'_> {
    pub fn kind(&self) -> ObjectKind {
        self.source.kind()
    }

    pub fn armature_data(&self) -> Option<&ArmatureData> {
        match &self.source.data {
            ObjectData::Armature(armature) => Some(armature),
            _ => None,
        }
    }
}

/// Ordered objects of one export run
#[derive(Debug, Clone, Default)]
pub struct ExportSet<'a> {
    pub objects: Vec<ExportObject<'a>>,
    /// Names already taken in the output file
    pub names: UniqueNames,
}

impl ExportSet<'_> {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn count(&self, kind: ObjectKind) -> usize {
        self.objects.iter().filter(|o| o.kind() == kind).count()
    }

    /// Index of the exported object that came from the scene object `name`
    pub fn position(&self, source_name: &str) -> Option<usize> {
        self.objects.iter().position(|o| o.source.name == source_name)
    }
}

/// Build the export set in document order
pub fn collect<'a>(
    scene: &'a Scene,
    config: &ExportConfig,
    global: Mat4,
    warnings: &mut Warnings,
) -> ExportSet<'a> {
    let mut set = ExportSet::default();

    for object in &scene.objects {
        if !config.exports(object.kind()) || (config.use_selection && !object.selected) {
            continue;
        }

        let mesh = match &object.data {
            ObjectData::Mesh(mesh) => {
                let data = mesh.resolve(config.apply_modifiers);
                if let Err(reason) = data.validate() {
                    warnings.push(Warning::InvalidMesh {
                        object: object.name.clone(),
                        reason,
                    });
                    continue;
                }
                Some(data)
            }
            _ => None,
        };

        let name = set.names.claim(&object.name);
        if name != object.name {
            warnings.push(Warning::RenamedObject {
                object: object.name.clone(),
                renamed: name.clone(),
            });
        }

        set.objects.push(ExportObject {
            name,
            source: object,
            parent: None,
            armature: None,
            mesh,
            world: object.world(),
            local: Mat4::IDENTITY,
        });
    }

    if set.is_empty() && config.use_selection {
        warnings.push(Warning::EmptySelection);
    }

    // First exported object per source name
    let mut exported: HashMap<&str, usize> = HashMap::new();
    for (i, object) in set.objects.iter().enumerate() {
        exported.entry(object.source.name.as_str()).or_insert(i);
    }
    let by_name: HashMap<&str, &SceneObject> = scene
        .objects
        .iter()
        .rev()
        .map(|o| (o.name.as_str(), o))
        .collect();

    for i in 0..set.objects.len() {
        let source = set.objects[i].source;
        let parent = exported_ancestor(source, &by_name, &exported, warnings);
        let armature = source
            .armature
            .as_deref()
            .and_then(|name| exported.get(name).copied())
            .filter(|&a| set.objects[a].kind() == ObjectKind::Armature);

        let object = &mut set.objects[i];
        object.parent = parent;
        object.armature = armature;
    }

    for i in 0..set.objects.len() {
        let local = match set.objects[i].parent {
            Some(p) => set.objects[p].world.inverse() * set.objects[i].world,
            None => global * set.objects[i].world,
        };
        set.objects[i].local = local;
    }

    tracing::debug!(
        "Collected {} of {} objects from scene '{}'",
        set.len(),
        scene.objects.len(),
        scene.name
    );
    set
}

/// Walk parent links until an exported object is found
///
/// Links to unknown objects and cycles end the walk with a warning; the
/// object then becomes a root.
fn exported_ancestor(
    object: &SceneObject,
    by_name: &HashMap<&str, &SceneObject>,
    exported: &HashMap<&str, usize>,
    warnings: &mut Warnings,
) -> Option<usize> {
    let mut visited: HashSet<&str> = HashSet::from([object.name.as_str()]);
    let mut link = object.parent.as_deref();

    while let Some(name) = link {
        let Some(parent) = by_name.get(name) else {
            warnings.push(Warning::BrokenParent {
                object: object.name.clone(),
                parent: name.to_string(),
            });
            return None;
        };
        if !visited.insert(name) {
            warnings.push(Warning::BrokenParent {
                object: object.name.clone(),
                parent: name.to_string(),
            });
            return None;
        }
        if let Some(&index) = exported.get(name) {
            return Some(index);
        }
        link = parent.parent.as_deref();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ArmatureData, MeshObject, Polygon};
    use glam::Vec3;

    fn tri() -> ObjectData {
        ObjectData::Mesh(MeshObject::new(MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![Polygon::new([0, 1, 2])],
        )))
    }

    fn all_types() -> ExportConfig {
        ExportConfig::default().with_object_types(ObjectKind::ALL)
    }

    #[test]
    fn test_type_and_selection_filters() {
        let scene = Scene::new("S")
            .with_object(SceneObject::new("Cam", ObjectData::Camera(Default::default())))
            .with_object(SceneObject::new("A", tri()))
            .with_object(SceneObject::new("B", tri()).with_selected(false));
        let mut warnings = Warnings::new();

        let set = collect(&scene, &ExportConfig::default(), Mat4::IDENTITY, &mut warnings);
        let names: Vec<_> = set.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["A"]);

        let config = all_types().with_selection(false);
        let set = collect(&scene, &config, Mat4::IDENTITY, &mut warnings);
        let names: Vec<_> = set.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Cam", "A", "B"]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_empty_selection_warns() {
        let scene = Scene::new("S").with_object(SceneObject::new("A", tri()).with_selected(false));
        let mut warnings = Warnings::new();
        let set = collect(&scene, &ExportConfig::default(), Mat4::IDENTITY, &mut warnings);

        assert!(set.is_empty());
        assert_eq!(warnings.into_vec(), vec![Warning::EmptySelection]);
    }

    #[test]
    fn test_parent_skips_unexported_ancestors() {
        let offset = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0));
        let scene = Scene::new("S")
            .with_object(SceneObject::new("Root", tri()))
            .with_object(SceneObject::new("Null", ObjectData::Empty).with_parent("Root"))
            .with_object(SceneObject::new("Leaf", tri()).with_parent("Null").with_world(offset));
        let mut warnings = Warnings::new();
        let set = collect(&scene, &ExportConfig::default(), Mat4::IDENTITY, &mut warnings);

        assert_eq!(set.len(), 2);
        assert_eq!(set.objects[1].parent, Some(0));
        assert!(set.objects[1].local.abs_diff_eq(offset, 1e-6));
    }

    #[test]
    fn test_global_applies_to_roots_only() {
        let global = Mat4::from_scale(Vec3::splat(2.0));
        let scene = Scene::new("S")
            .with_object(SceneObject::new("Root", tri()))
            .with_object(SceneObject::new("Child", tri()).with_parent("Root"));
        let mut warnings = Warnings::new();
        let set = collect(&scene, &ExportConfig::default(), global, &mut warnings);

        assert!(set.objects[0].local.abs_diff_eq(global, 1e-6));
        assert!(set.objects[1].local.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_parent_cycle_and_missing_parent() {
        let scene = Scene::new("S")
            .with_object(SceneObject::new("A", tri()).with_parent("Hidden"))
            .with_object(SceneObject::new("Hidden", ObjectData::Empty).with_parent("A"))
            .with_object(SceneObject::new("B", tri()).with_parent("Nowhere"));
        let mut warnings = Warnings::new();
        let set = collect(&scene, &ExportConfig::default(), Mat4::IDENTITY, &mut warnings);

        assert_eq!(set.objects[0].parent, None);
        assert_eq!(set.objects[1].parent, None);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_armature_link() {
        let scene = Scene::new("S")
            .with_object(SceneObject::new("Rig", ObjectData::Armature(ArmatureData::default())))
            .with_object(SceneObject::new("Body", tri()).with_armature("Rig"))
            .with_object(SceneObject::new("Prop", tri()).with_armature("Body"));
        let mut warnings = Warnings::new();
        let set = collect(&scene, &ExportConfig::default(), Mat4::IDENTITY, &mut warnings);

        assert_eq!(set.objects[1].armature, Some(0));
        assert_eq!(set.objects[2].armature, None);
    }

    #[test]
    fn test_invalid_mesh_skipped_and_duplicates_renamed() {
        let broken = ObjectData::Mesh(MeshObject::new(MeshData::new(
            vec![[0.0; 3]],
            vec![Polygon::new([0, 1, 2])],
        )));
        let scene = Scene::new("S")
            .with_object(SceneObject::new("Bad", broken))
            .with_object(SceneObject::new("Dup", tri()))
            .with_object(SceneObject::new("Dup", tri()));
        let mut warnings = Warnings::new();
        let set = collect(&scene, &ExportConfig::default(), Mat4::IDENTITY, &mut warnings);

        let names: Vec<_> = set.objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["Dup", "Dup.001"]);
        assert!(matches!(warnings.iter().next(), Some(Warning::InvalidMesh { .. })));
    }

    #[test]
    fn test_unique_names() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("Bone"), "Bone");
        assert_eq!(names.claim("Bone"), "Bone.001");
        assert_eq!(names.claim("Bone.001"), "Bone.001.001");
        assert_eq!(names.claim("Bone"), "Bone.002");
    }
}
