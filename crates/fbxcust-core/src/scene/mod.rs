//! Read-only input model
//!
//! This is the host's scene as the exporter sees it: an ordered object
//! list with type tags, mesh/armature/camera/lamp payloads, actions and the
//! frame range. Relationships between objects are weak links by name and
//! are resolved through an index by the collector, never by ownership.

mod animation;
mod mesh;

pub use animation::{Action, ActionChannel, ChannelTarget, TransformProperty};
pub use mesh::{AttributeDomain, AttributeLayer, ColorLayer, MeshData, Polygon, UvLayer, VertexGroup};

use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Object type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Empty,
    Camera,
    Lamp,
    Armature,
    Mesh,
}

impl ObjectKind {
    pub const ALL: [Self; 5] = [
        Self::Empty,
        Self::Camera,
        Self::Lamp,
        Self::Armature,
        Self::Mesh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "EMPTY",
            Self::Camera => "CAMERA",
            Self::Lamp => "LAMP",
            Self::Armature => "ARMATURE",
            Self::Mesh => "MESH",
        }
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown object type '{s}'"))
    }
}

/// A host document: scenes plus object groups
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub scenes: Vec<Scene>,
    /// Index of the scene exported when batch mode is off
    #[serde(default)]
    pub active_scene: usize,
    /// Named object groups, used by group batch export
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Document {
    /// The active scene, falling back to the first one
    pub fn active(&self) -> Option<&Scene> {
        self.scenes
            .get(self.active_scene)
            .or_else(|| self.scenes.first())
    }
}

/// A named list of object names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

/// One host scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default = "default_frame_start")]
    pub frame_start: i32,
    #[serde(default = "default_frame_end")]
    pub frame_end: i32,
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            name: "Scene".to_string(),
            frame_start: default_frame_start(),
            frame_end: default_frame_end(),
            fps: default_fps(),
            objects: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_frame_range(mut self, start: i32, end: i32) -> Self {
        self.frame_start = start;
        self.frame_end = end;
        self
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }
}

fn default_frame_start() -> i32 {
    1
}

fn default_frame_end() -> i32 {
    250
}

fn default_fps() -> f64 {
    24.0
}

fn identity() -> [[f32; 4]; 4] {
    Mat4::IDENTITY.to_cols_array_2d()
}

/// An object in the host scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    /// Unique object name, used as its id
    pub name: String,
    /// World transform, column-major
    #[serde(default = "identity")]
    pub matrix_world: [[f32; 4]; 4],
    /// Name of the parent object
    #[serde(default)]
    pub parent: Option<String>,
    /// Host selection flag
    #[serde(default)]
    pub selected: bool,
    /// Name of the action currently assigned to the object
    #[serde(default)]
    pub active_action: Option<String>,
    /// Name of the armature object deforming this mesh
    #[serde(default)]
    pub armature: Option<String>,
    /// Type-specific payload; its variant is the object type tag
    #[serde(default)]
    pub data: ObjectData,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            matrix_world: identity(),
            parent: None,
            selected: true,
            active_action: None,
            armature: None,
            data,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.data.kind()
    }

    pub fn world(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.matrix_world)
    }

    pub fn with_world(mut self, matrix: Mat4) -> Self {
        self.matrix_world = matrix.to_cols_array_2d();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.active_action = Some(action.into());
        self
    }

    pub fn with_armature(mut self, armature: impl Into<String>) -> Self {
        self.armature = Some(armature.into());
        self
    }
}

/// Type-specific object payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectData {
    #[default]
    Empty,
    Camera(CameraData),
    Lamp(LampData),
    Armature(ArmatureData),
    Mesh(MeshObject),
}

impl ObjectData {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Empty => ObjectKind::Empty,
            Self::Camera(_) => ObjectKind::Camera,
            Self::Lamp(_) => ObjectKind::Lamp,
            Self::Armature(_) => ObjectKind::Armature,
            Self::Mesh(_) => ObjectKind::Mesh,
        }
    }
}

/// Mesh payload: the base mesh and, optionally, the modifier-evaluated one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshObject {
    pub mesh: MeshData,
    #[serde(default)]
    pub evaluated: Option<MeshData>,
}

impl MeshObject {
    pub fn new(mesh: MeshData) -> Self {
        Self {
            mesh,
            evaluated: None,
        }
    }

    /// Mesh to export for the given modifier setting
    pub fn resolve(&self, apply_modifiers: bool) -> &MeshData {
        match (&self.evaluated, apply_modifiers) {
            (Some(evaluated), true) => evaluated,
            _ => &self.mesh,
        }
    }
}

/// Bone hierarchy of an armature
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArmatureData {
    #[serde(default)]
    pub bones: Vec<Bone>,
}

/// A single bone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    /// Index of the parent bone in the armature's bone list
    #[serde(default)]
    pub parent: Option<usize>,
    /// Bind transform in armature space, column-major
    #[serde(default = "identity")]
    pub matrix_local: [[f32; 4]; 4],
    /// Whether the bone deforms geometry
    #[serde(default = "default_true")]
    pub deform: bool,
}

impl Bone {
    pub fn new(name: impl Into<String>, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            parent,
            matrix_local: identity(),
            deform: true,
        }
    }

    pub fn bind(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.matrix_local)
    }

    pub fn with_bind(mut self, matrix: Mat4) -> Self {
        self.matrix_local = matrix.to_cols_array_2d();
        self
    }

    pub fn with_deform(mut self, deform: bool) -> Self {
        self.deform = deform;
        self
    }
}

/// Camera payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraData {
    /// Focal length in millimetres
    pub lens: f32,
    /// Sensor width in millimetres
    pub sensor_width: f32,
    pub clip_start: f32,
    pub clip_end: f32,
    pub orthographic: bool,
    /// Orthographic view size
    pub ortho_scale: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            lens: 35.0,
            sensor_width: 32.0,
            clip_start: 0.1,
            clip_end: 100.0,
            orthographic: false,
            ortho_scale: 7.314,
        }
    }
}

impl CameraData {
    /// Horizontal field of view in degrees
    pub fn field_of_view(&self) -> f32 {
        (2.0 * (self.sensor_width / (2.0 * self.lens)).atan()).to_degrees()
    }
}

/// Lamp type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LampKind {
    #[default]
    Point,
    Sun,
    Spot,
    Hemi,
    Area,
}

/// Lamp payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LampData {
    pub kind: LampKind,
    pub color: [f32; 3],
    pub energy: f32,
    /// Spot cone angle in radians
    pub spot_size: f32,
    pub distance: f32,
    pub shadows: bool,
}

impl Default for LampData {
    fn default() -> Self {
        Self {
            kind: LampKind::Point,
            color: [1.0, 1.0, 1.0],
            energy: 1.0,
            spot_size: 45f32.to_radians(),
            distance: 25.0,
            shadows: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_payload() {
        let object = SceneObject::new("Rig", ObjectData::Armature(ArmatureData::default()));
        assert_eq!(object.kind(), ObjectKind::Armature);
        assert_eq!(SceneObject::new("Null", ObjectData::Empty).kind(), ObjectKind::Empty);
    }

    #[test]
    fn test_object_kind_parse() {
        assert_eq!("mesh".parse::<ObjectKind>(), Ok(ObjectKind::Mesh));
        assert!("light".parse::<ObjectKind>().is_err());
    }

    #[test]
    fn test_mesh_object_resolve() {
        let mut evaluated = MeshData::default();
        evaluated.positions.push([1.0, 2.0, 3.0]);
        let object = MeshObject {
            mesh: MeshData::default(),
            evaluated: Some(evaluated),
        };

        assert!(object.resolve(false).positions.is_empty());
        assert_eq!(object.resolve(true).positions.len(), 1);
    }

    #[test]
    fn test_document_from_json() {
        let json = r#"{
            "scenes": [{
                "name": "Main",
                "objects": [
                    { "name": "Lamp", "data": { "type": "LAMP", "kind": "SUN" } },
                    { "name": "Root", "selected": true }
                ]
            }]
        }"#;
        let document: Document = serde_json::from_str(json).unwrap();
        let scene = document.active().unwrap();

        assert_eq!(scene.frame_start, 1);
        assert_eq!(scene.objects[0].kind(), ObjectKind::Lamp);
        assert_eq!(scene.objects[1].kind(), ObjectKind::Empty);
        assert_eq!(scene.objects[1].world(), Mat4::IDENTITY);
    }
}
