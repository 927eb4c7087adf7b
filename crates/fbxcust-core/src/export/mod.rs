//! FBX 6.1 ASCII export pipeline
//!
//! [`export_scene`] runs every stage in order: configuration checks, the
//! global transform, collection, per-mesh derivation, bone ordering, take
//! sampling and finally serialization. Configuration errors are raised
//! before the scene is read and nothing is left on disk when writing fails.

mod document;
mod geometry;
mod objects;
mod takes;
pub mod writer;

use crate::Result;
use crate::anim::{Take, TakeInput, build_takes};
use crate::armature::Skeleton;
use crate::collect::{ExportSet, collect};
use crate::config::ExportConfig;
use crate::error::ConfigError;
use crate::mesh::{DerivedMesh, check_tangent_uvs, derive};
use crate::scene::{ObjectKind, Scene};
use crate::transform::global_matrix_for;
use crate::warning::{Warning, Warnings};
use glam::Mat4;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default file extension
pub const EXTENSION: &str = "fbx";

/// Outcome of a successful export
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub objects: usize,
    pub meshes: usize,
    pub bones: usize,
    pub takes: usize,
    pub warnings: Vec<Warning>,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} objects ({} meshes), {} bones, {} takes",
            self.path.display(),
            self.objects,
            self.meshes,
            self.bones,
            self.takes
        )?;
        if !self.warnings.is_empty() {
            write!(f, ", {} warnings", self.warnings.len())?;
        }
        Ok(())
    }
}

/// Export `scene` to an FBX file at `path`
pub fn export_scene(scene: &Scene, config: &ExportConfig, path: impl AsRef<Path>) -> Result<ExportReport> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(ConfigError::MissingFilepath.into());
    }

    PreparedExport::new(scene, config)?.write(path)
}

/// A fully derived export that has not touched the filesystem yet
///
/// Batch runs prepare every file first so that a configuration error in
/// any of them aborts before the first one is written.
pub struct PreparedExport<'a> {
    plan: ExportPlan<'a>,
    warnings: Warnings,
}

impl<'a> PreparedExport<'a> {
    /// Validate `config` and derive everything the writer needs
    pub fn new(scene: &'a Scene, config: &'a ExportConfig) -> Result<Self> {
        let mut warnings = Warnings::new();
        let plan = ExportPlan::build(scene, config, &mut warnings)?;
        Ok(Self { plan, warnings })
    }

    pub fn warnings(&self) -> &[Warning] {
        self.warnings.as_slice()
    }

    /// Write the document to `path`, atomically
    pub fn write(self, path: impl AsRef<Path>) -> Result<ExportReport> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(ConfigError::MissingFilepath.into());
        }

        write_atomically(path, |out| document::write(&self.plan, out))?;

        let report = self.plan.report(path, self.warnings);
        tracing::info!("Exported {}", report);
        Ok(report)
    }
}

/// Serialize `scene` into any writer, returning the warnings
pub fn write_fbx<W: Write>(scene: &Scene, config: &ExportConfig, out: &mut W) -> Result<Vec<Warning>> {
    let mut warnings = Warnings::new();
    let plan = ExportPlan::build(scene, config, &mut warnings)?;
    document::write(&plan, out)?;
    Ok(warnings.into_vec())
}

/// Write through a temporary sibling file, renamed into place on success
fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> io::Result<()> {
    let temp = temp_path(path);
    let result = File::create(&temp)
        .and_then(|file| {
            let mut out = BufWriter::new(file);
            write(&mut out)?;
            out.flush()?;
            out.get_ref().sync_all()
        })
        .and_then(|()| fs::rename(&temp, path));

    if result.is_err() && temp.exists() {
        if let Err(e) = fs::remove_file(&temp) {
            tracing::warn!("Could not remove partial file {}: {}", temp.display(), e);
        }
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "export".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

/// A skin deformer binding one mesh to bones of its armature
#[derive(Debug, Clone)]
pub(crate) struct Skin {
    pub name: String,
    pub clusters: Vec<Cluster>,
}

/// Weights of one bone on one mesh
#[derive(Debug, Clone)]
pub(crate) struct Cluster {
    pub name: String,
    pub bone: String,
    pub indexes: Vec<u32>,
    pub weights: Vec<f32>,
    pub transform: Mat4,
    pub transform_link: Mat4,
}

/// A model entry with its FBX type and connection target
#[derive(Debug, Clone)]
pub(crate) struct ModelRef {
    pub name: String,
    pub kind: &'static str,
    /// Parent model, `None` for the scene root
    pub parent: Option<String>,
}

/// All derived data for one run, consumed by the writer
pub(crate) struct ExportPlan<'a> {
    pub scene: &'a Scene,
    pub config: &'a ExportConfig,
    pub global: Mat4,
    pub set: ExportSet<'a>,
    /// Per exported object
    pub skeletons: Vec<Option<Skeleton>>,
    /// Per exported object
    pub meshes: Vec<Option<DerivedMesh>>,
    /// Per exported object
    pub skins: Vec<Option<Skin>>,
    pub takes: Vec<Take>,
}

impl<'a> ExportPlan<'a> {
    pub fn build(scene: &'a Scene, config: &'a ExportConfig, warnings: &mut Warnings) -> Result<Self> {
        config.validate()?;
        let global = global_matrix_for(config)?;
        tracing::debug!("Global matrix: {:?}", global);

        let mut set = collect(scene, config, global, warnings);
        for object in &set.objects {
            if let Some(mesh) = object.mesh {
                check_tangent_uvs(&object.name, mesh, config)?;
            }
        }

        let ExportSet { objects, names } = &mut set;
        let skeletons: Vec<Option<Skeleton>> = objects
            .iter()
            .map(|object| {
                object.armature_data().map(|armature| {
                    Skeleton::build(&object.name, armature, config.deform_bones_only, names, warnings)
                })
            })
            .collect();

        let meshes = set
            .objects
            .iter()
            .map(|object| object.mesh.map(|mesh| derive(&object.name, mesh, config, warnings)))
            .collect();

        let skins = set
            .objects
            .iter()
            .map(|object| objects::build_skin(object, &set, &skeletons, global))
            .collect();

        let takes = build_takes(
            &TakeInput {
                scene,
                set: &set,
                skeletons: &skeletons,
                global,
                config: &config.animation,
            },
            warnings,
        );

        Ok(Self {
            scene,
            config,
            global,
            set,
            skeletons,
            meshes,
            skins,
            takes,
        })
    }

    /// Every model in output order: objects, each armature followed by its bones
    pub fn models(&self) -> Vec<ModelRef> {
        let mut models = Vec::new();
        for (i, object) in self.set.objects.iter().enumerate() {
            models.push(ModelRef {
                name: object.name.clone(),
                kind: objects::model_type(object.kind()),
                parent: object.parent.map(|p| self.set.objects[p].name.clone()),
            });
            if let Some(skeleton) = &self.skeletons[i] {
                for bone in &skeleton.bones {
                    models.push(ModelRef {
                        name: bone.model.clone(),
                        kind: "Limb",
                        parent: Some(match bone.parent {
                            Some(p) => skeleton.bones[p].model.clone(),
                            None => object.name.clone(),
                        }),
                    });
                }
            }
        }
        models
    }

    pub fn bone_count(&self) -> usize {
        self.skeletons.iter().flatten().map(Skeleton::len).sum()
    }

    fn report(&self, path: &Path, warnings: Warnings) -> ExportReport {
        ExportReport {
            path: path.to_path_buf(),
            objects: self.set.len(),
            meshes: self.set.count(ObjectKind::Mesh),
            bones: self.bone_count(),
            takes: self.takes.len(),
            warnings: warnings.into_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_is_sibling() {
        let temp = temp_path(Path::new("/tmp/out/model.fbx"));
        assert_eq!(temp, PathBuf::from("/tmp/out/.model.fbx.tmp"));
    }

    #[test]
    fn test_empty_path_fails_first() {
        // Invalid axes too, but the missing path is reported first
        let config = ExportConfig::default().with_axes(crate::config::Axis::X, crate::config::Axis::X);
        let err = export_scene(&Scene::default(), &config, "").unwrap_err();
        assert!(matches!(err, crate::Error::Config(ConfigError::MissingFilepath)));
    }

    #[test]
    fn test_prepare_does_not_write() {
        let dir = std::env::temp_dir().join("fbxcust-prepare-test");
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("later.fbx");

        let scene = Scene::new("Main");
        let config = ExportConfig::default();
        let prepared = PreparedExport::new(&scene, &config).unwrap();
        let warned = prepared.warnings().len();
        assert!(!path.exists());

        let report = prepared.write(&path).unwrap();
        assert_eq!(report.objects, 0);
        assert_eq!(report.warnings.len(), warned);
        assert!(path.exists());
    }

    #[test]
    fn test_prepare_rejects_bad_config() {
        let config = ExportConfig::default().with_scale(0.0);
        assert!(matches!(
            PreparedExport::new(&Scene::default(), &config),
            Err(crate::Error::Config(ConfigError::ScaleOutOfRange(_)))
        ));
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let dir = std::env::temp_dir().join("fbxcust-atomic-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.fbx");

        let result = write_atomically(&path, |out| {
            out.write_all(b"partial")?;
            Err(io::Error::other("disk full"))
        });

        assert!(result.is_err());
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }
}
