//! Shading data derivation for exported meshes
//!
//! Runs the smoothing, normal and tangent passes in dependency order. Source
//! topology is only read; every pass returns a new per-face or per-loop
//! array owned by [`DerivedMesh`].

pub mod normals;
pub mod smoothing;
pub mod tangents;
pub mod topology;

use crate::config::{ExportConfig, TangentMode};
use crate::error::ConfigError;
use crate::scene::MeshData;
use crate::warning::{Warning, Warnings};

pub use normals::NormalSet;
pub use smoothing::SmoothingAssignment;
pub use tangents::TangentSet;
pub use topology::{EdgeKey, Topology};

/// Everything the writer needs for one mesh beyond its source data
#[derive(Debug, Clone)]
pub struct DerivedMesh {
    pub topology: Topology,
    pub smoothing: Option<SmoothingAssignment>,
    pub normals: NormalSet,
    pub tangents: Option<TangentSet>,
}

/// Whether the tangent pass will read a UV layer for this mesh
pub fn needs_tangent_uvs(mesh: &MeshData, config: &ExportConfig) -> bool {
    match config.tangents {
        TangentMode::None => false,
        TangentMode::CustomLengyel => true,
        TangentMode::Default => mesh.loop_tangents.is_none(),
    }
}

/// Fail when the configured tangent UV layer does not exist on the mesh
pub fn check_tangent_uvs(object: &str, mesh: &MeshData, config: &ExportConfig) -> Result<(), ConfigError> {
    if needs_tangent_uvs(mesh, config) && config.tangent_uv_layer >= mesh.uv_layers.len() {
        return Err(ConfigError::UvLayerOutOfRange {
            object: object.to_string(),
            index: config.tangent_uv_layer,
            available: mesh.uv_layers.len(),
        });
    }
    Ok(())
}

/// Run every derivation pass for one mesh
///
/// The tangent UV layer must have been checked with [`check_tangent_uvs`];
/// per-element problems become warnings.
pub fn derive(object: &str, mesh: &MeshData, config: &ExportConfig, warnings: &mut Warnings) -> DerivedMesh {
    let topology = Topology::build(mesh);
    tracing::debug!(
        "Deriving '{}': {} polygons, {} loops, {} edges",
        object,
        topology.face_count(),
        topology.loop_count(),
        topology.edges.len()
    );

    let smoothing = config
        .needs_smoothing_groups()
        .then(|| smoothing::compute(&topology, config.smoothing_angle));
    if let Some(assignment) = smoothing.as_ref().filter(|s| s.overflowed) {
        warnings.push(Warning::SmoothingGroupOverflow {
            object: object.to_string(),
            groups: assignment.group_count,
        });
    }

    let normals = normals::resolve(&normals::NormalInput {
        mesh,
        topology: &topology,
        mode: config.normals,
        external_layer: &config.external_normals_layer,
        smoothing: smoothing.as_ref(),
    });
    if normals.external_missing {
        warnings.push(Warning::ExternalNormalsMissing {
            object: object.to_string(),
            layer: config.external_normals_layer.clone(),
        });
    }
    if !normals.degenerate_faces.is_empty() {
        warnings.push(Warning::DegenerateFaces {
            object: object.to_string(),
            count: normals.degenerate_faces.len(),
        });
    }

    let tangents = derive_tangents(object, mesh, &topology, &normals, config, warnings);

    DerivedMesh {
        topology,
        smoothing,
        normals,
        tangents,
    }
}

fn derive_tangents(
    object: &str,
    mesh: &MeshData,
    topology: &Topology,
    normals: &NormalSet,
    config: &ExportConfig,
    warnings: &mut Warnings,
) -> Option<TangentSet> {
    if config.tangents == TangentMode::None {
        return None;
    }

    if config.tangents == TangentMode::Default {
        match &mesh.loop_tangents {
            Some(authored) => return Some(tangents::authored(authored, &normals.normals)),
            None => warnings.push(Warning::AuthoredTangentsMissing {
                object: object.to_string(),
            }),
        }
    }

    let layer = mesh.uv_layers.get(config.tangent_uv_layer)?;
    let set = tangents::lengyel(&mesh.positions, topology, &normals.normals, &layer.uvs);
    if set.skipped_faces > 0 {
        warnings.push(Warning::DegenerateUvFaces {
            object: object.to_string(),
            count: set.skipped_faces,
        });
    }
    Some(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NormalMode, SmoothingMode};
    use crate::scene::Polygon;

    fn quad() -> MeshData {
        MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![Polygon::new([0, 1, 2, 3])],
        )
        .with_uv_layer("UVMap", vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
    }

    #[test]
    fn test_uv_layer_check() {
        let config = ExportConfig::default().with_tangent_uv_layer(1);
        assert_eq!(
            check_tangent_uvs("Quad", &quad(), &config),
            Err(ConfigError::UvLayerOutOfRange {
                object: "Quad".into(),
                index: 1,
                available: 1
            })
        );

        let config = config.with_tangents(TangentMode::None);
        assert!(check_tangent_uvs("Quad", &quad(), &config).is_ok());
    }

    #[test]
    fn test_smoothing_only_when_needed() {
        let mut warnings = Warnings::new();
        let derived = derive("Quad", &quad(), &ExportConfig::default(), &mut warnings);
        assert!(derived.smoothing.is_none());

        let config = ExportConfig::default().with_smoothing(SmoothingMode::Groups);
        let derived = derive("Quad", &quad(), &config, &mut warnings);
        assert_eq!(derived.smoothing.map(|s| s.masks), Some(vec![1]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_default_tangents_fall_back_with_warning() {
        let config = ExportConfig::default()
            .with_normals(NormalMode::Default)
            .with_tangents(TangentMode::Default);
        let mut warnings = Warnings::new();
        let derived = derive("Quad", &quad(), &config, &mut warnings);

        assert_eq!(derived.tangents.map(|t| t.tangents.len()), Some(4));
        assert_eq!(
            warnings.into_vec(),
            vec![Warning::AuthoredTangentsMissing {
                object: "Quad".into()
            }]
        );
    }

    #[test]
    fn test_external_missing_warns() {
        let config = ExportConfig::default()
            .with_normals(NormalMode::ExternalSource)
            .with_tangents(TangentMode::None);
        let mut warnings = Warnings::new();
        let derived = derive("Quad", &quad(), &config, &mut warnings);

        assert!(derived.tangents.is_none());
        assert!(matches!(
            warnings.iter().next(),
            Some(Warning::ExternalNormalsMissing { .. })
        ));
    }
}
