//! Per-loop normal resolution
//!
//! Every strategy produces exactly one unit normal per loop. Degenerate
//! faces never produce NaN: they borrow the normal of the nearest
//! non-degenerate face across shared edges, or +Z when none exists.

use super::smoothing::{DisjointSet, SmoothingAssignment};
use super::topology::Topology;
use crate::config::NormalMode;
use crate::scene::{AttributeDomain, MeshData};
use glam::Vec3;
use std::collections::VecDeque;

/// Resolved normals for one mesh
#[derive(Debug, Clone, Default)]
pub struct NormalSet {
    pub normals: Vec<Vec3>,
    /// Faces whose loops received a fallback normal
    pub degenerate_faces: Vec<usize>,
    /// External normals were requested but the layer was unusable
    pub external_missing: bool,
}

/// Inputs shared by every normal strategy
pub struct NormalInput<'a> {
    pub mesh: &'a MeshData,
    pub topology: &'a Topology,
    pub mode: NormalMode,
    pub external_layer: &'a str,
    /// Required by [`NormalMode::SmoothingGroups`]
    pub smoothing: Option<&'a SmoothingAssignment>,
}

/// Produce the per-loop normal set for the selected mode
pub fn resolve(input: &NormalInput<'_>) -> NormalSet {
    let topology = input.topology;
    let mut external_missing = false;

    let raw = match input.mode {
        NormalMode::Default => default_normals(input.mesh, topology),
        NormalMode::SharpEdges => sharp_edge_normals(topology),
        NormalMode::SmoothingGroups => match input.smoothing {
            Some(smoothing) => smoothing_group_normals(topology, smoothing),
            None => default_normals(input.mesh, topology),
        },
        NormalMode::ExternalSource => {
            external_normals(input.mesh, topology, input.external_layer).unwrap_or_else(|| {
                external_missing = true;
                default_normals(input.mesh, topology)
            })
        }
        NormalMode::Auto => external_normals(input.mesh, topology, input.external_layer)
            .unwrap_or_else(|| default_normals(input.mesh, topology)),
    };

    let fallback = face_fallbacks(topology);
    let mut degenerate_faces = Vec::new();
    let mut normals = raw;
    for face in 0..topology.face_count() {
        let degenerate = topology.is_degenerate(face);
        if degenerate {
            degenerate_faces.push(face);
        }
        for l in topology.face_loops(face) {
            normals[l] = if degenerate {
                fallback[face]
            } else {
                normals[l].try_normalize().unwrap_or(fallback[face])
            };
        }
    }

    NormalSet {
        normals,
        degenerate_faces,
        external_missing,
    }
}

/// Host split normals, or host-style shading when none are authored
///
/// Without authored normals a smooth polygon takes the area-weighted sum of
/// every face touching the vertex, flat faces and sharp edges included.
fn default_normals(mesh: &MeshData, topology: &Topology) -> Vec<Vec3> {
    if let Some(authored) = &mesh.loop_normals {
        return authored.iter().copied().map(Vec3::from_array).collect();
    }

    let mut vertex_normals = vec![Vec3::ZERO; mesh.positions.len()];
    for face in 0..topology.face_count() {
        let weighted = topology.weighted_normal(face);
        for l in topology.face_loops(face) {
            vertex_normals[topology.loop_vertex[l] as usize] += weighted;
        }
    }

    (0..topology.loop_count())
        .map(|l| {
            let face = topology.loop_face[l];
            if mesh.polygons[face].smooth {
                vertex_normals[topology.loop_vertex[l] as usize]
            } else {
                topology.face_normals[face]
            }
        })
        .collect()
}

/// Loops around a vertex are merged across every manifold edge that is not sharp
fn sharp_edge_normals(topology: &Topology) -> Vec<Vec3> {
    let mut fans = DisjointSet::new(topology.loop_count());
    for (edge, faces) in topology.edge_faces.iter().enumerate() {
        if topology.edge_sharp[edge] || !topology.is_manifold(edge) {
            continue;
        }
        let key = topology.edges[edge];
        for vertex in [key.0, key.1] {
            if let (Some(a), Some(b)) = (
                topology.loop_at(faces[0], vertex),
                topology.loop_at(faces[1], vertex),
            ) {
                fans.union(a, b);
            }
        }
    }

    let mut sums = vec![Vec3::ZERO; topology.loop_count()];
    for l in 0..topology.loop_count() {
        let root = fans.find(l);
        sums[root] += topology.weighted_normal(topology.loop_face[l]);
    }
    (0..topology.loop_count()).map(|l| sums[fans.find(l)]).collect()
}

/// Average over the faces at a vertex that share a smoothing bit with the loop's face
fn smoothing_group_normals(topology: &Topology, smoothing: &SmoothingAssignment) -> Vec<Vec3> {
    (0..topology.loop_count())
        .map(|l| {
            let face = topology.loop_face[l];
            let mask = smoothing.masks[face];
            if mask == 0 {
                return topology.face_normals[face];
            }
            topology
                .vertex_faces(topology.loop_vertex[l])
                .into_iter()
                .filter(|&other| smoothing.masks[other] & mask != 0)
                .map(|other| topology.weighted_normal(other))
                .sum()
        })
        .collect()
}

/// Normals stored on a named attribute layer, per loop or per vertex
fn external_normals(mesh: &MeshData, topology: &Topology, layer: &str) -> Option<Vec<Vec3>> {
    let layer = mesh.attribute(layer)?;
    match layer.domain {
        AttributeDomain::Loop if layer.values.len() == topology.loop_count() => {
            Some(layer.values.iter().copied().map(Vec3::from_array).collect())
        }
        AttributeDomain::Vertex if layer.values.len() == mesh.positions.len() => Some(
            topology
                .loop_vertex
                .iter()
                .map(|&v| Vec3::from_array(layer.values[v as usize]))
                .collect(),
        ),
        _ => None,
    }
}

/// Face normal, or for degenerate faces the nearest usable neighbour's
fn face_fallbacks(topology: &Topology) -> Vec<Vec3> {
    (0..topology.face_count())
        .map(|face| {
            if !topology.is_degenerate(face) {
                return topology.face_normals[face];
            }
            nearest_valid_face(topology, face)
                .map(|other| topology.face_normals[other])
                .unwrap_or(Vec3::Z)
        })
        .collect()
}

fn nearest_valid_face(topology: &Topology, start: usize) -> Option<usize> {
    let mut visited = vec![false; topology.face_count()];
    let mut queue = VecDeque::from([start]);
    visited[start] = true;
    while let Some(face) = queue.pop_front() {
        if !topology.is_degenerate(face) {
            return Some(face);
        }
        for next in topology.face_neighbours(face) {
            if !visited[next] {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }
    None
}
