//! Tangent and binormal calculation
//!
//! Lengyel's method per fan triangle, area weighted, accumulated over loops
//! that share a vertex, UV and normal, then Gram-Schmidt orthonormalized
//! against the resolved normals.

use super::topology::Topology;
use glam::{Vec2, Vec3};

/// UV triangles with a smaller signed area than this are skipped
const DEGENERATE_UV: f32 = 1e-12;
/// Loops closer than this in UV space share a tangent
const UV_WELD: f32 = 1e-6;
/// Loops with normals closer than this share a tangent
const NORMAL_WELD: f32 = 0.9999;

/// Per-loop tangent frame
#[derive(Debug, Clone, Default)]
pub struct TangentSet {
    pub tangents: Vec<Vec3>,
    pub binormals: Vec<Vec3>,
    /// Handedness, +1 or -1
    pub signs: Vec<f32>,
    /// Faces with at least one zero-area UV triangle
    pub skipped_faces: usize,
}

/// Derive tangents from a UV layer and resolved normals
pub fn lengyel(
    positions: &[[f32; 3]],
    topology: &Topology,
    normals: &[Vec3],
    uvs: &[[f32; 2]],
) -> TangentSet {
    let loop_count = topology.loop_count();
    let mut raw_tangents = vec![Vec3::ZERO; loop_count];
    let mut raw_bitangents = vec![Vec3::ZERO; loop_count];
    let mut skipped_faces = 0;

    let position = |l: usize| Vec3::from_array(positions[topology.loop_vertex[l] as usize]);
    let uv = |l: usize| Vec2::from_array(uvs[l]);

    for face in 0..topology.face_count() {
        let loops = topology.face_loops(face);
        let first = loops.start;
        let mut skipped = false;

        for i in loops.start + 1..loops.end - 1 {
            let corners = [first, i, i + 1];
            let e1 = position(corners[1]) - position(corners[0]);
            let e2 = position(corners[2]) - position(corners[0]);
            let d1 = uv(corners[1]) - uv(corners[0]);
            let d2 = uv(corners[2]) - uv(corners[0]);

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < DEGENERATE_UV {
                skipped = true;
                continue;
            }
            let r = 1.0 / det;
            let tangent = (e1 * d2.y - e2 * d1.y) * r;
            let bitangent = (e2 * d1.x - e1 * d2.x) * r;
            let area = e1.cross(e2).length() * 0.5;

            for l in corners {
                raw_tangents[l] += tangent.normalize_or_zero() * area;
                raw_bitangents[l] += bitangent.normalize_or_zero() * area;
            }
        }

        if skipped {
            skipped_faces += 1;
        }
    }

    let (raw_tangents, raw_bitangents) = weld(topology, normals, uvs, &raw_tangents, &raw_bitangents);

    let mut set = TangentSet {
        tangents: Vec::with_capacity(loop_count),
        binormals: Vec::with_capacity(loop_count),
        signs: Vec::with_capacity(loop_count),
        skipped_faces,
    };
    for l in 0..loop_count {
        let (tangent, sign) = orthonormalize(normals[l], raw_tangents[l], raw_bitangents[l]);
        set.push(normals[l], tangent, sign);
    }
    set
}

/// Host tangents made orthonormal to the resolved normals; `w` carries handedness
pub fn authored(tangents: &[[f32; 4]], normals: &[Vec3]) -> TangentSet {
    let mut set = TangentSet::default();
    for (tangent, &normal) in tangents.iter().zip(normals) {
        let [x, y, z, w] = *tangent;
        set.push(normal, perpendicular(normal, Vec3::new(x, y, z)), if w < 0.0 { -1.0 } else { 1.0 });
    }
    set
}

impl TangentSet {
    fn push(&mut self, normal: Vec3, tangent: Vec3, sign: f32) {
        self.tangents.push(tangent);
        self.binormals.push(normal.cross(tangent) * sign);
        self.signs.push(sign);
    }
}

/// Sum tangents over loops sharing vertex, UV and normal
fn weld(
    topology: &Topology,
    normals: &[Vec3],
    uvs: &[[f32; 2]],
    tangents: &[Vec3],
    bitangents: &[Vec3],
) -> (Vec<Vec3>, Vec<Vec3>) {
    let mut out_t = tangents.to_vec();
    let mut out_b = bitangents.to_vec();

    for loops in &topology.vertex_loops {
        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for &l in loops {
            let uv = Vec2::from_array(uvs[l]);
            let found = clusters.iter_mut().find(|cluster| {
                let head = cluster[0];
                Vec2::from_array(uvs[head]).abs_diff_eq(uv, UV_WELD)
                    && normals[head].dot(normals[l]) > NORMAL_WELD
            });
            match found {
                Some(cluster) => cluster.push(l),
                None => clusters.push(vec![l]),
            }
        }

        for cluster in clusters.iter().filter(|c| c.len() > 1) {
            let t: Vec3 = cluster.iter().map(|&l| tangents[l]).sum();
            let b: Vec3 = cluster.iter().map(|&l| bitangents[l]).sum();
            for &l in cluster {
                out_t[l] = t;
                out_b[l] = b;
            }
        }
    }

    (out_t, out_b)
}

/// Gram-Schmidt against the normal and handedness from the raw bitangent
fn orthonormalize(normal: Vec3, tangent: Vec3, bitangent: Vec3) -> (Vec3, f32) {
    let tangent = perpendicular(normal, tangent);
    let sign = if normal.cross(tangent).dot(bitangent) < 0.0 { -1.0 } else { 1.0 };
    (tangent, sign)
}

/// Unit component of `tangent` perpendicular to `normal`
fn perpendicular(normal: Vec3, tangent: Vec3) -> Vec3 {
    (tangent - normal * normal.dot(tangent))
        .try_normalize()
        .unwrap_or_else(|| normal.any_orthonormal_vector())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshData, Polygon};
    use approx::assert_relative_eq;

    fn quad() -> MeshData {
        MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![Polygon::new([0, 1, 2, 3])],
        )
    }

    fn run(mesh: &MeshData, uvs: &[[f32; 2]]) -> TangentSet {
        let topology = Topology::build(mesh);
        let normals = vec![Vec3::Z; topology.loop_count()];
        lengyel(&mesh.positions, &topology, &normals, uvs)
    }

    #[test]
    fn test_quad_tangents_follow_u() {
        let set = run(&quad(), &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);

        assert_eq!(set.tangents.len(), 4);
        for (t, b) in set.tangents.iter().zip(&set.binormals) {
            assert!(t.abs_diff_eq(Vec3::X, 1e-6));
            assert!(b.abs_diff_eq(Vec3::Y, 1e-6));
        }
        assert_eq!(set.signs, vec![1.0; 4]);
        assert_eq!(set.skipped_faces, 0);
    }

    #[test]
    fn test_mirrored_uvs_flip_handedness() {
        let set = run(&quad(), &[[1.0, 0.0], [0.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        for (t, &sign) in set.tangents.iter().zip(&set.signs) {
            assert!(t.abs_diff_eq(Vec3::NEG_X, 1e-6));
            assert_eq!(sign, -1.0);
        }
        assert!(set.binormals[0].abs_diff_eq(Vec3::Y, 1e-6));
    }

    #[test]
    fn test_orthogonal_to_normals() {
        let mesh = MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.2], [1.0, 1.0, 0.5], [0.0, 1.0, 0.1]],
            vec![Polygon::new([0, 1, 2, 3])],
        );
        let topology = Topology::build(&mesh);
        let normals = vec![topology.face_normals[0]; 4];
        let set = lengyel(
            &mesh.positions,
            &topology,
            &normals,
            &[[0.0, 0.0], [0.7, 0.1], [0.8, 0.9], [0.1, 0.6]],
        );
        for (t, n) in set.tangents.iter().zip(&normals) {
            assert_relative_eq!(t.dot(*n), 0.0, epsilon = 1e-4);
            assert_relative_eq!(t.length(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_degenerate_uvs_are_skipped() {
        let set = run(&quad(), &[[0.5, 0.5]; 4]);
        assert_eq!(set.skipped_faces, 1);
        for (t, b) in set.tangents.iter().zip(&set.binormals) {
            assert_relative_eq!(t.length(), 1.0, epsilon = 1e-6);
            assert_relative_eq!(t.dot(Vec3::Z), 0.0, epsilon = 1e-6);
            assert_relative_eq!(b.length(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_authored_tangents() {
        let set = authored(&[[2.0, 0.0, 0.0, -1.0], [0.0, 0.0, 0.0, 1.0]], &[Vec3::Z, Vec3::Z]);
        assert!(set.tangents[0].abs_diff_eq(Vec3::X, 1e-6));
        assert!(set.binormals[0].abs_diff_eq(Vec3::NEG_Y, 1e-6));
        assert_relative_eq!(set.tangents[1].dot(Vec3::Z), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_authored_tangents_orthonormalized() {
        let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        // Skewed toward the normal, and one parallel to it
        let set = authored(&[[1.0, 0.5, 0.5, 1.0], [0.0, 2.0, 2.0, -1.0]], &[normal, normal]);

        for ((t, b), &sign) in set.tangents.iter().zip(&set.binormals).zip(&set.signs) {
            assert_relative_eq!(t.length(), 1.0, epsilon = 1e-5);
            assert_relative_eq!(t.dot(normal), 0.0, epsilon = 1e-5);
            assert_relative_eq!(b.dot(normal), 0.0, epsilon = 1e-5);
            assert!(b.abs_diff_eq(normal.cross(*t) * sign, 1e-6));
        }
        assert!(set.tangents[0].abs_diff_eq(Vec3::X, 1e-5));
        assert_eq!(set.signs, vec![1.0, -1.0]);
    }
}
