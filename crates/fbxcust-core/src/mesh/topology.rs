//! Loop, edge and face adjacency tables for a polygon mesh

use crate::scene::MeshData;
use glam::Vec3;
use std::collections::HashMap;
use std::ops::Range;

/// Faces with less area than this are treated as degenerate
pub const DEGENERATE_AREA: f32 = 1e-10;

/// Undirected edge, stored with the smaller vertex index first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(pub u32, pub u32);

impl EdgeKey {
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }
}

/// Connectivity and per-face geometry derived from a [`MeshData`]
///
/// Edges are numbered in the order they are first met while walking
/// polygons, so indices are stable for identical input.
#[derive(Debug, Clone)]
pub struct Topology {
    /// First loop of every polygon, plus the total loop count at the end
    pub loop_start: Vec<usize>,
    /// Vertex of every loop
    pub loop_vertex: Vec<u32>,
    /// Polygon owning every loop
    pub loop_face: Vec<usize>,
    /// Edge from every loop to the next loop of its polygon
    pub loop_edge: Vec<usize>,
    pub edges: Vec<EdgeKey>,
    /// Polygons using each edge
    pub edge_faces: Vec<Vec<usize>>,
    /// Whether each edge carries a sharp flag
    pub edge_sharp: Vec<bool>,
    /// Loops at each vertex, in loop order
    pub vertex_loops: Vec<Vec<usize>>,
    /// Unit face normals (zero for degenerate faces)
    pub face_normals: Vec<Vec3>,
    pub face_areas: Vec<f32>,
    /// Whether any edge of the mesh is flagged sharp
    pub has_sharp_edges: bool,
}

impl Topology {
    pub fn build(mesh: &MeshData) -> Self {
        let face_count = mesh.polygons.len();
        let loop_count = mesh.loop_count();

        let mut loop_start = Vec::with_capacity(face_count + 1);
        let mut loop_vertex = Vec::with_capacity(loop_count);
        let mut loop_face = Vec::with_capacity(loop_count);
        for (face, polygon) in mesh.polygons.iter().enumerate() {
            loop_start.push(loop_vertex.len());
            loop_vertex.extend_from_slice(&polygon.vertices);
            loop_face.extend(std::iter::repeat_n(face, polygon.len()));
        }
        loop_start.push(loop_vertex.len());

        let mut edge_index: HashMap<EdgeKey, usize> = HashMap::new();
        let mut edges = Vec::new();
        let mut edge_faces: Vec<Vec<usize>> = Vec::new();
        let mut loop_edge = Vec::with_capacity(loop_count);
        for face in 0..face_count {
            let range = loop_start[face]..loop_start[face + 1];
            for l in range.clone() {
                let next = if l + 1 == range.end { range.start } else { l + 1 };
                let key = EdgeKey::new(loop_vertex[l], loop_vertex[next]);
                let edge = *edge_index.entry(key).or_insert_with(|| {
                    edges.push(key);
                    edge_faces.push(Vec::new());
                    edges.len() - 1
                });
                if !edge_faces[edge].contains(&face) {
                    edge_faces[edge].push(face);
                }
                loop_edge.push(edge);
            }
        }

        let mut edge_sharp = vec![false; edges.len()];
        for &[a, b] in &mesh.sharp_edges {
            if let Some(&edge) = edge_index.get(&EdgeKey::new(a, b)) {
                edge_sharp[edge] = true;
            }
        }
        let has_sharp_edges = edge_sharp.iter().any(|&sharp| sharp);

        let mut vertex_loops = vec![Vec::new(); mesh.positions.len()];
        for (l, &v) in loop_vertex.iter().enumerate() {
            vertex_loops[v as usize].push(l);
        }

        let (face_normals, face_areas) = mesh
            .polygons
            .iter()
            .map(|polygon| newell(&mesh.positions, &polygon.vertices))
            .unzip();

        Self {
            loop_start,
            loop_vertex,
            loop_face,
            loop_edge,
            edges,
            edge_faces,
            edge_sharp,
            vertex_loops,
            face_normals,
            face_areas,
            has_sharp_edges,
        }
    }

    pub fn face_count(&self) -> usize {
        self.loop_start.len() - 1
    }

    pub fn loop_count(&self) -> usize {
        self.loop_vertex.len()
    }

    /// Loop indices of a face
    pub fn face_loops(&self, face: usize) -> Range<usize> {
        self.loop_start[face]..self.loop_start[face + 1]
    }

    pub fn is_degenerate(&self, face: usize) -> bool {
        self.face_areas[face] <= DEGENERATE_AREA
    }

    /// Edge shared by exactly two faces
    pub fn is_manifold(&self, edge: usize) -> bool {
        self.edge_faces[edge].len() == 2
    }

    /// The loop of `face` sitting on `vertex`
    pub fn loop_at(&self, face: usize, vertex: u32) -> Option<usize> {
        self.face_loops(face).find(|&l| self.loop_vertex[l] == vertex)
    }

    /// Faces sharing an edge with `face`, in edge order, without repeats
    pub fn face_neighbours(&self, face: usize) -> Vec<usize> {
        let mut out = Vec::new();
        for l in self.face_loops(face) {
            for &other in &self.edge_faces[self.loop_edge[l]] {
                if other != face && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        out
    }

    /// Faces using `vertex`, in loop order, without repeats
    pub fn vertex_faces(&self, vertex: u32) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        for &l in &self.vertex_loops[vertex as usize] {
            let face = self.loop_face[l];
            if !out.contains(&face) {
                out.push(face);
            }
        }
        out
    }

    /// Area-weighted face normal, the building block of every averaging pass
    pub fn weighted_normal(&self, face: usize) -> Vec3 {
        self.face_normals[face] * self.face_areas[face]
    }
}

/// Newell's method: robust normal and area for planar or slightly warped polygons
fn newell(positions: &[[f32; 3]], vertices: &[u32]) -> (Vec3, f32) {
    let mut sum = Vec3::ZERO;
    for (i, &v) in vertices.iter().enumerate() {
        let cur = Vec3::from_array(positions[v as usize]);
        let next = Vec3::from_array(positions[vertices[(i + 1) % vertices.len()] as usize]);
        sum += Vec3::new(
            (cur.y - next.y) * (cur.z + next.z),
            (cur.z - next.z) * (cur.x + next.x),
            (cur.x - next.x) * (cur.y + next.y),
        );
    }
    let area = sum.length() * 0.5;
    if area <= DEGENERATE_AREA {
        (Vec3::ZERO, 0.0)
    } else {
        (sum.normalize(), area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Polygon;
    use approx::assert_relative_eq;

    /// Two quads sharing the edge 1-2, folded 90 degrees
    fn folded() -> MeshData {
        MeshData::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
            ],
            vec![Polygon::new([0, 1, 2, 3]), Polygon::new([1, 4, 5, 2])],
        )
    }

    #[test]
    fn test_loops_and_edges() {
        let topology = Topology::build(&folded());

        assert_eq!(topology.face_count(), 2);
        assert_eq!(topology.loop_count(), 8);
        assert_eq!(topology.edges.len(), 7);
        assert_eq!(topology.face_loops(1), 4..8);

        let shared = topology.edges.iter().position(|&e| e == EdgeKey(1, 2)).unwrap();
        assert_eq!(topology.edge_faces[shared], vec![0, 1]);
        assert!(topology.is_manifold(shared));
        assert_eq!(topology.face_neighbours(0), vec![1]);
    }

    #[test]
    fn test_face_geometry() {
        let topology = Topology::build(&folded());
        assert!(topology.face_normals[0].abs_diff_eq(Vec3::Z, 1e-6));
        assert_relative_eq!(topology.face_areas[0], 1.0, epsilon = 1e-6);
        assert!(topology.face_normals[1].abs_diff_eq(Vec3::NEG_X, 1e-6));
        assert_relative_eq!(topology.face_areas[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_face() {
        let mesh = MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            vec![Polygon::new([0, 1, 2])],
        );
        let topology = Topology::build(&mesh);
        assert!(topology.is_degenerate(0));
        assert_eq!(topology.face_normals[0], Vec3::ZERO);
    }

    #[test]
    fn test_sharp_flags_resolve_to_edges() {
        let mesh = folded().with_sharp_edge(2, 1).with_sharp_edge(0, 5);
        let topology = Topology::build(&mesh);
        assert!(topology.has_sharp_edges);
        assert_eq!(topology.edge_sharp.iter().filter(|&&s| s).count(), 1);
    }
}
