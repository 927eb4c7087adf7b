//! Smoothing group calculation
//!
//! Faces connected across non-break edges form one group. Each group gets
//! one bit of a 32-bit mask; meshes with more groups fall back to sharing
//! bits between the smallest groups.

use super::topology::Topology;

/// Number of distinct ids a smoothing mask can hold
pub const MAX_GROUPS: usize = 32;

/// One smoothing bitmask per polygon
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SmoothingAssignment {
    pub masks: Vec<u32>,
    /// Connected components found before any merging
    pub group_count: usize,
    /// Components had to share bits
    pub overflowed: bool,
}

impl SmoothingAssignment {
    /// Number of distinct bits actually in use
    pub fn distinct_ids(&self) -> usize {
        self.masks.iter().fold(0u32, |acc, &m| acc | m).count_ones() as usize
    }
}

/// Decide which edges separate smoothing groups
///
/// An edge breaks when it is flagged sharp or is not shared by exactly two
/// faces. Meshes without any sharp flag fall back to the dihedral angle.
pub fn break_edges(topology: &Topology, angle_degrees: f32) -> Vec<bool> {
    let cos_limit = angle_degrees.to_radians().cos();
    (0..topology.edges.len())
        .map(|edge| {
            if topology.edge_sharp[edge] || !topology.is_manifold(edge) {
                return true;
            }
            if topology.has_sharp_edges {
                return false;
            }
            let [a, b] = [topology.edge_faces[edge][0], topology.edge_faces[edge][1]];
            if topology.is_degenerate(a) || topology.is_degenerate(b) {
                return false;
            }
            topology.face_normals[a].dot(topology.face_normals[b]) < cos_limit
        })
        .collect()
}

/// Assign smoothing masks to every face
pub fn compute(topology: &Topology, angle_degrees: f32) -> SmoothingAssignment {
    let face_count = topology.face_count();
    if face_count == 0 {
        return SmoothingAssignment::default();
    }

    let breaks = break_edges(topology, angle_degrees);
    let mut sets = DisjointSet::new(face_count);
    for (edge, faces) in topology.edge_faces.iter().enumerate() {
        if !breaks[edge] {
            sets.union(faces[0], faces[1]);
        }
    }

    // Component ids in order of each component's first face
    let mut component_of = vec![usize::MAX; face_count];
    let mut root_to_component = vec![usize::MAX; face_count];
    let mut sizes = Vec::new();
    for face in 0..face_count {
        let root = sets.find(face);
        if root_to_component[root] == usize::MAX {
            root_to_component[root] = sizes.len();
            sizes.push(0usize);
        }
        component_of[face] = root_to_component[root];
        sizes[component_of[face]] += 1;
    }

    let group_count = sizes.len();
    let bits = if group_count <= MAX_GROUPS {
        (0..group_count).collect()
    } else {
        merge_bits(topology, &breaks, &component_of, &sizes)
    };

    SmoothingAssignment {
        masks: component_of.iter().map(|&c| 1u32 << bits[c]).collect(),
        group_count,
        overflowed: group_count > MAX_GROUPS,
    }
}

/// Map more than 32 components onto 32 bits
///
/// The largest components keep a bit of their own. The rest are folded in
/// from the smallest upward, round-robin, skipping bits already used by a
/// component across one of their break edges when possible.
fn merge_bits(
    topology: &Topology,
    breaks: &[bool],
    component_of: &[usize],
    sizes: &[usize],
) -> Vec<usize> {
    let count = sizes.len();

    let mut by_size: Vec<usize> = (0..count).collect();
    by_size.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]).then(a.cmp(&b)));

    let mut keep: Vec<usize> = by_size[..MAX_GROUPS].to_vec();
    keep.sort_unstable();
    let mut bits = vec![usize::MAX; count];
    for (bit, &component) in keep.iter().enumerate() {
        bits[component] = bit;
    }

    let mut neighbours = vec![Vec::new(); count];
    for (edge, faces) in topology.edge_faces.iter().enumerate() {
        if !breaks[edge] {
            continue;
        }
        for &a in faces {
            for &b in faces {
                let (ca, cb) = (component_of[a], component_of[b]);
                if ca != cb && !neighbours[ca].contains(&cb) {
                    neighbours[ca].push(cb);
                }
            }
        }
    }

    let mut cursor = 0;
    for &component in by_size[MAX_GROUPS..].iter().rev() {
        let taken: u32 = neighbours[component]
            .iter()
            .filter(|&&n| bits[n] != usize::MAX)
            .fold(0, |acc, &n| acc | (1 << bits[n]));
        let bit = (0..MAX_GROUPS)
            .map(|step| (cursor + step) % MAX_GROUPS)
            .find(|&bit| taken & (1 << bit) == 0)
            .unwrap_or(cursor);
        bits[component] = bit;
        cursor = (bit + 1) % MAX_GROUPS;
    }

    bits
}

/// Union-find with path halving
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Lower root wins so results do not depend on union order
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{MeshData, Polygon};

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

    /// A row of `n` quads in the XY plane, every shared edge marked sharp
    fn strip(n: u32) -> MeshData {
        let mut positions = Vec::new();
        for i in 0..=n {
            positions.push([i as f32, 0.0, 0.0]);
            positions.push([i as f32, 1.0, 0.0]);
        }
        let polygons = (0..n)
            .map(|i| Polygon::new([2 * i, 2 * i + 2, 2 * i + 3, 2 * i + 1]))
            .collect();
        let mut mesh = MeshData::new(positions, polygons);
        for i in 1..n {
            mesh = mesh.with_sharp_edge(2 * i, 2 * i + 1);
        }
        mesh
    }

    #[test]
    fn test_flat_quad_single_group() {
        let mesh = MeshData::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![Polygon::new([0, 1, 2, 3])],
        );
        let result = compute(&Topology::build(&mesh), 30.0);
        assert_eq!(result.masks, vec![1]);
        assert_eq!(result.group_count, 1);
        assert!(!result.overflowed);
    }

    #[test]
    fn test_angle_splits_groups() {
        let topology = Topology::build(&folded());
        assert_eq!(compute(&topology, 30.0).masks, vec![1, 2]);
        assert_eq!(compute(&topology, 95.0).masks, vec![1, 1]);
    }

    #[test]
    fn test_sharp_flags_override_angle() {
        // A sharp flag elsewhere disables the angle test for the fold
        let mut mesh = folded();
        mesh.polygons.push(Polygon::new([3, 2, 5]));
        let mesh = mesh.with_sharp_edge(2, 5);
        let result = compute(&Topology::build(&mesh), 30.0);
        assert_eq!(result.masks[0], result.masks[1]);
    }

    #[test]
    fn test_overflow_stays_within_32_ids() {
        let result = compute(&Topology::build(&strip(40)), 30.0);
        assert_eq!(result.group_count, 40);
        assert!(result.overflowed);
        assert!(result.distinct_ids() <= MAX_GROUPS);
        assert_eq!(result.masks.len(), 40);
        assert!(result.masks.iter().all(|m| m.count_ones() == 1));
    }

    #[test]
    fn test_overflow_avoids_neighbour_bits() {
        let result = compute(&Topology::build(&strip(40)), 30.0);
        for pair in result.masks.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_disjoint_set() {
        let mut sets = DisjointSet::new(4);
        sets.union(3, 1);
        sets.union(1, 2);
        assert_eq!(sets.find(3), 1);
        assert_eq!(sets.find(2), 1);
        assert_eq!(sets.find(0), 0);
    }
}
