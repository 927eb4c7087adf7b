//! Bone hierarchy ordering
//!
//! Produces the bone list in parent-before-child order, applying the
//! deform-only filter by reparenting kept bones to their nearest kept
//! ancestor. Broken parent links are cut so the result is always a forest.

use crate::collect::UniqueNames;
use crate::scene::ArmatureData;
use crate::warning::{Warning, Warnings};
use glam::Mat4;

/// A bone as written to the file
#[derive(Debug, Clone)]
pub struct BoneNode {
    /// Bone name in the host, used to match vertex groups and channels
    pub name: String,
    /// Unique model name in the output file
    pub model: String,
    /// Index of the parent in [`Skeleton::bones`]
    pub parent: Option<usize>,
    /// Bind transform in armature space
    pub bind: Mat4,
    /// Index in the source bone list
    pub source: usize,
}

impl BoneNode {
    /// Bind transform relative to the parent bone (or the armature for roots)
    pub fn rest_local(&self, bones: &[BoneNode]) -> Mat4 {
        match self.parent {
            Some(p) => bones[p].bind.inverse() * self.bind,
            None => self.bind,
        }
    }
}

/// Ordered bones of one exported armature
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub bones: Vec<BoneNode>,
}

impl Skeleton {
    /// Build the ordered bone list for an armature object
    pub fn build(
        object: &str,
        armature: &ArmatureData,
        deform_only: bool,
        names: &mut UniqueNames,
        warnings: &mut Warnings,
    ) -> Self {
        let parents = repair_parents(object, armature, warnings);
        let count = parents.len();

        let keep: Vec<bool> = armature
            .bones
            .iter()
            .map(|bone| !deform_only || bone.deform)
            .collect();

        // Nearest kept ancestor, in source indices
        let kept_parent: Vec<Option<usize>> = (0..count)
            .map(|i| {
                let mut link = parents[i];
                while let Some(p) = link {
                    if keep[p] {
                        return Some(p);
                    }
                    link = parents[p];
                }
                None
            })
            .collect();

        let mut children = vec![Vec::new(); count];
        let mut roots = Vec::new();
        for i in (0..count).filter(|&i| keep[i]) {
            match kept_parent[i] {
                Some(p) => children[p].push(i),
                None => roots.push(i),
            }
        }

        // Depth-first preorder: parents always precede their children
        let mut order = Vec::with_capacity(count);
        let mut stack: Vec<usize> = roots.into_iter().rev().collect();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(children[i].iter().rev());
        }

        let mut position = vec![usize::MAX; count];
        for (out, &i) in order.iter().enumerate() {
            position[i] = out;
        }

        let bones = order
            .iter()
            .map(|&i| {
                let bone = &armature.bones[i];
                BoneNode {
                    name: bone.name.clone(),
                    model: names.claim(&bone.name),
                    parent: kept_parent[i].map(|p| position[p]),
                    bind: bone.bind(),
                    source: i,
                }
            })
            .collect();

        Self { bones }
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Position of the bone called `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }
}

/// Cut out-of-range, self and cyclic parent links
fn repair_parents(object: &str, armature: &ArmatureData, warnings: &mut Warnings) -> Vec<Option<usize>> {
    let count = armature.bones.len();
    let mut parents: Vec<Option<usize>> = armature
        .bones
        .iter()
        .map(|bone| bone.parent.filter(|&p| p < count))
        .collect();

    let mut broken = vec![false; count];
    for (i, bone) in armature.bones.iter().enumerate() {
        if bone.parent.is_some() && parents[i].is_none() {
            broken[i] = true;
        }
    }

    for start in 0..count {
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            if let Some(at) = path.iter().position(|&seen| seen == i) {
                // Cut the cycle at its lowest index
                let cut = path[at..].iter().copied().min().unwrap_or(i);
                parents[cut] = None;
                broken[cut] = true;
                path.clear();
                current = Some(start);
                continue;
            }
            path.push(i);
            current = parents[i];
        }
    }

    for (i, _) in broken.iter().enumerate().filter(|(_, b)| **b) {
        warnings.push(Warning::BrokenBoneParent {
            object: object.to_string(),
            bone: armature.bones[i].name.clone(),
        });
    }

    parents
}
