//! Non-fatal export warnings
//!
//! Derivation passes absorb per-element problems locally (skip or fall
//! back) and record a [`Warning`]. The full list is returned to the caller
//! in the export report.

use std::fmt;

/// A recoverable problem found during an export run
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Selection-only export matched no objects
    EmptySelection,

    /// Mesh data is malformed and the object was skipped
    InvalidMesh { object: String, reason: String },

    /// Object name collided with an earlier one and was renamed
    RenamedObject { object: String, renamed: String },

    /// Parent link points at an unknown object or forms a cycle
    BrokenParent { object: String, parent: String },

    /// External normal layer is missing or malformed; DEFAULT normals were used
    ExternalNormalsMissing { object: String, layer: String },

    /// Mesh needed more than 32 smoothing groups; some groups were merged
    SmoothingGroupOverflow { object: String, groups: usize },

    /// Zero-area faces received a neighbour's normal
    DegenerateFaces { object: String, count: usize },

    /// Faces with a zero-area UV mapping did not contribute tangents
    DegenerateUvFaces { object: String, count: usize },

    /// DEFAULT tangents requested but the mesh carries none
    AuthoredTangentsMissing { object: String },

    /// Bone parent index is out of range or cyclic; bone became a root
    BrokenBoneParent { object: String, bone: String },

    /// Object refers to an action that does not exist
    MissingAction { object: String, action: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySelection => write!(f, "no objects selected for export"),
            Self::InvalidMesh { object, reason } => {
                write!(f, "object '{object}': invalid mesh skipped ({reason})")
            }
            Self::RenamedObject { object, renamed } => {
                write!(f, "object '{object}': duplicate name, exported as '{renamed}'")
            }
            Self::BrokenParent { object, parent } => {
                write!(f, "object '{object}': parent '{parent}' ignored")
            }
            Self::ExternalNormalsMissing { object, layer } => write!(
                f,
                "object '{object}': external normal layer '{layer}' unavailable, using default normals"
            ),
            Self::SmoothingGroupOverflow { object, groups } => write!(
                f,
                "object '{object}': {groups} smoothing groups merged into 32"
            ),
            Self::DegenerateFaces { object, count } => {
                write!(f, "object '{object}': {count} degenerate faces")
            }
            Self::DegenerateUvFaces { object, count } => write!(
                f,
                "object '{object}': {count} faces with degenerate UVs skipped for tangents"
            ),
            Self::AuthoredTangentsMissing { object } => write!(
                f,
                "object '{object}': no authored tangents, derived from UVs instead"
            ),
            Self::BrokenBoneParent { object, bone } => {
                write!(f, "armature '{object}': bone '{bone}' has an invalid parent")
            }
            Self::MissingAction { object, action } => {
                write!(f, "object '{object}': action '{action}' not found")
            }
        }
    }
}

/// Ordered collection of warnings for one export run
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{}", warning);
        self.items.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Warning] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_keeps_order() {
        let mut warnings = Warnings::new();
        warnings.push(Warning::EmptySelection);
        warnings.push(Warning::AuthoredTangentsMissing {
            object: "Cube".into(),
        });

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings.iter().next(), Some(&Warning::EmptySelection));
    }

    #[test]
    fn test_display_names_object() {
        let warning = Warning::SmoothingGroupOverflow {
            object: "Rock".into(),
            groups: 40,
        };
        assert!(warning.to_string().contains("'Rock'"));
        assert!(warning.to_string().contains("40"));
    }
}
