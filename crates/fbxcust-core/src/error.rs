//! Error types for fbxcust

use crate::config::{Axis, NormalMode, TangentMode};
use thiserror::Error;

/// Result type alias using fbxcust's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an export run
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration, reported before any scene data is processed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO error while writing the output file
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration problems detected by the up-front validation pass
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No destination path was given
    #[error("filepath not set")]
    MissingFilepath,

    /// Forward and up axes share a principal axis
    #[error("forward axis {forward} and up axis {up} must be perpendicular")]
    AxisConflict { forward: Axis, up: Axis },

    /// Global scale outside the supported range
    #[error("global scale {0} is outside 0.01..=1000.0")]
    ScaleOutOfRange(f32),

    /// Keyframe optimization precision outside the supported range
    #[error("optimize precision {0} is outside 1..=16")]
    PrecisionOutOfRange(f64),

    /// Tangent mode cannot be combined with the selected normal mode
    #[error("{tangents} tangents require DEFAULT normals, got {normals}")]
    IncompatibleTangentMode {
        tangents: TangentMode,
        normals: NormalMode,
    },

    /// Tangent UV layer does not exist on a mesh
    #[error("object '{object}': tangent UV layer {index} out of range ({available} layers)")]
    UvLayerOutOfRange {
        object: String,
        index: usize,
        available: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_config_message_not_repeated_by_source() {
        let err = Error::from(ConfigError::ScaleOutOfRange(0.0));
        assert_eq!(err.to_string(), "global scale 0 is outside 0.01..=1000.0");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_io_message_not_repeated_by_source() {
        let err = Error::from(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "disk full");
        assert!(err.source().is_none());
    }
}
