//! # fbxcust Core
//!
//! Scene export to the FBX 6.1 ASCII format with control over how vertex
//! normals, smoothing groups and tangents are derived.
//!
//! The crate consumes a read-only [`scene::Scene`] and an
//! [`config::ExportConfig`], runs the derivation passes and writes a single
//! text file.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fbxcust_core::prelude::*;
//!
//! let document: Document = serde_json::from_str(&json)?;
//! let config = ExportConfig::default()
//!     .with_normals(NormalMode::SmoothingGroups)
//!     .with_tangents(TangentMode::CustomLengyel);
//!
//! let scene = document.active().expect("document has a scene");
//! let report = export_scene(scene, &config, "character.fbx")?;
//! for warning in &report.warnings {
//!     eprintln!("{warning}");
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`transform`] builds the global axis/scale matrix
//! 2. [`collect`] filters and orders the objects to export
//! 3. [`mesh::smoothing`] derives smoothing groups
//! 4. [`mesh::normals`] resolves per-loop normals
//! 5. [`mesh::tangents`] derives tangents and binormals
//! 6. [`anim`] samples and optimizes keyframes
//! 7. [`export`] writes the FBX text
//!
//! ## Conventions
//!
//! - **Host space**: right-handed, Z-up, Y-forward
//! - **Angles**: radians in the input model, degrees in the output file
//! - **Loops**: polygon corners, numbered in polygon order

pub mod anim;
pub mod armature;
pub mod collect;
pub mod config;
pub mod export;
pub mod mesh;
pub mod scene;
pub mod transform;
pub mod warning;

mod error;

pub use error::{ConfigError, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    // Input model
    pub use crate::scene::{
        Action, ArmatureData, Bone, Document, MeshData, ObjectData, ObjectKind, Scene,
        SceneObject,
    };

    // Configuration
    pub use crate::config::{
        AnimationConfig, Axis, AxisPreset, BatchMode, ExportConfig, NormalMode, SmoothingMode,
        TangentMode,
    };

    // Export
    pub use crate::export::{ExportReport, PreparedExport, export_scene};
    pub use crate::warning::Warning;

    // Math (re-export glam)
    pub use glam::{Mat4, Quat, Vec2, Vec3};

    // Error handling
    pub use crate::{ConfigError, Error, Result};
}
