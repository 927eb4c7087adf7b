//! Export configuration
//!
//! [`ExportConfig`] is resolved once per run and never re-read while the
//! pipeline is processing. Every mode that used to be a loose string is a
//! closed enum here, and [`ExportConfig::validate`] rejects the invalid
//! combinations before any scene data is touched.

use crate::error::ConfigError;
use crate::scene::ObjectKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Smallest accepted global scale
pub const MIN_SCALE: f32 = 0.01;
/// Largest accepted global scale
pub const MAX_SCALE: f32 = 1000.0;
/// Accepted range of the keyframe optimization precision
pub const PRECISION_RANGE: std::ops::RangeInclusive<f64> = 1.0..=16.0;

/// One of the six principal directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "X")]
    X,
    #[serde(rename = "Y")]
    Y,
    #[serde(rename = "Z")]
    Z,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "-Z")]
    NegZ,
}

impl Axis {
    /// Index of the principal axis (0 = X, 1 = Y, 2 = Z)
    pub fn index(self) -> usize {
        match self {
            Self::X | Self::NegX => 0,
            Self::Y | Self::NegY => 1,
            Self::Z | Self::NegZ => 2,
        }
    }

    /// +1 for positive directions, -1 for negative ones
    pub fn sign(self) -> f32 {
        match self {
            Self::X | Self::Y | Self::Z => 1.0,
            Self::NegX | Self::NegY | Self::NegZ => -1.0,
        }
    }

    /// Unit vector pointing along this direction
    pub fn vector(self) -> glam::Vec3 {
        let mut v = glam::Vec3::ZERO;
        v[self.index()] = self.sign();
        v
    }

    /// Whether two directions lie on the same principal axis
    pub fn is_parallel(self, other: Self) -> bool {
        self.index() == other.index()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
            Self::NegX => "-X",
            Self::NegY => "-Y",
            Self::NegZ => "-Z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" | "+X" => Ok(Self::X),
            "Y" | "+Y" => Ok(Self::Y),
            "Z" | "+Z" => Ok(Self::Z),
            "-X" => Ok(Self::NegX),
            "-Y" => Ok(Self::NegY),
            "-Z" => Ok(Self::NegZ),
            other => Err(format!("unknown axis '{other}'")),
        }
    }
}

/// Axis presets offered by the export operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AxisPreset {
    /// Z up, Y forward
    SkelMesh,
    /// Y up, -Z forward
    StaticMesh,
}

impl AxisPreset {
    /// (forward, up) pair for this preset
    pub fn axes(self) -> (Axis, Axis) {
        match self {
            Self::SkelMesh => (Axis::Y, Axis::Z),
            Self::StaticMesh => (Axis::NegZ, Axis::Y),
        }
    }
}

impl FromStr for AxisPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "SKELMESH" | "SKEL_MESH" => Ok(Self::SkelMesh),
            "STATICMESH" | "STATIC_MESH" => Ok(Self::StaticMesh),
            other => Err(format!("unknown axis preset '{other}'")),
        }
    }
}

/// How shading continuity is written to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmoothingMode {
    /// No smoothing layer
    Off,
    /// Per-polygon smoothing group bitmasks
    Groups,
    /// Per-polygon smooth flag
    #[default]
    Face,
    /// Per-edge smooth flag
    Edge,
}

/// Strategy used to produce per-loop normals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormalMode {
    /// Host split normals, passed through
    #[default]
    Default,
    /// Split normals recomputed from sharp edges only
    SharpEdges,
    /// Normals averaged within smoothing groups
    SmoothingGroups,
    /// Normals read from a named data layer
    ExternalSource,
    /// External source when present, otherwise default
    Auto,
}

/// Strategy used to produce tangents and binormals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TangentMode {
    /// Host tangents, requires default normals
    Default,
    /// Area-weighted Lengyel tangents against the resolved normals
    #[default]
    CustomLengyel,
    /// No tangent or binormal layers
    None,
}

/// Batch export layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchMode {
    /// Active scene to a single file
    #[default]
    Off,
    /// One file per scene
    Scene,
    /// One file per object group
    Group,
}

macro_rules! impl_mode_str {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let key = s.trim().to_ascii_uppercase().replace('-', "_");
                match key.as_str() {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(format!("unknown {} '{}'", stringify!($ty), s)),
                }
            }
        }
    };
}

impl_mode_str!(SmoothingMode { Off => "OFF", Groups => "GROUPS", Face => "FACE", Edge => "EDGE" });
impl_mode_str!(NormalMode {
    Default => "DEFAULT",
    SharpEdges => "SHARP_EDGES",
    SmoothingGroups => "SMOOTHING_GROUPS",
    ExternalSource => "EXTERNAL_SOURCE",
    Auto => "AUTO",
});
impl_mode_str!(TangentMode { Default => "DEFAULT", CustomLengyel => "CUSTOM_LENGYEL", None => "NONE" });
impl_mode_str!(BatchMode { Off => "OFF", Scene => "SCENE", Group => "GROUP" });

/// Keyframe export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Export keyframe animation at all
    pub enabled: bool,
    /// One take per action instead of only the active ones
    pub all_actions: bool,
    /// Add a take spanning the scene frame range
    pub default_take: bool,
    /// Remove redundant keyframes
    pub optimize: bool,
    /// Optimization precision; epsilon is 10^-precision
    pub precision: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            all_actions: false,
            default_take: false,
            optimize: false,
            precision: 6.0,
        }
    }
}

impl AnimationConfig {
    /// Tolerance used by the keyframe optimizer
    pub fn epsilon(&self) -> f64 {
        crate::anim::optimize::precision_epsilon(self.precision)
    }
}

/// Fully resolved export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Object types to export
    pub object_types: BTreeSet<ObjectKind>,
    /// Only export selected objects
    pub use_selection: bool,
    /// Export modifier-evaluated meshes when the host provides them
    pub apply_modifiers: bool,
    /// Target forward axis
    pub axis_forward: Axis,
    /// Target up axis
    pub axis_up: Axis,
    /// Uniform scale applied to all data
    pub global_scale: f32,
    /// Smoothing layer written to meshes
    pub smoothing: SmoothingMode,
    /// Dihedral angle (degrees) that splits smoothing groups on meshes without sharp edges
    pub smoothing_angle: f32,
    /// Normal derivation strategy
    pub normals: NormalMode,
    /// Name of the layer carrying externally computed normals
    pub external_normals_layer: String,
    /// Tangent derivation strategy
    pub tangents: TangentMode,
    /// UV layer used for tangent derivation
    pub tangent_uv_layer: usize,
    /// Combine all vertex color layers into one
    pub merge_vertex_colors: bool,
    /// Write the edge array
    pub use_mesh_edges: bool,
    /// Only export deforming bones
    pub deform_bones_only: bool,
    /// Keyframe export options
    pub animation: AnimationConfig,
    /// Batch export layout
    pub batch_mode: BatchMode,
    /// Give each batch file its own directory
    pub batch_own_dir: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let (axis_forward, axis_up) = AxisPreset::StaticMesh.axes();
        Self {
            object_types: [ObjectKind::Armature, ObjectKind::Mesh].into_iter().collect(),
            use_selection: true,
            apply_modifiers: false,
            axis_forward,
            axis_up,
            global_scale: 1.0,
            smoothing: SmoothingMode::Face,
            smoothing_angle: 30.0,
            normals: NormalMode::Default,
            external_normals_layer: "custom_normals".to_string(),
            tangents: TangentMode::CustomLengyel,
            tangent_uv_layer: 0,
            merge_vertex_colors: false,
            use_mesh_edges: false,
            deform_bones_only: false,
            animation: AnimationConfig::default(),
            batch_mode: BatchMode::Off,
            batch_own_dir: true,
        }
    }
}

impl ExportConfig {
    /// Check every whole-run constraint
    ///
    /// Per-mesh constraints (the tangent UV layer) are checked by the
    /// pipeline once the export set is known, still before derivation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.axis_forward.is_parallel(self.axis_up) {
            return Err(ConfigError::AxisConflict {
                forward: self.axis_forward,
                up: self.axis_up,
            });
        }

        if !(MIN_SCALE..=MAX_SCALE).contains(&self.global_scale) {
            return Err(ConfigError::ScaleOutOfRange(self.global_scale));
        }

        if !PRECISION_RANGE.contains(&self.animation.precision) {
            return Err(ConfigError::PrecisionOutOfRange(self.animation.precision));
        }

        if self.tangents == TangentMode::Default && self.normals != NormalMode::Default {
            return Err(ConfigError::IncompatibleTangentMode {
                tangents: self.tangents,
                normals: self.normals,
            });
        }

        Ok(())
    }

    /// Whether the given object type passes the type filter
    pub fn exports(&self, kind: ObjectKind) -> bool {
        self.object_types.contains(&kind)
    }

    /// Whether the smoothing group calculator has to run
    pub fn needs_smoothing_groups(&self) -> bool {
        self.normals == NormalMode::SmoothingGroups || self.smoothing == SmoothingMode::Groups
    }

    pub fn with_object_types(mut self, kinds: impl IntoIterator<Item = ObjectKind>) -> Self {
        self.object_types = kinds.into_iter().collect();
        self
    }

    pub fn with_selection(mut self, use_selection: bool) -> Self {
        self.use_selection = use_selection;
        self
    }

    pub fn with_axes(mut self, forward: Axis, up: Axis) -> Self {
        self.axis_forward = forward;
        self.axis_up = up;
        self
    }

    pub fn with_axis_preset(self, preset: AxisPreset) -> Self {
        let (forward, up) = preset.axes();
        self.with_axes(forward, up)
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.global_scale = scale;
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingMode) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_normals(mut self, normals: NormalMode) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_tangents(mut self, tangents: TangentMode) -> Self {
        self.tangents = tangents;
        self
    }

    pub fn with_tangent_uv_layer(mut self, index: usize) -> Self {
        self.tangent_uv_layer = index;
        self
    }

    pub fn with_deform_bones_only(mut self, deform_only: bool) -> Self {
        self.deform_bones_only = deform_only;
        self
    }

    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_batch(mut self, mode: BatchMode, own_dir: bool) -> Self {
        self.batch_mode = mode;
        self.batch_own_dir = own_dir;
        self
    }
}
