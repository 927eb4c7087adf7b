//! Axis conversion, global scale and FBX transform decomposition
//!
//! The host is Z-up with +Y forward. The global matrix rotates the host
//! basis onto the configured target basis and applies the uniform scale;
//! it is applied once, to the transforms of root objects.

use crate::config::{Axis, ExportConfig, MAX_SCALE, MIN_SCALE};
use crate::error::ConfigError;
use glam::{DMat4, DVec3, EulerRot, Mat3, Mat4, Vec3};

/// Host forward direction
pub const HOST_FORWARD: Vec3 = Vec3::Y;
/// Host up direction
pub const HOST_UP: Vec3 = Vec3::Z;

/// Rotation taking host forward/up/right onto the target forward/up/right
pub fn axis_conversion(forward: Axis, up: Axis) -> Result<Mat3, ConfigError> {
    if forward.is_parallel(up) {
        return Err(ConfigError::AxisConflict { forward, up });
    }

    let forward = forward.vector();
    let up = up.vector();
    // Host right is forward x up = +X
    Ok(Mat3::from_cols(forward.cross(up), forward, up))
}

/// Build the global transform: uniform scale composed with the axis rotation
pub fn global_matrix(forward: Axis, up: Axis, scale: f32) -> Result<Mat4, ConfigError> {
    if !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
        return Err(ConfigError::ScaleOutOfRange(scale));
    }
    let rotation = axis_conversion(forward, up)?;
    Ok(Mat4::from_scale(Vec3::splat(scale)) * Mat4::from_mat3(rotation))
}

/// Global transform for a resolved configuration
pub fn global_matrix_for(config: &ExportConfig) -> Result<Mat4, ConfigError> {
    global_matrix(config.axis_forward, config.axis_up, config.global_scale)
}

/// Widen a single-precision matrix for decomposition
pub fn to_f64(matrix: Mat4) -> DMat4 {
    DMat4::from_cols_array(&matrix.to_cols_array().map(f64::from))
}

/// A matrix split into FBX local transform properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: DVec3,
    /// Euler XYZ (X applied first), degrees
    pub rotation: DVec3,
    pub scale: DVec3,
}

impl Trs {
    /// Decompose an affine matrix
    pub fn from_matrix(matrix: DMat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        // Rz * Ry * Rx, returned as (z, y, x)
        let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
        Self {
            translation,
            rotation: DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()),
            scale,
        }
    }

    /// Decompose, keeping each Euler angle within 180 degrees of `previous`
    pub fn from_matrix_continuous(matrix: DMat4, previous: DVec3) -> Self {
        let mut trs = Self::from_matrix(matrix);
        trs.rotation = DVec3::new(
            unwrap_angle(trs.rotation.x, previous.x),
            unwrap_angle(trs.rotation.y, previous.y),
            unwrap_angle(trs.rotation.z, previous.z),
        );
        trs
    }
}

fn unwrap_angle(angle: f64, previous: f64) -> f64 {
    angle + ((previous - angle) / 360.0).round() * 360.0
}

/// Compose a local matrix from Euler XYZ radians, location and scale
pub fn compose(location: DVec3, rotation: DVec3, scale: DVec3) -> DMat4 {
    let rotation = glam::DQuat::from_euler(EulerRot::ZYX, rotation.z, rotation.y, rotation.x);
    DMat4::from_scale_rotation_translation(scale, rotation, location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const AXES: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::NegX, Axis::NegY, Axis::NegZ];

    #[test]
    fn test_every_valid_pair_is_orthogonal() {
        for forward in AXES {
            for up in AXES {
                if forward.is_parallel(up) {
                    continue;
                }
                let scale = 2.5;
                let m = global_matrix(forward, up, scale).unwrap();
                let cols = [m.x_axis.truncate(), m.y_axis.truncate(), m.z_axis.truncate()];

                for (i, a) in cols.iter().enumerate() {
                    assert_relative_eq!(a.length() / scale, 1.0, epsilon = 1e-6);
                    for b in &cols[i + 1..] {
                        assert_relative_eq!(a.dot(*b), 0.0, epsilon = 1e-5);
                    }
                }
                assert_relative_eq!(Mat3::from_mat4(m).determinant(), scale.powi(3), epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_maps_host_axes_to_target() {
        let m = global_matrix(Axis::NegZ, Axis::Y, 1.0).unwrap();
        assert!(m.transform_vector3(HOST_FORWARD).abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(m.transform_vector3(HOST_UP).abs_diff_eq(Vec3::Y, 1e-6));
        assert!(m.transform_vector3(Vec3::X).abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_identity_for_host_axes() {
        let m = global_matrix(Axis::Y, Axis::Z, 1.0).unwrap();
        assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_rejects_parallel_axes() {
        assert_eq!(
            axis_conversion(Axis::Z, Axis::NegZ),
            Err(ConfigError::AxisConflict {
                forward: Axis::Z,
                up: Axis::NegZ
            })
        );
        assert!(global_matrix(Axis::X, Axis::X, 1.0).is_err());
    }

    #[test]
    fn test_rejects_scale_out_of_range() {
        assert_eq!(
            global_matrix(Axis::Y, Axis::Z, 0.0),
            Err(ConfigError::ScaleOutOfRange(0.0))
        );
    }

    #[test]
    fn test_decompose_round_trip() {
        let location = DVec3::new(1.0, -2.0, 3.5);
        let rotation = DVec3::new(10f64.to_radians(), 20f64.to_radians(), 30f64.to_radians());
        let scale = DVec3::new(1.0, 2.0, 0.5);
        let trs = Trs::from_matrix(compose(location, rotation, scale));

        assert_relative_eq!(trs.translation.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(trs.rotation.x, 10.0, epsilon = 1e-6);
        assert_relative_eq!(trs.rotation.y, 20.0, epsilon = 1e-6);
        assert_relative_eq!(trs.rotation.z, 30.0, epsilon = 1e-6);
        assert_relative_eq!(trs.scale.y, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_continuous_euler_unwraps() {
        let matrix = compose(DVec3::ZERO, DVec3::new(0.0, 0.0, (-170f64).to_radians()), DVec3::ONE);
        let trs = Trs::from_matrix_continuous(matrix, DVec3::new(0.0, 0.0, 175.0));
        assert_relative_eq!(trs.rotation.z, 190.0, epsilon = 1e-6);
    }
}
