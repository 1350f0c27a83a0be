//! Affine 2-D matrix helpers on top of glam
//!
//! Matrices are homogeneous 3x3 affine transforms. glam stores them by
//! column; [`to_row_major`] gives the row-major 9-float view used when a
//! matrix is logged or handed to code that expects that layout.

use glam::{Mat3, Vec2};

/// 2-D vector used for positions, scales, UVs and velocities
pub type Vector = Vec2;

/// 3x3 homogeneous affine matrix
pub type Matrix = Mat3;

pub const DEG_TO_RAD: f32 = std::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / std::f32::consts::PI;

/// Pure scale matrix
pub fn scale(scale: Vector) -> Matrix {
    Mat3::from_scale(scale)
}

/// Pure rotation matrix, angle in radians
///
/// Positive angles turn +X towards +Y, which on a y-down screen is clockwise.
pub fn rotation(radians: f32) -> Matrix {
    Mat3::from_angle(radians)
}

/// Pure translation matrix
pub fn translation(offset: Vector) -> Matrix {
    Mat3::from_translation(offset)
}

/// `a * b`: applies `b` first, then `a`
pub fn mul(a: &Matrix, b: &Matrix) -> Matrix {
    *a * *b
}

/// Transform a point (affine, no perspective divide)
pub fn transform_point(m: &Matrix, point: Vector) -> Vector {
    m.transform_point2(point)
}

/// Translation column of the matrix
pub fn get_translation(m: &Matrix) -> Vector {
    m.z_axis.truncate()
}

/// Rotation in radians
///
/// Read from the first column, so it is exact for any positive scale.
/// Mirrored matrices report the rotation of their mirrored basis.
pub fn get_rotation(m: &Matrix) -> f32 {
    m.x_axis.y.atan2(m.x_axis.x)
}

/// Per-axis scale magnitude (column L2 norm). The sign is not recoverable.
pub fn get_scaling(m: &Matrix) -> Vector {
    Vec2::new(m.x_axis.truncate().length(), m.y_axis.truncate().length())
}

/// Local matrix for a position, rotation (degrees) and scale
///
/// Order: scale first, then rotation, then translation.
pub fn compose(position: Vector, rotation_deg: f32, scale_by: Vector) -> Matrix {
    translation(position) * rotation(rotation_deg * DEG_TO_RAD) * scale(scale_by)
}

/// Direction the local +Y axis points to after the transform, normalized
pub fn forward(m: &Matrix) -> Vector {
    m.y_axis.truncate().normalize_or_zero()
}

/// Row-major copy of the matrix: `[m00, m01, m02, m10, ...]`
pub fn to_row_major(m: &Matrix) -> [f32; 9] {
    m.transpose().to_cols_array()
}

/// Linear interpolation with `t` clamped to `[0, 1]`
pub fn lerp_number(a: f32, b: f32, t: f32) -> f32 {
    if t >= 1.0 {
        return b;
    }
    if t <= 0.0 {
        return a;
    }
    (1.0 - t) * a + t * b
}

/// Component-wise [`lerp_number`]
pub fn vector_lerp(a: Vector, b: Vector, t: f32) -> Vector {
    Vec2::new(lerp_number(a.x, b.x, t), lerp_number(a.y, b.y, t))
}
