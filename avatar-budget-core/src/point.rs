//! Point types and related functionality

use nalgebra::Point3;

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A texture coordinate pair
pub type Uv = [f32; 2];

/// Midpoint of two texture coordinates
#[inline]
pub fn uv_midpoint(a: Uv, b: Uv) -> Uv {
    [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5]
}
