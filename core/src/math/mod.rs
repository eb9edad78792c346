//! Vector/point/normal algebra, 4x4 transforms, axis-aligned bounds and rays.
//!
//! Ported from a generic-over-`na` camera/geometry layer down to self-contained
//! generic structs, the way this crate's own modern `bounds.rs`/`geometry/normal.rs`
//! already moved away from external linear-algebra crates.

mod vector;
mod point;
mod normal;
mod matrix;
mod transform;
mod bounds;
mod ray;

pub use self::bounds::{Axis, Bounds3};
pub use self::matrix::Matrix4x4;
pub use self::normal::Normal3;
pub use self::point::{Point2, Point3};
pub use self::ray::Ray;
pub use self::transform::Transform;
pub use self::vector::{Vector2, Vector3};

use crate::Float;

#[inline]
pub fn cos_theta(w: &Vector3) -> Float {
    w.z
}

#[inline]
pub fn cos2_theta(w: &Vector3) -> Float {
    w.z * w.z
}

#[inline]
pub fn abs_cos_theta(w: &Vector3) -> Float {
    w.z.abs()
}

#[inline]
pub fn sin2_theta(w: &Vector3) -> Float {
    (1.0 - cos2_theta(w)).max(0.0)
}

#[inline]
pub fn sin_theta(w: &Vector3) -> Float {
    sin2_theta(w).sqrt()
}

#[inline]
pub fn tan_theta(w: &Vector3) -> Float {
    sin_theta(w) / cos_theta(w)
}

#[inline]
pub fn same_hemisphere(w: &Vector3, wp: &Vector3) -> bool {
    w.z * wp.z > 0.0
}

#[inline]
pub fn spherical_theta(v: &Vector3) -> Float {
    crate::clamp(v.z, -1.0, 1.0).acos()
}

#[inline]
pub fn spherical_phi(v: &Vector3) -> Float {
    let p = v.y.atan2(v.x);
    if p < 0.0 {
        p + 2.0 * std::f32::consts::PI
    } else {
        p
    }
}

#[inline]
pub fn face_forward(v1: Vector3, v2: Vector3) -> Vector3 {
    if v1.dot(v2) < 0.0 {
        -v1
    } else {
        v1
    }
}

#[inline]
pub fn face_forward_n(n: Normal3, v: Vector3) -> Normal3 {
    if n.to_vector().dot(v) < 0.0 {
        -n
    } else {
        n
    }
}

/// Offsets a ray origin off a surface along its geometric normal, biased towards
/// the side `w` points into, to dodge self-intersection. `p_error` is the bound on
/// the floating point error accumulated while computing `p`.
pub fn offset_ray_origin(p: Point3, p_error: Vector3, n: Normal3, w: Vector3) -> Point3 {
    let d = n.to_vector().abs().dot(p_error) + crate::SHADOW_EPSILON;
    let mut offset = n.to_vector() * d;
    if w.dot(n.to_vector()) < 0.0 {
        offset = -offset;
    }
    p + offset
}
