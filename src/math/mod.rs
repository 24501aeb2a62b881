//! Math utilities module
//!
//! Provides convenient re-exports from glam, angle helpers and the guarded
//! vector operations the solvers rely on to never produce NaN rotations.

mod angle;
mod transform;

pub use angle::{normalize_angle, wrap_clamp_angle, AngleRange};
pub use transform::Transform;

// Re-export commonly used glam types
pub use glam::{Mat3, Mat4, Quat, Vec3};

/// Squared length below which a unit-scale axis is treated as degenerate.
pub const DEGENERATE_LENGTH_SQ: f32 = 1e-5;

/// Squared length below which any vector is treated as zero.
pub const ZERO_LENGTH_SQ: f32 = 1e-12;

/// Normalizes `v`, returning `fallback` when `v` is too short or not finite.
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len_sq = v.length_squared();
    if len_sq < ZERO_LENGTH_SQ || !len_sq.is_finite() {
        fallback
    } else {
        v / len_sq.sqrt()
    }
}

/// Angle in `[0, π]` between two vectors, safe for non-unit input.
///
/// Uses `atan2(|a x b|, a . b)`, which keeps precision for tiny angles where
/// `acos` of a dot product rounds to zero.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom < ZERO_LENGTH_SQ || !denom.is_finite() {
        return 0.0;
    }
    a.cross(b).length().atan2(a.dot(b))
}

/// Minimal rotation taking direction `from` onto direction `to`.
///
/// Returns `None` when either input is degenerate or the angle between them
/// is below `min_angle`. Opposite directions rotate by π about an arbitrary
/// axis perpendicular to `from`.
pub fn rotation_between(from: Vec3, to: Vec3, min_angle: f32) -> Option<Quat> {
    if !from.is_finite() || !to.is_finite() {
        return None;
    }
    if from.length_squared() < ZERO_LENGTH_SQ || to.length_squared() < ZERO_LENGTH_SQ {
        return None;
    }
    let from = from.normalize();
    let to = to.normalize();

    let axis = from.cross(to);
    let angle = axis.length().atan2(from.dot(to));
    if angle < min_angle {
        return None;
    }

    let axis = if axis.length_squared() < ZERO_LENGTH_SQ {
        from.any_orthonormal_vector()
    } else {
        axis.normalize()
    };
    Some(Quat::from_axis_angle(axis, angle).normalize())
}
