//! Joint constraints
//!
//! A joint's rotation (relative to its bind pose) is split into a twist about
//! the bone axis and a swing that moves the bone axis. The swing is limited
//! by moving the swung bone direction, a point on the unit sphere, back into
//! the allowed region; the twist is limited by clamping its angle.

use crate::math::{angle_between, AngleRange, Mat3, Quat, Vec3, DEGENERATE_LENGTH_SQ};
use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintKind {
    /// Free swing, optional twist limits.
    #[default]
    Omni,
    /// Swing restricted to a plane, optionally to an arc of it.
    Hinge,
    /// Swing restricted in spherical coordinates around an axis.
    BallSocket,
}

/// Description of a joint constraint, as supplied by an editor.
///
/// All angles are radians. `None` leaves that axis unconstrained. `axis` is
/// given in a frame where `+Z` is the bone direction and defaults to `+Z`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintSpec {
    pub kind: ConstraintKind,
    pub twist: Option<[f32; 2]>,
    pub axis: Option<Vec3>,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub polar: Option<[f32; 2]>,
    pub azimuth: Option<[f32; 2]>,
}

impl ConstraintSpec {
    pub fn omni() -> Self {
        Self::default()
    }

    pub fn hinge() -> Self {
        Self {
            kind: ConstraintKind::Hinge,
            ..Self::default()
        }
    }

    pub fn ball_socket() -> Self {
        Self {
            kind: ConstraintKind::BallSocket,
            ..Self::default()
        }
    }

    pub fn with_twist(mut self, min: f32, max: f32) -> Self {
        self.twist = Some([min, max]);
        self
    }

    pub fn with_axis(mut self, axis: Vec3) -> Self {
        self.axis = Some(axis);
        self
    }

    /// Hinge arc. Both bounds are needed for the arc to apply.
    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_polar(mut self, min: f32, max: f32) -> Self {
        self.polar = Some([min, max]);
        self
    }

    pub fn with_azimuth(mut self, min: f32, max: f32) -> Self {
        self.azimuth = Some([min, max]);
        self
    }
}

/// Corrects a swung bone direction so it lies inside the allowed region.
pub trait SwingConstraint: Send + Sync + Debug {
    fn apply(&self, point: Vec3) -> Vec3;
}

/// Orthonormal right-handed frame the swing limits are measured in.
///
/// `front` is the constraint axis, `right` marks angle zero around it and
/// `up` marks angle π/2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingFrame {
    pub front: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl SwingFrame {
    /// Builds the frame for `axis` (expressed with `+Z` along the bone) and
    /// maps it into the bone's parent frame.
    ///
    /// `right = Y x front`; if `front` is parallel to `Y`, `right` is `+X`.
    pub fn new(bone_dir: Vec3, axis: Option<Vec3>) -> Self {
        let front = axis
            .filter(|a| a.is_finite() && a.length_squared() >= DEGENERATE_LENGTH_SQ)
            .map(Vec3::normalize)
            .unwrap_or(Vec3::Z);
        let right = Vec3::Y.cross(front);
        let right = if right.length_squared() < DEGENERATE_LENGTH_SQ {
            Vec3::X
        } else {
            right.normalize()
        };
        let up = front.cross(right).normalize();

        let to_bone = bone_basis(bone_dir);
        Self {
            front: (to_bone * front).normalize(),
            right: (to_bone * right).normalize(),
            up: (to_bone * up).normalize(),
        }
    }

    /// Angle in `[0, 2π)` of `point` around `front`, measured from `right`
    /// towards `up`. Only the part of `point` orthogonal to `front` counts.
    pub fn azimuth_of(&self, point: Vec3) -> f32 {
        let rejection = point - self.front * self.front.dot(point);
        let angle = angle_between(self.right, rejection);
        if self.up.dot(rejection) < 0.0 {
            2.0 * PI - angle
        } else {
            angle
        }
    }
}

/// Basis taking `+Z` onto `bone_dir`, with `+X` horizontal when possible.
fn bone_basis(bone_dir: Vec3) -> Mat3 {
    let z = bone_dir;
    let x = Vec3::Y.cross(z);
    let x = if x.length_squared() < DEGENERATE_LENGTH_SQ {
        Vec3::X
    } else {
        x.normalize()
    };
    let y = z.cross(x);
    Mat3::from_cols(x, y, z)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HingeLimit {
    pub frame: SwingFrame,
    /// Arc of allowed angles around `front`; `None` only flattens onto the plane.
    pub limit: Option<AngleRange>,
}

impl SwingConstraint for HingeLimit {
    fn apply(&self, point: Vec3) -> Vec3 {
        let front = self.frame.front;
        let projected = point - front * front.dot(point);
        let projected = if projected.length_squared() < DEGENERATE_LENGTH_SQ {
            self.frame.right
        } else {
            projected.normalize()
        };

        let Some(limit) = self.limit else {
            return projected;
        };

        let angle = limit.clamp(self.frame.azimuth_of(projected));
        Quat::from_axis_angle(front, angle) * self.frame.right
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallSocketLimit {
    pub frame: SwingFrame,
    /// Aperture from `front`, inside `[0, π]`.
    pub polar: Option<AngleRange>,
    /// Angle around `front`, measured from `right`.
    pub azimuth: Option<AngleRange>,
}

impl SwingConstraint for BallSocketLimit {
    fn apply(&self, point: Vec3) -> Vec3 {
        if self.polar.is_none() && self.azimuth.is_none() {
            return point;
        }
        let frame = &self.frame;

        let mut polar = angle_between(frame.front, point);
        let mut azimuth = frame.azimuth_of(point);
        if let Some(range) = self.polar {
            polar = range.clamp(polar);
        }
        if let Some(range) = self.azimuth {
            azimuth = range.clamp(azimuth);
        }

        let on_equator = Quat::from_axis_angle(frame.front, azimuth) * frame.right;
        let tilt_axis = on_equator.cross(frame.front).normalize();
        Quat::from_axis_angle(tilt_axis, FRAC_PI_2 - polar) * on_equator
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SwingLimit {
    Omni,
    Hinge(HingeLimit),
    BallSocket(BallSocketLimit),
}

impl SwingLimit {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            SwingLimit::Omni => ConstraintKind::Omni,
            SwingLimit::Hinge(_) => ConstraintKind::Hinge,
            SwingLimit::BallSocket(_) => ConstraintKind::BallSocket,
        }
    }

    pub fn frame(&self) -> Option<&SwingFrame> {
        match self {
            SwingLimit::Omni => None,
            SwingLimit::Hinge(h) => Some(&h.frame),
            SwingLimit::BallSocket(b) => Some(&b.frame),
        }
    }

    fn from_spec(bone_dir: Vec3, spec: &ConstraintSpec) -> Self {
        match spec.kind {
            ConstraintKind::Omni => SwingLimit::Omni,
            ConstraintKind::Hinge => SwingLimit::Hinge(HingeLimit {
                frame: SwingFrame::new(bone_dir, spec.axis),
                limit: match (spec.min, spec.max) {
                    (Some(min), Some(max)) => AngleRange::wrapped(min, max),
                    _ => None,
                },
            }),
            ConstraintKind::BallSocket => SwingLimit::BallSocket(BallSocketLimit {
                frame: SwingFrame::new(bone_dir, spec.axis),
                polar: spec.polar.and_then(|[min, max]| AngleRange::polar(min, max)),
                azimuth: spec
                    .azimuth
                    .and_then(|[min, max]| AngleRange::wrapped(min, max)),
            }),
        }
    }
}

impl SwingConstraint for SwingLimit {
    fn apply(&self, point: Vec3) -> Vec3 {
        match self {
            SwingLimit::Omni => point,
            SwingLimit::Hinge(h) => h.apply(point),
            SwingLimit::BallSocket(b) => b.apply(point),
        }
    }
}

/// Rotation limits of one joint, measured around the bind direction of the
/// bone it drives.
#[derive(Debug, Clone, PartialEq)]
pub struct JointConstraint {
    bone_dir: Vec3,
    twist: Option<AngleRange>,
    swing: SwingLimit,
}

impl JointConstraint {
    /// `bone_dir` is the bind direction of the joint's child. A degenerate
    /// direction falls back to `+Y`.
    pub fn new(bone_dir: Vec3, spec: &ConstraintSpec) -> Self {
        let bone_dir = if bone_dir.is_finite() && bone_dir.length_squared() >= DEGENERATE_LENGTH_SQ
        {
            bone_dir.normalize()
        } else {
            Vec3::Y
        };
        Self {
            bone_dir,
            twist: twist_range(spec),
            swing: SwingLimit::from_spec(bone_dir, spec),
        }
    }

    /// Updates the limits in place. Returns `false`, leaving `self` untouched,
    /// when `spec` asks for a different kind of constraint.
    pub fn update(&mut self, spec: &ConstraintSpec) -> bool {
        if spec.kind != self.kind() {
            return false;
        }
        self.twist = twist_range(spec);
        self.swing = SwingLimit::from_spec(self.bone_dir, spec);
        true
    }

    pub fn kind(&self) -> ConstraintKind {
        self.swing.kind()
    }

    pub fn bone_dir(&self) -> Vec3 {
        self.bone_dir
    }

    pub fn twist_range(&self) -> Option<AngleRange> {
        self.twist
    }

    pub fn swing_limit(&self) -> &SwingLimit {
        &self.swing
    }

    pub fn frame(&self) -> Option<&SwingFrame> {
        self.swing.frame()
    }

    /// Clamps a twist/swing pair in place.
    ///
    /// `swing` is rebuilt as the minimal rotation from the bone direction to
    /// the corrected swing point, `twist` as a rotation about the bone
    /// direction by the clamped twist angle.
    pub fn apply(&self, twist: &mut Quat, swing: &mut Quat) {
        let bone_dir = self.bone_dir;

        let point = self.swing.apply(*swing * bone_dir);
        *swing = swing_towards(bone_dir, point);

        if let Some(range) = self.twist {
            let angle = range.clamp(twist_angle(*twist, bone_dir));
            *twist = Quat::from_axis_angle(bone_dir, angle);
        }
    }
}

fn twist_range(spec: &ConstraintSpec) -> Option<AngleRange> {
    spec.twist
        .and_then(|[min, max]| AngleRange::wrapped(min, max))
}

/// Minimal rotation from unit `bone_dir` onto `point`.
fn swing_towards(bone_dir: Vec3, point: Vec3) -> Quat {
    if !point.is_finite() {
        return Quat::IDENTITY;
    }
    let axis = bone_dir.cross(point);
    if axis.length_squared() < 1e-12 {
        if bone_dir.dot(point) < 0.0 {
            return Quat::from_axis_angle(bone_dir.any_orthonormal_vector(), PI);
        }
        return Quat::IDENTITY;
    }
    Quat::from_axis_angle(axis.normalize(), angle_between(bone_dir, point)).normalize()
}

/// Signed angle of a twist quaternion about unit `axis`, in `(-2π, 2π]`.
///
/// `2 * atan2(v . axis, w)`: the sign of the vector part along the axis picks
/// the rotation direction, so `q` and `-q` give angles a full turn apart.
pub fn twist_angle(twist: Quat, axis: Vec3) -> f32 {
    let along = Vec3::new(twist.x, twist.y, twist.z).dot(axis);
    2.0 * along.atan2(twist.w)
}

/// Splits `rotation` into `(swing, twist)` with `rotation = swing * twist` and
/// `twist` a rotation about unit `axis`.
///
/// When the rotation is a half turn about an axis orthogonal to `axis` the
/// twist part vanishes and is taken as identity.
pub fn swing_twist(rotation: Quat, axis: Vec3) -> (Quat, Quat) {
    let projected = axis * Vec3::new(rotation.x, rotation.y, rotation.z).dot(axis);
    let twist = Quat::from_xyzw(projected.x, projected.y, projected.z, rotation.w);
    let twist = if twist.length_squared() < 1e-12 {
        Quat::IDENTITY
    } else {
        twist.normalize()
    };
    let swing = (rotation * twist.conjugate()).normalize();
    (swing, twist)
}
