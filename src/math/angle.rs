use std::f32::consts::{PI, TAU};

/// Wraps `angle` into `[0, 2π)`. Non-finite input maps to `0`.
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round tiny negatives up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Circular distance from `angle` to `bound`, checking the copies of `angle`
/// one turn below and above so the 0/2π seam is handled.
fn seam_distance(bound: f32, angle: f32) -> f32 {
    (bound - angle)
        .abs()
        .min((bound - (angle - TAU)).abs())
        .min((bound - (angle + TAU)).abs())
}

/// Clamps `angle` into the arc running counter-clockwise from `min` to `max`.
///
/// `angle` is wrapped to `[0, 2π)` first. Bounds are expected in `[0, 2π)`;
/// when `min > max` the valid arc crosses the seam (e.g. `[300°, 45°]`).
/// Bounds are inclusive. Angles outside the arc snap to whichever bound is
/// circularly closer; ties go to `max`.
pub fn wrap_clamp_angle(angle: f32, min: f32, max: f32) -> f32 {
    let angle = normalize_angle(angle);

    let outside = if min > max {
        angle > max && angle < min
    } else {
        angle < min || angle > max
    };

    if !outside {
        return angle;
    }

    if seam_distance(min, angle) < seam_distance(max, angle) {
        min
    } else {
        max
    }
}

/// An inclusive `[min, max]` arc of valid angles, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleRange {
    pub min: f32,
    pub max: f32,
}

impl AngleRange {
    /// Builds a full-circle range with both bounds wrapped into `[0, 2π)`.
    ///
    /// Returns `None` when the input spans a whole turn or more, or when
    /// either bound is not finite: both mean "unconstrained".
    pub fn wrapped(min: f32, max: f32) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() || (max - min).abs() >= TAU {
            return None;
        }
        Some(Self {
            min: normalize_angle(min),
            max: normalize_angle(max),
        })
    }

    /// Builds a polar range clamped into `[0, π]` with `max >= min`.
    pub fn polar(min: f32, max: f32) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() {
            return None;
        }
        let min = min.clamp(0.0, PI);
        let max = max.clamp(0.0, PI).max(min);
        Some(Self { min, max })
    }

    pub fn clamp(&self, angle: f32) -> f32 {
        wrap_clamp_angle(angle, self.min, self.max)
    }

    /// True when the arc crosses the 0/2π seam.
    pub fn crosses_seam(&self) -> bool {
        self.min > self.max
    }

    pub fn contains(&self, angle: f32) -> bool {
        let angle = normalize_angle(angle);
        if self.crosses_seam() {
            angle >= self.min || angle <= self.max
        } else {
            angle >= self.min && angle <= self.max
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn circular_distance(a: f32, b: f32) -> f32 {
        let d = (normalize_angle(a) - normalize_angle(b)).abs();
        d.min(TAU - d)
    }

    #[test]
    fn normalize_wraps_into_one_turn() {
        assert_abs_diff_eq!(normalize_angle(-PI / 2.0), 1.5 * PI, epsilon = 1e-6);
        assert_abs_diff_eq!(normalize_angle(5.0 * PI), PI, epsilon = 1e-5);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
        assert!(normalize_angle(-1e-9) < TAU);
    }

    #[test]
    fn inside_normal_range_is_identity() {
        let (min, max) = (0.5, 2.0);
        for i in 0..=30 {
            let angle = min + (max - min) * i as f32 / 30.0;
            assert_abs_diff_eq!(wrap_clamp_angle(angle, min, max), angle, epsilon = 1e-6);
            // same angle one turn away
            assert_abs_diff_eq!(
                wrap_clamp_angle(angle + TAU, min, max),
                angle,
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn inside_seam_crossing_range_is_identity() {
        let (min, max) = (300f32.to_radians(), 45f32.to_radians());
        for deg in (300..360).chain(0..=45) {
            let angle = (deg as f32).to_radians();
            assert_abs_diff_eq!(wrap_clamp_angle(angle, min, max), angle, epsilon = 1e-6);
        }
        // negative form of an inside angle
        assert_abs_diff_eq!(
            wrap_clamp_angle(-10f32.to_radians(), min, max),
            350f32.to_radians(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn outside_snaps_to_closest_bound() {
        let ranges = [
            (0.5f32, 2.0f32),
            (300f32.to_radians(), 45f32.to_radians()),
            (0.0, PI / 2.0),
            (1.0, 6.0),
        ];
        for (min, max) in ranges {
            let range = AngleRange { min, max };
            for step in 0..360 {
                let angle = (step as f32).to_radians();
                if range.contains(angle) {
                    continue;
                }
                let clamped = wrap_clamp_angle(angle, min, max);
                assert!(clamped == min || clamped == max);
                let to_min = circular_distance(angle, min);
                let to_max = circular_distance(angle, max);
                let expected = if to_min < to_max { min } else { max };
                if (to_min - to_max).abs() > 1e-4 {
                    assert_eq!(clamped, expected, "angle {step}° range [{min}, {max}]");
                }
            }
        }
    }

    #[test]
    fn bounds_are_fixed_points() {
        let ranges = [(0.5f32, 2.0f32), (5.0, 1.0), (0.0, PI)];
        for (min, max) in ranges {
            assert_eq!(wrap_clamp_angle(min, min, max), min);
            assert_eq!(wrap_clamp_angle(max, min, max), max);
        }
    }

    #[test]
    fn seam_snap_prefers_wrapped_neighbour() {
        // 350° is 10° from 0° across the seam, 80° from 90°
        let clamped = wrap_clamp_angle(350f32.to_radians(), 0.0, PI / 2.0);
        assert_eq!(clamped, 0.0);
        // 200° is closer to 90° than to 0°/360°
        let clamped = wrap_clamp_angle(200f32.to_radians(), 0.0, PI / 2.0);
        assert_eq!(clamped, PI / 2.0);
    }

    #[test]
    fn wrapped_range_normalizes_bounds() {
        let range = AngleRange::wrapped(-PI / 4.0, PI / 4.0).unwrap();
        assert_abs_diff_eq!(range.min, 1.75 * PI, epsilon = 1e-6);
        assert_abs_diff_eq!(range.max, PI / 4.0, epsilon = 1e-6);
        assert!(range.crosses_seam());
        assert!(range.contains(0.0));
        assert!(!range.contains(PI));
    }

    #[test]
    fn full_turn_range_is_unconstrained() {
        assert!(AngleRange::wrapped(0.0, TAU).is_none());
        assert!(AngleRange::wrapped(-PI, PI).is_none());
        assert!(AngleRange::wrapped(f32::NAN, 1.0).is_none());
    }

    #[test]
    fn polar_range_stays_in_half_turn() {
        let range = AngleRange::polar(-1.0, 4.0).unwrap();
        assert_eq!(range.min, 0.0);
        assert_eq!(range.max, PI);
        let inverted = AngleRange::polar(1.0, 0.5).unwrap();
        assert_eq!(inverted.min, 1.0);
        assert_eq!(inverted.max, 1.0);
    }
}
