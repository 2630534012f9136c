// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Drawing geometry for skeletons.

use crate::topology::{DRAWN_LIMB_COUNT, LIMBS, Limb};

/// Radius of the filled circle drawn at every candidate.
pub const JOINT_RADIUS: i32 = 4;

/// Half-width of the ellipse drawn for a limb.
pub const STICK_WIDTH: i32 = 4;

/// Angular step of the limb ellipse polygon, in degrees.
pub const ELLIPSE_STEP_DEG: i32 = 1;

/// Weight of the canvas before a limb is drawn.
pub const CANVAS_WEIGHT: f32 = 0.4;

/// Weight of the canvas copy holding the filled limb.
pub const OVERLAY_WEIGHT: f32 = 0.6;

/// Limb types that are rendered (the two shoulder-to-ear limbs are not).
#[must_use]
pub fn drawn_limbs() -> &'static [Limb] {
    &LIMBS[..DRAWN_LIMB_COUNT]
}

/// Polygon approximating a rotated ellipse, in integer pixel coordinates.
///
/// `angle_deg` rotates the `semi_major` axis from +x toward +y. Consecutive
/// duplicate points are dropped, as is a closing point equal to the first.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn ellipse_polygon(
    center: (i32, i32),
    semi_major: i32,
    semi_minor: i32,
    angle_deg: i32,
) -> Vec<(i32, i32)> {
    let (beta, alpha) = f64::from(angle_deg).to_radians().sin_cos();
    let mut points: Vec<(i32, i32)> = Vec::with_capacity(361);

    for step in (0..=360).step_by(ELLIPSE_STEP_DEG.unsigned_abs() as usize) {
        let (sin_t, cos_t) = f64::from(step).to_radians().sin_cos();
        let x = f64::from(semi_major) * cos_t;
        let y = f64::from(semi_minor) * sin_t;
        let point = (
            (f64::from(center.0) + x * alpha - y * beta).round() as i32,
            (f64::from(center.1) + x * beta + y * alpha).round() as i32,
        );
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::JointType;

    #[test]
    fn test_drawn_limbs() {
        let limbs = drawn_limbs();
        assert_eq!(limbs.len(), 17);
        assert!(!limbs.iter().any(|l| matches!(
            (l.joint_a, l.joint_b),
            (JointType::RightShoulder, JointType::RightEar)
                | (JointType::LeftShoulder, JointType::LeftEar)
        )));
    }

    #[test]
    fn test_axis_aligned_ellipse() {
        let poly = ellipse_polygon((50, 40), 10, 4, 0);
        assert_eq!(poly.first(), Some(&(60, 40)));
        assert!(poly.contains(&(40, 40)));
        assert!(poly.contains(&(50, 44)));
        assert!(poly.contains(&(50, 36)));
        assert_ne!(poly.first(), poly.last());
        let max_x = poly.iter().map(|p| p.0).max().unwrap();
        assert_eq!(max_x, 60);
    }

    #[test]
    fn test_rotated_ellipse() {
        let poly = ellipse_polygon((0, 0), 10, 4, 90);
        assert_eq!(poly.first(), Some(&(0, 10)));
        let max_x = poly.iter().map(|p| p.0).max().unwrap();
        assert_eq!(max_x, 4);
    }

    #[test]
    fn test_degenerate_ellipse() {
        let poly = ellipse_polygon((5, 5), 0, 0, 0);
        assert_eq!(poly, vec![(5, 5)]);
    }
}
