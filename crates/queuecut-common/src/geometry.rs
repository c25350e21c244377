//! World-space helpers shared by the queue model and detection.
//!
//! All positions are `glam::Vec3` with +Y up. Distances used for gameplay
//! checks are full 3D distances; the queue lies on a horizontal plane so the
//! vertical component only matters for the configured height offset.

use glam::Vec3;

/// World up axis.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Returns the horizontal axis perpendicular to `direction`, pointing to the
/// right-hand side of someone facing along it.
///
/// Falls back to +X when `direction` is parallel to the up axis.
#[must_use]
pub fn lateral_axis(direction: Vec3) -> Vec3 {
    let right = WORLD_UP.cross(direction).normalize_or_zero();
    if right == Vec3::ZERO {
        Vec3::X
    } else {
        right
    }
}

/// Normalizes a direction, falling back to +Z for degenerate input.
#[must_use]
pub fn unit_or_forward(direction: Vec3) -> Vec3 {
    let unit = direction.normalize_or_zero();
    if unit == Vec3::ZERO {
        Vec3::Z
    } else {
        unit
    }
}

/// Whether `point` lies inside a cone starting at `origin`.
///
/// `full_angle` is the opening angle in radians (both sides combined).
#[must_use]
pub fn within_cone(origin: Vec3, facing: Vec3, point: Vec3, range: f32, full_angle: f32) -> bool {
    let offset = point - origin;
    let distance = offset.length();
    if distance > range {
        return false;
    }
    if distance < f32::EPSILON {
        return true;
    }
    let to_point = offset / distance;
    to_point.dot(unit_or_forward(facing)) > (full_angle * 0.5).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lateral_axis_of_forward() {
        let right = lateral_axis(Vec3::Z);
        assert!((right - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_lateral_axis_degenerate() {
        assert_eq!(lateral_axis(Vec3::Y), Vec3::X);
        assert_eq!(lateral_axis(Vec3::ZERO), Vec3::X);
    }

    #[test]
    fn test_unit_or_forward() {
        assert_eq!(unit_or_forward(Vec3::ZERO), Vec3::Z);
        let unit = unit_or_forward(Vec3::new(3.0, 0.0, 4.0));
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_within_cone() {
        let origin = Vec3::ZERO;
        let facing = Vec3::Z;
        let angle = std::f32::consts::FRAC_PI_3;

        assert!(within_cone(origin, facing, Vec3::new(0.0, 0.0, 5.0), 8.0, angle));
        assert!(!within_cone(origin, facing, Vec3::new(0.0, 0.0, 9.0), 8.0, angle));
        assert!(!within_cone(origin, facing, Vec3::new(5.0, 0.0, 0.0), 8.0, angle));
        assert!(!within_cone(origin, facing, Vec3::new(0.0, 0.0, -3.0), 8.0, angle));
    }

    proptest! {
        #[test]
        fn prop_lateral_axis_is_horizontal_and_perpendicular(
            x in -10.0f32..10.0,
            z in -10.0f32..10.0,
        ) {
            prop_assume!(x.abs() > 0.01 || z.abs() > 0.01);
            let direction = Vec3::new(x, 0.0, z).normalize();
            let right = lateral_axis(direction);
            prop_assert!(right.dot(direction).abs() < 1e-4);
            prop_assert!(right.y.abs() < 1e-6);
            prop_assert!((right.length() - 1.0).abs() < 1e-4);
        }
    }
}
