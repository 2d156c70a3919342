//! Placement math.
//!
//! Pure functions turning radius/angle/index parameters into Cartesian
//! coordinates. Angles in the metadata are in degrees, measured from +X
//! counter-clockwise towards +Y. Lengths are in mm.

use crate::config::require_count;
use crate::error::{GeometryError, Result};
use crate::metadata::{CalibrationTubeMeta, HpgeStringMeta};
use nalgebra::{Unit, Vector3};
use std::f64::consts::PI;

/// Length ratio of copper cooled from room temperature to 88.8 K
pub const THERMAL_CONTRACTION_FACTOR: f64 = 0.997;

/// Cold length of a component with the given room-temperature length
pub fn cold_length(warm_length: f64) -> f64 {
    warm_length * THERMAL_CONTRACTION_FACTOR
}

/// Convert polar coordinates (angle in degrees) to (x, y)
pub fn polar_to_cartesian(radius: f64, angle_in_deg: f64) -> [f64; 2] {
    let angle = angle_in_deg.to_radians();
    [radius * angle.cos(), radius * angle.sin()]
}

/// Axis position of a detector string
pub fn string_position(meta: &HpgeStringMeta) -> [f64; 2] {
    let [x, y] = polar_to_cartesian(meta.radius_in_mm, meta.angle_in_deg);
    match meta.center {
        Some(center) => [center.x_in_mm + x, center.y_in_mm + y],
        None => [x, y],
    }
}

/// Axis position of a calibration tube
pub fn calibration_tube_position(meta: &CalibrationTubeMeta) -> [f64; 2] {
    polar_to_cartesian(meta.radius_in_mm, meta.angle_in_deg)
}

/// Depth of a detector below the top plate surface (positive downward).
///
/// `position_index` counts from 1 at the top of the string.
pub fn detector_depth(position_index: u32, spacing: f64) -> Result<f64> {
    if position_index == 0 {
        return Err(GeometryError::config("detector positions in a string start at 1"));
    }
    Ok(f64::from(position_index) * spacing)
}

/// Depths of the units of a string from their warm rod lengths, top to bottom.
///
/// Every unit hangs one cold rod length below the previous one, so for equal
/// rods the result equals [`detector_depth`] with the cold spacing.
pub fn stacked_depths(warm_rod_lengths: &[f64]) -> Vec<f64> {
    warm_rod_lengths
        .iter()
        .scan(0.0, |depth, &warm| {
            *depth += cold_length(warm);
            Some(*depth)
        })
        .collect()
}

/// Azimuthal angles (radians) of `count` sensors evenly spread over a ring
pub fn ring_angles(count: i64) -> Result<Vec<f64>> {
    let n = require_count("sensor count", count)?;
    Ok((0..n).map(|i| 2.0 * PI * i as f64 / n as f64).collect())
}

/// Rotation (xyz Euler angles) that turns the +Z axis onto `direction`.
///
/// +Z is tilted about +Y by the polar angle of `direction`, then turned about
/// +Z by its azimuth. Built from the two angles, the Euler triple stays exact
/// for horizontal directions, where decomposing a rotation matrix is
/// degenerate.
pub fn rotation_towards(direction: [f64; 3]) -> Result<[f64; 3]> {
    let degenerate = || GeometryError::construction(format!("degenerate looking direction {:?}", direction));
    if !direction.iter().all(|c| c.is_finite()) {
        return Err(degenerate());
    }
    let d = Unit::try_new(Vector3::from(direction), 1e-12).ok_or_else(degenerate)?;

    let polar = d.z.clamp(-1.0, 1.0).acos();
    let azimuth = if d.xy().norm() > 0.0 { d.y.atan2(d.x) } else { 0.0 };
    Ok([0.0, polar, azimuth])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Center;
    use nalgebra::Rotation3;

    fn string_meta(radius: f64, angle: f64) -> HpgeStringMeta {
        HpgeStringMeta {
            radius_in_mm: radius,
            angle_in_deg: angle,
            minishroud_radius_in_mm: 105.0,
            minishroud_delta_length_in_mm: 40.0,
            rod_radius_in_mm: 60.0,
            center: None,
        }
    }

    #[test]
    fn test_string_position() {
        let [x, y] = string_position(&string_meta(500.0, 45.0));
        assert!((x - 353.55).abs() < 1e-2);
        assert!((y - 353.55).abs() < 1e-2);

        let [x, y] = string_position(&string_meta(220.0, 90.0));
        assert!(x.abs() < 1e-9);
        assert!((y - 220.0).abs() < 1e-9);
    }

    #[test]
    fn test_string_position_with_cluster_center() {
        let mut meta = string_meta(220.0, 180.0);
        meta.center = Some(Center { x_in_mm: 550.0, y_in_mm: 190.5 });
        let [x, y] = string_position(&meta);
        assert!((x - 330.0).abs() < 1e-9);
        assert!((y - 190.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_radius_collapses_to_axis() {
        let [x, y] = string_position(&string_meta(0.0, 123.0));
        assert_eq!(x.abs(), 0.0);
        assert_eq!(y.abs(), 0.0);
    }

    #[test]
    fn test_detector_depth() {
        let z = detector_depth(3, 140.1).unwrap();
        assert!((z - 420.3).abs() < 1e-6);
        assert!(detector_depth(0, 140.1).is_err());
    }

    #[test]
    fn test_cold_rod_length() {
        assert_eq!(THERMAL_CONTRACTION_FACTOR, 0.997);
        assert!((cold_length(140.1) - 139.6797).abs() < 1e-9);
    }

    #[test]
    fn test_stacked_depths_match_uniform_spacing() {
        let depths = stacked_depths(&[140.1; 4]);
        let spacing = cold_length(140.1);
        for (i, depth) in depths.iter().enumerate() {
            let expected = detector_depth(i as u32 + 1, spacing).unwrap();
            assert!((depth - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ring_angles() {
        let angles = ring_angles(4).unwrap();
        assert_eq!(angles.len(), 4);
        assert!((angles[1] - PI / 2.0).abs() < 1e-12);
        assert!(ring_angles(0).unwrap().is_empty());
        assert!(matches!(ring_angles(-3), Err(GeometryError::Config(_))));
    }

    #[test]
    fn test_rotation_towards() {
        assert_eq!(rotation_towards([0.0, 0.0, 2.0]).unwrap(), [0.0, 0.0, 0.0]);
        assert_eq!(rotation_towards([0.0, 0.0, -1.0]).unwrap(), [0.0, PI, 0.0]);

        let directions = [
            [1.0, 0.0, 0.0],
            [0.0, -3.0, 0.0],
            [1.0, 1.0, -1.0],
            [-0.8, 0.6, 0.0],
            [0.0, 0.0, -1.0],
        ];
        for direction in directions {
            let [a, b, c] = rotation_towards(direction).unwrap();
            let z = Rotation3::from_euler_angles(a, b, c) * Vector3::z();
            let expected = Vector3::from(direction).normalize();
            assert!((z - expected).norm() < 1e-12, "{:?} -> {:?}", direction, z);
        }

        for direction in [[0.0, 0.0, 0.0], [f64::NAN, 0.0, 1.0]] {
            assert!(matches!(
                rotation_towards(direction),
                Err(GeometryError::Construction(_))
            ));
        }
    }
}
