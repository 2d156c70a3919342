//! Placement transforms.
//!
//! Rotations are stored as xyz Euler angles in radians, composed as
//! `Rz(c) * Ry(b) * Rx(a)`, which is nalgebra's roll-pitch-yaw convention.

use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rotation and translation of a placement in the mother frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub rotation: [f64; 3],
    pub translation: [f64; 3],
}

impl Transform {
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            rotation: [0.0; 3],
            translation: [x, y, z],
        }
    }

    pub fn new(rotation: [f64; 3], translation: [f64; 3]) -> Self {
        Self { rotation, translation }
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation.iter().any(|a| *a != 0.0)
    }

    /// Active rotation of the daughter
    pub fn rotation_matrix(&self) -> Rotation3<f64> {
        let [a, b, c] = self.rotation;
        Rotation3::from_euler_angles(a, b, c)
    }

    /// The transform as a rigid motion from the daughter into the mother frame
    pub fn isometry(&self) -> Isometry3<f64> {
        let [a, b, c] = self.rotation;
        Isometry3::from_parts(
            Translation3::from(Vector3::from(self.translation)),
            UnitQuaternion::from_euler_angles(a, b, c),
        )
    }

    /// Map a point of the daughter frame into the mother frame
    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let mapped = self.rotation_matrix() * Point3::from(point) + Vector3::from(self.translation);
        mapped.coords.into()
    }
}

/// xyz Euler angles of a rotation
pub fn euler_angles(rotation: &Rotation3<f64>) -> [f64; 3] {
    let (a, b, c) = rotation.euler_angles();
    [a, b, c]
}
