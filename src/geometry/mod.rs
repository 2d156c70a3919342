//! Geometry model: shapes, transforms and the volume registry.

pub mod registry;
pub mod shapes;
pub mod transform;

pub use registry::{
    ActiveDetector, BorderSurface, DetectorKind, LogicalVolume, RegistryBuilder, Rgba, SkinSurface,
    VisAttributes, VolumeNode, VolumeRegistry,
};
pub use shapes::{BooleanOp, Shape};
pub use transform::{euler_angles, Transform};
