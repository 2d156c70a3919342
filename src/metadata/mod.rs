//! Detector metadata: document types, the detector provider interface and
//! the generator of synthetic metadata.

pub mod generator;
pub mod provider;
pub mod types;

pub use generator::{generate, DetectorOverride, GeneratedMetadata};
pub use provider::{DetectorDatabase, DetectorProvider};
pub use types::{
    dummy_detector_name, fiber_name, read_channelmap, validate_detector_name, Baseplate, CalibrationTubeMeta,
    Center, ChannelEntry, Channelmap, Daq, DetectorGeometry, Direction, FiberEnd, FiberGeometry, FiberLocation,
    FiberMeta, HpgeGeometry, HpgeStringMeta, HpgeType, HpgeUnitMeta, Location, Production, SensorLocation,
    SensorSite, SpecialMetadata, System, TpbCoating, TyvekMeta,
};
