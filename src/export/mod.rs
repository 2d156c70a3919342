//! Consumers of a finished [`VolumeRegistry`](crate::geometry::VolumeRegistry).
//!
//! The GDML writer and the macro writers produce the files the simulation
//! reads; the overlap check and the scene handoff are diagnostics.

pub mod gdml;
pub mod macros;
pub mod overlaps;
pub mod scene;

pub use gdml::{to_gdml, write_gdml};
pub use macros::{detector_macro, vis_macro, write_detector_macro, write_vis_macro};
pub use overlaps::{check_overlaps, find_overlaps, Overlap};
pub use scene::{visualize, Scene};
