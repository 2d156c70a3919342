//! Geant4 macro writers.
//!
//! The detector macro registers every sensitive placement with remage, the
//! visualization macro carries the colors and visibility of the logical
//! volumes.

use crate::error::{GeometryError, Result};
use crate::geometry::{VisAttributes, VolumeRegistry};
use log::info;
use std::path::Path;

/// remage commands registering the sensitive detectors, in construction order
pub fn detector_macro(registry: &VolumeRegistry) -> String {
    let mut out = String::new();
    for (node, detector) in registry.detectors() {
        out.push_str(&format!(
            "/RMG/Geometry/RegisterDetector {} {} {}\n",
            detector.kind.as_str(),
            node.name,
            detector.uid
        ));
    }
    out
}

/// Visualization commands for every logical volume with attributes
pub fn vis_macro(registry: &VolumeRegistry) -> String {
    let mut out = String::new();
    for lv in registry.logical_volumes() {
        match lv.vis {
            Some(VisAttributes::Color([r, g, b, a])) => {
                out.push_str(&format!(
                    "/vis/geometry/set/colour {} 0 {} {} {} {}\n",
                    lv.name, r, g, b, a
                ));
            }
            Some(VisAttributes::Hidden) => {
                out.push_str(&format!("/vis/geometry/set/visibility {} 0 false\n", lv.name));
            }
            None => {}
        }
    }
    out
}

fn write(path: &Path, content: String, what: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| GeometryError::io(path, e))?;
    info!("Wrote {} macro to: {:?}", what, path);
    Ok(())
}

pub fn write_detector_macro(registry: &VolumeRegistry, path: &Path) -> Result<()> {
    write(path, detector_macro(registry), "detector")
}

pub fn write_vis_macro(registry: &VolumeRegistry, path: &Path) -> Result<()> {
    write(path, vis_macro(registry), "visualization")
}
