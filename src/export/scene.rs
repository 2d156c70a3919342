//! Scene files for the external viewer.
//!
//! No viewer is built in. A scene file is read, its color overrides are
//! applied to the visible logical volumes and the result is handed off as a
//! JSON document that an external viewer can pick up next to the GDML file.

use crate::error::{GeometryError, Result};
use crate::geometry::{Rgba, VisAttributes, VolumeRegistry};
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Camera placement of the initial view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub focus: [f64; 3],
    pub up: [f64; 3],
    pub camera: [f64; 3],
    #[serde(default)]
    pub parallel: bool,
}

/// Clipping plane through `origin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clipper {
    pub origin: [f64; 3],
    pub normal: [f64; 3],
    #[serde(default = "default_close_cuts")]
    pub close_cuts: bool,
}

fn default_close_cuts() -> bool {
    true
}

/// Viewer scene description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub camera: Option<Camera>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clipper: Vec<Clipper>,
    /// Logical volume name pattern -> `[r, g, b]` or `[r, g, b, a]`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub color_overrides: BTreeMap<String, Vec<f64>>,
    pub fine_mesh: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<[u32; 2]>,
    /// Write the handoff document here instead of only logging it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_and_exit: Option<PathBuf>,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading scene from: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| GeometryError::io(path, e))?;
        let scene: Scene = serde_json::from_str(&content)?;
        scene.color_rules()?;
        Ok(scene)
    }

    /// Compiled color overrides, anchored to match whole volume names
    fn color_rules(&self) -> Result<Vec<(Regex, Rgba)>> {
        self.color_overrides
            .iter()
            .map(|(pattern, color)| {
                let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
                    GeometryError::config(format!("scene color pattern '{}' is invalid: {}", pattern, e))
                })?;
                let rgba = match color.as_slice() {
                    [r, g, b] => [*r, *g, *b, 1.0],
                    [r, g, b, a] => [*r, *g, *b, *a],
                    _ => {
                        return Err(GeometryError::config(format!(
                            "scene color for '{}' needs 3 or 4 components, got {}",
                            pattern,
                            color.len()
                        )))
                    }
                };
                Ok((regex, rgba))
            })
            .collect()
    }
}

/// Visible logical volume with its effective color
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleVolume {
    pub logical: String,
    pub material: String,
    pub color: Option<Rgba>,
}

/// Document handed to the external viewer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerHandoff<'a> {
    pub world: &'a str,
    pub volumes: Vec<VisibleVolume>,
    pub scene: &'a Scene,
}

/// Apply the scene to the registry. The first matching override wins.
pub fn handoff<'a>(registry: &'a VolumeRegistry, scene: &'a Scene) -> Result<ViewerHandoff<'a>> {
    let rules = scene.color_rules()?;
    let volumes = registry
        .logical_volumes()
        .filter(|lv| lv.vis != Some(VisAttributes::Hidden))
        .map(|lv| {
            let color = rules
                .iter()
                .find(|(regex, _)| regex.is_match(&lv.name))
                .map(|(_, color)| *color)
                .or(match lv.vis {
                    Some(VisAttributes::Color(color)) => Some(color),
                    _ => None,
                });
            VisibleVolume {
                logical: lv.name.clone(),
                material: lv.material.clone(),
                color,
            }
        })
        .collect();
    Ok(ViewerHandoff {
        world: registry.world_name(),
        volumes,
        scene,
    })
}

/// Prepare the geometry for viewing
pub fn visualize(registry: &VolumeRegistry, scene: &Scene) -> Result<()> {
    let handoff = handoff(registry, scene)?;
    debug!("{} visible logical volumes", handoff.volumes.len());
    match &scene.export_and_exit {
        Some(path) => {
            let json = serde_json::to_string_pretty(&handoff)?;
            std::fs::write(path, json).map_err(|e| GeometryError::io(path, e))?;
            info!("Wrote viewer scene to: {:?}", path);
        }
        None => {
            warn!("No built-in viewer available; open the exported GDML file in an external viewer");
        }
    }
    Ok(())
}
