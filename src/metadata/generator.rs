//! Synthesis of channelmap and special metadata.
//!
//! The generated array has 7 clusters of 6 strings. Every string slot holds
//! either the dummy HPGe template of the base config or, when an override is
//! requested, the geometry of one real detector served by a
//! [`DetectorProvider`]. Every string also gets three SiPM fiber modules read
//! out at both ends. PMT channels are laid out from the `pmts_pos` rows.

use super::provider::DetectorProvider;
use super::types::{
    dummy_detector_name, fiber_name, validate_detector_name, Baseplate, CalibrationTubeMeta, Center,
    ChannelEntry, Channelmap, Daq, Direction, FiberEnd, FiberGeometry, FiberLocation, FiberMeta, HpgeGeometry,
    HpgeStringMeta, HpgeUnitMeta, Location, Production, SensorLocation, SensorSite, SpecialMetadata, System,
    TpbCoating, TyvekMeta,
};
use crate::config::{require_count, BaseConfig, DetectorTemplate, TyvekConfig, WallRow};
use crate::error::{GeometryError, Result};
use crate::placement::polar_to_cartesian;
use log::{debug, info};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::path::Path;

/// Cluster centers of the HPGe array
pub const CLUSTER_CENTERS: [[f64; 2]; 7] = [
    [0.0, 0.0],
    [550.0, 190.5],
    [110.0, 571.6],
    [-440.0, 381.1],
    [-550.0, -190.5],
    [-110.0, -571.6],
    [440.0, -381.1],
];

/// Angular positions of the strings around their cluster center
pub const STRING_ANGLES_IN_DEG: [f64; 6] = [0.0, 60.0, 120.0, 180.0, 240.0, 300.0];

/// Distance of the strings from their cluster center
pub const CLUSTER_RADIUS_IN_MM: f64 = 220.0;

/// Raw id of the first PMT channel
pub const FIRST_PMT_RAWID: u32 = 10000;

/// Raw id of the first SiPM channel
pub const FIRST_SPM_RAWID: u32 = 5000;

/// SiPM fiber modules next to each string
pub const FIBERS_PER_STRING: u32 = 3;

const FIBER_TPB_THICKNESS_IN_NM: f64 = 1093.0;

/// HPGe raw ids are `string * 100 + position`
const MAX_UNITS_PER_STRING: usize = 99;

/// Request to substitute every HPGe slot with one real detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorOverride {
    pub hpge: String,
}

impl DetectorOverride {
    /// Parse a request such as `{'hpge': 'V01234A'}`; single quotes are accepted
    pub fn parse(request: &str) -> Result<Self> {
        let json = request.replace('\'', "\"");
        let map: BTreeMap<String, Value> = serde_json::from_str(&json).map_err(|e| {
            GeometryError::config(format!("detector override '{}' is not a JSON map: {}", request, e))
        })?;
        Self::from_map(&map)
    }

    pub fn from_map(map: &BTreeMap<String, Value>) -> Result<Self> {
        if map.is_empty() {
            return Err(GeometryError::config("detector override names no detector"));
        }
        if let Some(kind) = map.keys().find(|k| k.as_str() != "hpge") {
            return Err(GeometryError::unsupported(format!(
                "only HPGe detectors can be substituted, not '{}'",
                kind
            )));
        }

        let name = match &map["hpge"] {
            Value::String(name) => name.clone(),
            Value::Array(names) => {
                let distinct = names
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            GeometryError::config(format!("detector override entry {} is not a name", v))
                        })
                    })
                    .collect::<Result<BTreeSet<_>>>()?;
                let mut iter = distinct.into_iter();
                match (iter.next(), iter.next()) {
                    (Some(name), None) => name,
                    (None, _) => return Err(GeometryError::config("detector override names no detector")),
                    (Some(_), Some(_)) => {
                        return Err(GeometryError::unsupported(
                            "all HPGe slots must use a single substituted geometry",
                        ))
                    }
                }
            }
            Value::Object(_) => {
                return Err(GeometryError::unsupported(
                    "per-detector overrides are not supported, give a single HPGe name",
                ))
            }
            other => {
                return Err(GeometryError::config(format!(
                    "detector override value {} is not a detector name",
                    other
                )))
            }
        };

        validate_detector_name(&name)?;
        Ok(Self { hpge: name })
    }
}

/// Output of the generator
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMetadata {
    pub channelmap: Channelmap,
    pub special_metadata: SpecialMetadata,
}

impl GeneratedMetadata {
    /// Write the special metadata as YAML and the channelmap as JSON
    pub fn write(&self, special_metadata_path: &Path, channelmap_path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.special_metadata)?;
        std::fs::write(special_metadata_path, yaml).map_err(|e| GeometryError::io(special_metadata_path, e))?;
        info!("Wrote special metadata to {:?}", special_metadata_path);

        let json = serde_json::to_string_pretty(&self.channelmap)?;
        std::fs::write(channelmap_path, json).map_err(|e| GeometryError::io(channelmap_path, e))?;
        info!("Wrote channelmap with {} channels to {:?}", self.channelmap.len(), channelmap_path);
        Ok(())
    }
}

/// HPGe description copied into every slot
struct HpgeTemplate {
    det_type: Option<String>,
    geometry: HpgeGeometry,
    production: Option<Production>,
}

impl HpgeTemplate {
    fn from_config(template: &DetectorTemplate) -> Result<Self> {
        let geometry = template
            .geometry
            .clone()
            .ok_or_else(|| GeometryError::config("dummy_dets.hpge needs a geometry"))?;
        Ok(Self {
            det_type: template.det_type.clone(),
            geometry,
            production: template.production.clone(),
        })
    }

    fn from_provider(provider: &dyn DetectorProvider, name: &str) -> Result<Self> {
        let record = provider.lookup_detector(name)?;
        if record.system != System::Geds {
            return Err(GeometryError::unsupported(format!(
                "'{}' is not an HPGe detector and cannot be substituted",
                name
            )));
        }
        let geometry = record
            .geometry
            .ok_or_else(|| GeometryError::config(format!("detector '{}' has no geometry in metadata", name)))?;
        geometry.validate(name)?;
        Ok(Self {
            det_type: Some(format!("{:?}", geometry.kind).to_lowercase()),
            geometry,
            production: record.production,
        })
    }
}

/// Synthesize channelmap and special metadata from the base config.
///
/// Without `request` every slot gets the `dummy_dets.hpge` template. With a
/// request, every slot gets the geometry the provider returns for the one
/// requested detector.
pub fn generate(
    config: &BaseConfig,
    provider: Option<&dyn DetectorProvider>,
    request: Option<&DetectorOverride>,
) -> Result<GeneratedMetadata> {
    let units = require_count("string.units.n", config.string.units.n)?;
    if units > MAX_UNITS_PER_STRING {
        return Err(GeometryError::config(format!(
            "string.units.n must be at most {}, got {}",
            MAX_UNITS_PER_STRING, units
        )));
    }

    let template = match request {
        Some(request) => {
            let provider = provider.ok_or_else(|| {
                GeometryError::config(format!(
                    "substituting '{}' requires a detector metadata source",
                    request.hpge
                ))
            })?;
            info!("Using the geometry of {} for every HPGe slot", request.hpge);
            HpgeTemplate::from_provider(provider, &request.hpge)?
        }
        None => HpgeTemplate::from_config(&config.dummy_dets.hpge)?,
    };

    let spm_type = config
        .dummy_dets
        .spms
        .as_ref()
        .and_then(|t| t.det_type.clone())
        .or_else(|| Some("sipm".to_string()));

    let mut channelmap = Channelmap::new();
    let mut hpge_strings = BTreeMap::new();
    let mut hpges = BTreeMap::new();
    let mut fibers = BTreeMap::new();
    let mut spm_rawid = FIRST_SPM_RAWID;

    for (cluster, center) in CLUSTER_CENTERS.iter().enumerate() {
        for (slot, angle) in STRING_ANGLES_IN_DEG.iter().enumerate() {
            let string = (cluster * STRING_ANGLES_IN_DEG.len() + slot + 1) as u32;
            let [dx, dy] = polar_to_cartesian(CLUSTER_RADIUS_IN_MM, *angle);
            hpge_strings.insert(
                string,
                HpgeStringMeta {
                    radius_in_mm: CLUSTER_RADIUS_IN_MM,
                    angle_in_deg: *angle,
                    minishroud_radius_in_mm: config.string.minishroud.r,
                    minishroud_delta_length_in_mm: config.string.minishroud.delta_length,
                    rod_radius_in_mm: config.string.copper_rods.r_offset_from_center,
                    center: Some(Center {
                        x_in_mm: center[0],
                        y_in_mm: center[1],
                    }),
                },
            );

            for position in 1..=units as u32 {
                let name = dummy_detector_name(string, position);
                hpges.insert(
                    name.clone(),
                    HpgeUnitMeta {
                        rodlength_in_mm: config.string.units.l,
                        baseplate: Baseplate::Xlarge,
                    },
                );
                insert_channel(
                    &mut channelmap,
                    ChannelEntry {
                        name,
                        system: System::Geds,
                        det_type: template.det_type.clone(),
                        daq: Daq {
                            rawid: string * 100 + position,
                        },
                        location: Location::Slot { string, position },
                        geometry: Some(template.geometry.clone()),
                        production: template.production.clone(),
                    },
                )?;
            }

            for module in 1..=FIBERS_PER_STRING {
                let name = fiber_name(string, module);
                fibers.insert(
                    name.clone(),
                    FiberMeta {
                        name,
                        kind: "single_string".to_string(),
                        geometry: FiberGeometry {
                            tpb: TpbCoating {
                                thickness_in_nm: FIBER_TPB_THICKNESS_IN_NM,
                            },
                        },
                        location: FiberLocation {
                            x: center[0] + dx,
                            y: center[1] + dy,
                            module_num: module - 1,
                        },
                    },
                );
            }
            // all top ends of a string, then all bottom ends
            for end in FiberEnd::ALL {
                for module in 1..=FIBERS_PER_STRING {
                    let fiber = fiber_name(string, module);
                    insert_channel(
                        &mut channelmap,
                        ChannelEntry {
                            name: format!("{}{}", fiber, end.suffix()),
                            system: System::Spms,
                            det_type: spm_type.clone(),
                            daq: Daq { rawid: spm_rawid },
                            location: Location::Fiber {
                                fiber,
                                position: end,
                                barrel: string,
                            },
                            geometry: None,
                            production: None,
                        },
                    )?;
                    spm_rawid += 1;
                }
            }
        }
    }
    debug!(
        "Generated {} HPGe strings with {} units and {} fiber modules each",
        hpge_strings.len(),
        units,
        FIBERS_PER_STRING
    );

    let pmt_type = config
        .dummy_dets
        .pmts
        .as_ref()
        .and_then(|t| t.det_type.clone())
        .or_else(|| Some("pmt".to_string()));
    let mut rawid = FIRST_PMT_RAWID;
    for pmt in pmt_locations(config)? {
        insert_channel(
            &mut channelmap,
            ChannelEntry {
                name: pmt.name,
                system: System::Pmts,
                det_type: pmt_type.clone(),
                daq: Daq { rawid },
                location: Location::Sensor(pmt.location),
                geometry: None,
                production: None,
            },
        )?;
        rawid += 1;
    }

    let calibration = match &config.calibration {
        Some(layout) => {
            let n = require_count("calibration.n", layout.n)?;
            (0..n)
                .map(|i| {
                    (
                        i as u32 + 1,
                        CalibrationTubeMeta {
                            radius_in_mm: layout.r,
                            angle_in_deg: 360.0 * i as f64 / n as f64,
                            tube_radius_in_mm: layout.tube_radius,
                            length_in_mm: layout.length,
                        },
                    )
                })
                .collect()
        }
        None => BTreeMap::new(),
    };

    let special_metadata = SpecialMetadata {
        hpge_strings,
        hpges,
        calibration,
        fibers,
        tyvek: TyvekMeta {
            faces: config.pmts_pos.tyvek.faces,
            r: config.pmts_pos.tyvek.r,
        },
    };
    special_metadata.validate()?;

    info!(
        "Generated metadata: {} channels, {} strings, {} calibration tubes",
        channelmap.len(),
        special_metadata.hpge_strings.len(),
        special_metadata.calibration.len()
    );
    Ok(GeneratedMetadata {
        channelmap,
        special_metadata,
    })
}

fn insert_channel(channelmap: &mut Channelmap, entry: ChannelEntry) -> Result<()> {
    if channelmap.contains_key(&entry.name) {
        return Err(GeometryError::NamingConflict {
            kind: "channel",
            name: entry.name,
        });
    }
    channelmap.insert(entry.name.clone(), entry);
    Ok(())
}

struct PmtLocation {
    name: String,
    location: SensorLocation,
}

/// Floor rows first, then wall rows, each in row key order
fn pmt_locations(config: &BaseConfig) -> Result<Vec<PmtLocation>> {
    let mut pmts = Vec::new();

    for row in config.pmts_pos.floor.values() {
        let n = require_count("pmts_pos.floor.n", row.n)?;
        for i in 0..n {
            let [x, y] = polar_to_cartesian(row.r, 360.0 / n as f64 * i as f64);
            pmts.push(PmtLocation {
                name: format!("PMT0{}{:02}", row.id, i + 1),
                location: SensorLocation {
                    name: SensorSite::Floor,
                    x,
                    y,
                    z: 0.0,
                    direction: Direction {
                        nx: 0.0,
                        ny: 0.0,
                        nz: 1.0,
                    },
                },
            });
        }
    }

    for row in config.pmts_pos.wall.values() {
        pmts.extend(wall_row(row, &config.pmts_pos.tyvek)?);
    }
    Ok(pmts)
}

/// Spread one wall row over the faces of the tyvek polygon.
///
/// Every face gets `n / faces` PMTs; the remaining ones go to evenly spaced
/// faces, shifted by the row id so consecutive rows do not stack up. PMTs sit
/// on the face plane, evenly spaced along the face, looking inward.
fn wall_row(row: &WallRow, tyvek: &TyvekConfig) -> Result<Vec<PmtLocation>> {
    let n = require_count("pmts_pos.wall.n", row.n)?;
    let faces = require_count("pmts_pos.tyvek.faces", tyvek.faces)?;
    if faces < 3 {
        return Err(GeometryError::config("the tyvek polygon needs at least 3 faces"));
    }

    // the polygon radius in the config is the inscribed one
    let circumradius = tyvek.r / (PI / faces as f64).cos();
    let vertex = |i: usize| {
        let phi = 2.0 * PI * (i % faces) as f64 / faces as f64;
        [circumradius * phi.cos(), circumradius * phi.sin()]
    };

    let base = n / faces;
    let extra = n % faces;
    let extra_on = |face: usize| (face + 1) * extra / faces > face * extra / faces;

    let mut pmts = Vec::with_capacity(n);
    for i in 0..faces {
        let on_face = base + usize::from(extra_on((i + row.id as usize) % faces));
        let [x1, y1] = vertex(i);
        let [x2, y2] = vertex(i + 1);
        let mid_phi = 2.0 * PI * (i as f64 + 0.5) / faces as f64;

        for j in 0..on_face {
            let t = (j + 1) as f64 / (on_face + 1) as f64;
            pmts.push(PmtLocation {
                name: format!("PMT{}{:02}", row.id + 10, pmts.len() + 1),
                location: SensorLocation {
                    name: SensorSite::Wall,
                    x: x1 * (1.0 - t) + x2 * t,
                    y: y1 * (1.0 - t) + y2 * t,
                    z: row.z,
                    direction: Direction {
                        nx: -mid_phi.cos(),
                        ny: -mid_phi.sin(),
                        nz: 0.0,
                    },
                },
            });
        }
    }

    if pmts.len() != n {
        return Err(GeometryError::construction(format!(
            "wall row {} placed {} of {} PMTs",
            row.id,
            pmts.len(),
            n
        )));
    }
    Ok(pmts)
}
