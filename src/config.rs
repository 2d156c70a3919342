use crate::detail::DetailTable;
use crate::error::{GeometryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default base configuration shipped with the crate
pub const DEFAULT_BASE_CONFIG: &str = include_str!("../configs/l1000_config.json");

/// Base geometry configuration.
///
/// Parsed from a JSON document with the top-level keys `string`, `detail`,
/// `pmts_pos` and `dummy_dets`. Immutable once loaded and validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseConfig {
    pub string: StringConfig,
    pub detail: DetailTable,
    pub pmts_pos: PmtPositions,
    pub dummy_dets: DummyDetectors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationLayout>,
}

/// Layout of the HPGe detector strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringConfig {
    pub units: UnitsConfig,
    pub copper_rods: CopperRodsConfig,
    #[serde(default)]
    pub minishroud: MinishroudConfig,
}

/// Detector units per string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitsConfig {
    /// Number of units per string
    pub n: i64,
    /// Warm vertical spacing of the units (support rod length) in mm
    pub l: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopperRodsConfig {
    /// Radius of one copper rod in mm
    pub r: f64,
    /// Distance of the rods from the string axis in mm
    pub r_offset_from_center: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinishroudConfig {
    pub r: f64,
    pub delta_length: f64,
}

impl Default for MinishroudConfig {
    fn default() -> Self {
        Self {
            r: 105.0,
            delta_length: 40.0,
        }
    }
}

/// PMT rows in the water tank and the tyvek foil they sit on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmtPositions {
    #[serde(default)]
    pub floor: BTreeMap<String, FloorRow>,
    #[serde(default)]
    pub wall: BTreeMap<String, WallRow>,
    pub tyvek: TyvekConfig,
}

/// Ring of PMTs on the tank floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorRow {
    pub id: u32,
    pub n: i64,
    pub r: f64,
}

/// Ring of PMTs on the tank wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallRow {
    pub id: u32,
    pub n: i64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyvekConfig {
    pub faces: i64,
    pub r: f64,
}

/// Templates for the detectors of generated metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyDetectors {
    pub hpge: DetectorTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spms: Option<DetectorTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmts: Option<DetectorTemplate>,
}

/// Detector description without identity or location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorTemplate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub det_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<crate::metadata::HpgeGeometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<crate::metadata::Production>,
}

/// Evenly spaced calibration tubes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationLayout {
    pub n: i64,
    pub r: f64,
    pub tube_radius: f64,
    pub length: f64,
}

/// Partial base config whose present sections replace those of the base.
///
/// Replacement happens at fixed keys only: `string.units`,
/// `string.copper_rods`, `string.minishroud`, `detail.<level>`,
/// `pmts_pos.<floor|wall|tyvek>`, `dummy_dets.<kind>` and `calibration`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverride {
    #[serde(default)]
    pub string: Option<StringOverride>,
    #[serde(default)]
    pub detail: Option<DetailTable>,
    #[serde(default)]
    pub pmts_pos: Option<PmtPositionsOverride>,
    #[serde(default)]
    pub dummy_dets: Option<DummyDetectorsOverride>,
    #[serde(default)]
    pub calibration: Option<CalibrationLayout>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StringOverride {
    pub units: Option<UnitsConfig>,
    pub copper_rods: Option<CopperRodsConfig>,
    pub minishroud: Option<MinishroudConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PmtPositionsOverride {
    pub floor: Option<BTreeMap<String, FloorRow>>,
    pub wall: Option<BTreeMap<String, WallRow>>,
    pub tyvek: Option<TyvekConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DummyDetectorsOverride {
    pub hpge: Option<DetectorTemplate>,
    pub spms: Option<DetectorTemplate>,
    pub pmts: Option<DetectorTemplate>,
}

impl BaseConfig {
    /// Parse the configuration embedded in the crate
    pub fn embedded() -> Result<Self> {
        let config: BaseConfig = serde_json::from_str(DEFAULT_BASE_CONFIG)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply an override document, replacing whole sections at the documented keys
    pub fn merge(mut self, overrides: ConfigOverride) -> Self {
        if let Some(string) = overrides.string {
            if let Some(units) = string.units {
                self.string.units = units;
            }
            if let Some(rods) = string.copper_rods {
                self.string.copper_rods = rods;
            }
            if let Some(minishroud) = string.minishroud {
                self.string.minishroud = minishroud;
            }
        }
        if let Some(detail) = overrides.detail {
            for (level, entries) in detail {
                self.detail.insert(level, entries);
            }
        }
        if let Some(pmts) = overrides.pmts_pos {
            if let Some(floor) = pmts.floor {
                self.pmts_pos.floor = floor;
            }
            if let Some(wall) = pmts.wall {
                self.pmts_pos.wall = wall;
            }
            if let Some(tyvek) = pmts.tyvek {
                self.pmts_pos.tyvek = tyvek;
            }
        }
        if let Some(dummies) = overrides.dummy_dets {
            if let Some(hpge) = dummies.hpge {
                self.dummy_dets.hpge = hpge;
            }
            if dummies.spms.is_some() {
                self.dummy_dets.spms = dummies.spms;
            }
            if dummies.pmts.is_some() {
                self.dummy_dets.pmts = dummies.pmts;
            }
        }
        if overrides.calibration.is_some() {
            self.calibration = overrides.calibration;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let units = &self.string.units;
        require_count("string.units.n", units.n)?;
        require_positive("string.units.l", units.l)?;
        require_positive("string.copper_rods.r", self.string.copper_rods.r)?;
        require_non_negative(
            "string.copper_rods.r_offset_from_center",
            self.string.copper_rods.r_offset_from_center,
        )?;
        require_positive("string.minishroud.r", self.string.minishroud.r)?;
        require_non_negative("string.minishroud.delta_length", self.string.minishroud.delta_length)?;

        if self.detail.is_empty() {
            return Err(GeometryError::config("detail table is empty"));
        }

        for (key, row) in &self.pmts_pos.floor {
            require_count(&format!("pmts_pos.floor.{}.n", key), row.n)?;
            require_non_negative(&format!("pmts_pos.floor.{}.r", key), row.r)?;
        }
        for (key, row) in &self.pmts_pos.wall {
            require_count(&format!("pmts_pos.wall.{}.n", key), row.n)?;
        }
        let tyvek = &self.pmts_pos.tyvek;
        if tyvek.faces < 3 {
            return Err(GeometryError::config(format!(
                "pmts_pos.tyvek.faces must be at least 3, got {}",
                tyvek.faces
            )));
        }
        require_positive("pmts_pos.tyvek.r", tyvek.r)?;

        if let Some(geometry) = &self.dummy_dets.hpge.geometry {
            geometry.validate("dummy_dets.hpge")?;
        } else {
            return Err(GeometryError::config("dummy_dets.hpge needs a geometry"));
        }

        if let Some(calibration) = &self.calibration {
            require_count("calibration.n", calibration.n)?;
            require_non_negative("calibration.r", calibration.r)?;
            require_positive("calibration.tube_radius", calibration.tube_radius)?;
            require_positive("calibration.length", calibration.length)?;
        }

        Ok(())
    }
}

pub(crate) fn require_positive(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(GeometryError::config(format!("{} must be positive, got {}", field, value)));
    }
    Ok(())
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(GeometryError::config(format!(
            "{} must not be negative, got {}",
            field, value
        )));
    }
    Ok(())
}

pub(crate) fn require_count(field: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| GeometryError::config(format!("{} must not be negative, got {}", field, value)))
}
