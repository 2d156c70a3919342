//! Metadata document types.
//!
//! The special metadata (YAML) carries the per-string, per-detector and
//! per-tube placement parameters; the channelmap (JSON) lists every detector
//! channel with its identity, location and geometry.

use crate::config::{require_non_negative, require_positive};
use crate::error::{GeometryError, Result};
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::marker::PhantomData;
use std::sync::LazyLock;

static REAL_DETECTOR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[VBPC][0-9]{5}[A-Z]$").expect("Invalid detector name regex"));

static DUMMY_DETECTOR_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^DUMMY[0-9]{5}$").expect("Invalid dummy detector name regex"));

/// Check an HPGe detector name against the metadata naming scheme.
///
/// Accepts real detector names such as `V01234A` and the generated dummy
/// names (`DUMMY` followed by the three digit string and two digit position).
pub fn validate_detector_name(name: &str) -> Result<()> {
    if REAL_DETECTOR_NAME.is_match(name) || DUMMY_DETECTOR_NAME.is_match(name) {
        Ok(())
    } else {
        Err(GeometryError::config(format!("'{}' is not a valid HPGe detector name", name)))
    }
}

/// Name of the dummy detector filling a slot of generated metadata
pub fn dummy_detector_name(string: u32, position: u32) -> String {
    format!("DUMMY{:03}{:02}", string, position)
}

/// Name of a SiPM fiber module, e.g. `S0102` for module 2 of string 1
pub fn fiber_name(string: u32, module: u32) -> String {
    format!("S{:02}{:02}", string, module)
}

// ============================================================================
// Map documents
// ============================================================================

/// Entries of a map in document order, repeated keys included.
///
/// `BTreeMap` keeps the last of two equal keys without telling anyone, so
/// the metadata documents are read through this and checked.
#[derive(Debug)]
struct Entries<K, V>(Vec<(K, V)>);

impl<K, V> Default for Entries<K, V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<K: Ord + fmt::Display, V> Entries<K, V> {
    /// Collect into a map, failing on the first repeated key
    fn into_unique(self, kind: &'static str) -> Result<BTreeMap<K, V>> {
        let mut map = BTreeMap::new();
        for (key, value) in self.0 {
            if map.contains_key(&key) {
                return Err(GeometryError::NamingConflict {
                    kind,
                    name: key.to_string(),
                });
            }
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, K: Deserialize<'de>, V: Deserialize<'de>> Deserialize<'de> for Entries<K, V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor<K, V>(PhantomData<(K, V)>);

        impl<'de, K: Deserialize<'de>, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<K, V> {
            type Value = Entries<K, V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

// ============================================================================
// Special metadata
// ============================================================================

/// Placement parameters that are not part of the channelmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpecialMetadataDocument")]
pub struct SpecialMetadata {
    pub hpge_strings: BTreeMap<u32, HpgeStringMeta>,
    pub hpges: BTreeMap<String, HpgeUnitMeta>,
    pub calibration: BTreeMap<u32, CalibrationTubeMeta>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fibers: BTreeMap<String, FiberMeta>,
    pub tyvek: TyvekMeta,
}

/// Special metadata as written, before repeated keys are ruled out
#[derive(Debug, Deserialize)]
pub struct SpecialMetadataDocument {
    #[serde(alias = "hpge_string")]
    hpge_strings: Entries<u32, HpgeStringMeta>,
    #[serde(default)]
    hpges: Entries<String, HpgeUnitMeta>,
    #[serde(default)]
    calibration: Entries<u32, CalibrationTubeMeta>,
    #[serde(default)]
    fibers: Entries<String, FiberMeta>,
    tyvek: TyvekMeta,
}

impl TryFrom<SpecialMetadataDocument> for SpecialMetadata {
    type Error = GeometryError;

    fn try_from(document: SpecialMetadataDocument) -> Result<Self> {
        Ok(Self {
            hpge_strings: document.hpge_strings.into_unique("hpge string")?,
            hpges: document.hpges.into_unique("detector")?,
            calibration: document.calibration.into_unique("calibration tube")?,
            fibers: document.fibers.into_unique("fiber")?,
            tyvek: document.tyvek,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpgeStringMeta {
    pub radius_in_mm: f64,
    pub angle_in_deg: f64,
    pub minishroud_radius_in_mm: f64,
    pub minishroud_delta_length_in_mm: f64,
    /// Distance of the copper support rods from the string axis
    pub rod_radius_in_mm: f64,
    /// Center of the cluster the string belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Center>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub x_in_mm: f64,
    pub y_in_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpgeUnitMeta {
    /// Warm length of the support rod segment of this unit
    pub rodlength_in_mm: f64,
    pub baseplate: Baseplate,
}

/// Size of the PEN baseplate carrying a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseplate {
    Small,
    Medium,
    MediumOrtec,
    Large,
    Xlarge,
    PpcSmall,
}

impl Baseplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::MediumOrtec => "medium_ortec",
            Self::Large => "large",
            Self::Xlarge => "xlarge",
            Self::PpcSmall => "ppc_small",
        }
    }

    /// Outer radius of the plate in mm
    pub fn radius_in_mm(&self) -> f64 {
        match self {
            Self::Small | Self::PpcSmall => 26.5,
            Self::Medium | Self::MediumOrtec => 33.5,
            Self::Large => 42.0,
            Self::Xlarge => 48.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTubeMeta {
    pub radius_in_mm: f64,
    pub angle_in_deg: f64,
    pub tube_radius_in_mm: f64,
    pub length_in_mm: f64,
}

/// One SiPM fiber module hanging next to a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: FiberGeometry,
    pub location: FiberLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiberGeometry {
    pub tpb: TpbCoating,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TpbCoating {
    pub thickness_in_nm: f64,
}

/// Axis of the string the module belongs to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiberLocation {
    pub x: f64,
    pub y: f64,
    /// Module index within the string, counted from 0
    pub module_num: u32,
}

/// Polygonal tyvek foil lining the water tank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyvekMeta {
    pub faces: i64,
    /// Inscribed radius in mm
    pub r: f64,
}

impl SpecialMetadata {
    /// Parse a YAML document; repeated strings, detectors, tubes or fibers
    /// are naming conflicts
    pub fn from_yaml<R: Read>(reader: R) -> Result<Self> {
        let document: SpecialMetadataDocument = serde_yaml::from_reader(reader)?;
        Self::try_from(document)
    }

    pub fn validate(&self) -> Result<()> {
        for (id, string) in &self.hpge_strings {
            if *id == 0 {
                return Err(GeometryError::config("hpge string indices start at 1"));
            }
            let ctx = |field: &str| format!("hpge_strings.{}.{}", id, field);
            require_non_negative(&ctx("radius_in_mm"), string.radius_in_mm)?;
            if !string.angle_in_deg.is_finite() {
                return Err(GeometryError::config(format!("{} is not finite", ctx("angle_in_deg"))));
            }
            require_positive(&ctx("minishroud_radius_in_mm"), string.minishroud_radius_in_mm)?;
            require_non_negative(
                &ctx("minishroud_delta_length_in_mm"),
                string.minishroud_delta_length_in_mm,
            )?;
            require_non_negative(&ctx("rod_radius_in_mm"), string.rod_radius_in_mm)?;
        }

        for (name, unit) in &self.hpges {
            validate_detector_name(name)?;
            require_positive(&format!("hpges.{}.rodlength_in_mm", name), unit.rodlength_in_mm)?;
        }

        for (id, tube) in &self.calibration {
            if *id == 0 {
                return Err(GeometryError::config("calibration tube indices start at 1"));
            }
            let ctx = |field: &str| format!("calibration.{}.{}", id, field);
            require_non_negative(&ctx("radius_in_mm"), tube.radius_in_mm)?;
            require_positive(&ctx("tube_radius_in_mm"), tube.tube_radius_in_mm)?;
            require_positive(&ctx("length_in_mm"), tube.length_in_mm)?;
        }

        for (key, fiber) in &self.fibers {
            if key != &fiber.name {
                return Err(GeometryError::config(format!(
                    "fiber key '{}' does not match the module name '{}'",
                    key, fiber.name
                )));
            }
            require_non_negative(
                &format!("fibers.{}.geometry.tpb.thickness_in_nm", key),
                fiber.geometry.tpb.thickness_in_nm,
            )?;
        }

        if self.tyvek.faces < 3 {
            return Err(GeometryError::config(format!(
                "tyvek.faces must be at least 3, got {}",
                self.tyvek.faces
            )));
        }
        require_positive("tyvek.r", self.tyvek.r)?;
        Ok(())
    }
}

// ============================================================================
// Channelmap
// ============================================================================

/// Detector name -> channel description
pub type Channelmap = BTreeMap<String, ChannelEntry>;

/// Parse a channelmap JSON document.
///
/// A channel listed twice is a naming conflict, a key differing from the
/// entry's name a config error.
pub fn read_channelmap<R: Read>(reader: R) -> Result<Channelmap> {
    let entries: Entries<String, ChannelEntry> = serde_json::from_reader(reader)?;
    let channelmap = entries.into_unique("channel")?;
    for (key, entry) in &channelmap {
        if key != &entry.name {
            return Err(GeometryError::config(format!(
                "channelmap key '{}' does not match the channel name '{}'",
                key, entry.name
            )));
        }
    }
    Ok(channelmap)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum System {
    /// Germanium detectors
    Geds,
    /// SiPMs of the LAr instrumentation
    Spms,
    /// PMTs of the water Cherenkov veto
    Pmts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub name: String,
    pub system: System,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub det_type: Option<String>,
    pub daq: Daq,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<HpgeGeometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<Production>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Daq {
    pub rawid: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    /// Slot of a detector string, position counted from the top
    Slot { string: u32, position: u32 },
    /// End of a SiPM fiber module
    Fiber {
        fiber: String,
        position: FiberEnd,
        barrel: u32,
    },
    Sensor(SensorLocation),
}

/// Which end of a fiber module a SiPM reads out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiberEnd {
    Top,
    Bottom,
}

impl FiberEnd {
    pub const ALL: [FiberEnd; 2] = [Self::Top, Self::Bottom];

    /// Suffix of the channel name
    pub fn suffix(&self) -> char {
        match self {
            Self::Top => 'T',
            Self::Bottom => 'B',
        }
    }
}

/// Location and looking direction of an optical sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorLocation {
    pub name: SensorSite,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorSite {
    Floor,
    Wall,
}

impl SensorSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Wall => "wall",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub nx: f64,
    pub ny: f64,
    pub nz: f64,
}

impl Direction {
    pub fn as_array(&self) -> [f64; 3] {
        [self.nx, self.ny, self.nz]
    }
}

/// Detector crystal type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HpgeType {
    Icpc,
    Bege,
    Ppc,
    Coax,
}

/// Simplified crystal dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HpgeGeometry {
    #[serde(rename = "type")]
    pub kind: HpgeType,
    pub height_in_mm: f64,
    pub radius_in_mm: f64,
}

impl HpgeGeometry {
    pub fn validate(&self, context: &str) -> Result<()> {
        require_positive(&format!("{}.geometry.height_in_mm", context), self.height_in_mm)?;
        require_positive(&format!("{}.geometry.radius_in_mm", context), self.radius_in_mm)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Production {
    #[serde(default)]
    pub enrichment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
}

/// Detector record served by a metadata provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorGeometry {
    pub system: System,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<HpgeGeometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production: Option<Production>,
}
