//! Volume, material and surface names.
//!
//! Every component that mints a name goes through this module. Detector names
//! are passed through verbatim from the metadata; every other name is lower
//! case snake_case. Uniqueness within one build is enforced by
//! [`NameTracker`], of which each registry builder owns one per namespace.

use crate::error::{GeometryError, Result};
use crate::metadata::{Baseplate, SensorSite};
use std::collections::HashSet;
use std::fmt;

/// Segment of a string-level component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Upper,
    Lower,
    Index(u32),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upper => f.write_str("upper"),
            Self::Lower => f.write_str("lower"),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Barrel of the wavelength-shifting reflector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WlsBarrel {
    InnerArgon,
    OuterAtmospheric,
}

impl WlsBarrel {
    pub const ALL: [WlsBarrel; 2] = [Self::InnerArgon, Self::OuterAtmospheric];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InnerArgon => "inner_argon",
            Self::OuterAtmospheric => "outer_atmospheric",
        }
    }
}

/// Layer of a reflector barrel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WlsLayer {
    Tpb,
    Tetratex,
}

impl WlsLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tpb => "tpb",
            Self::Tetratex => "tetratex",
        }
    }
}

/// Front-end hardware below a detector unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readout {
    SignalCable,
    SignalClamp,
    SignalAsic,
    HvCable,
    HvClamp,
}

impl Readout {
    pub const ALL: [Readout; 5] = [
        Self::SignalCable,
        Self::SignalClamp,
        Self::SignalAsic,
        Self::HvCable,
        Self::HvClamp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignalCable => "signal_cable",
            Self::SignalClamp => "signal_clamp",
            Self::SignalAsic => "signal_asic",
            Self::HvCable => "hv_cable",
            Self::HvClamp => "hv_clamp",
        }
    }
}

/// Anything that becomes a placed volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity<'a> {
    World,
    Cavern,
    Tank,
    TankWater,
    TankFlange(u32),
    TyvekFoil,
    OuterCryostat,
    VacuumGap,
    InnerCryostat,
    Lar,
    Moderator,
    TopCopperPlate,
    /// HPGe crystal, named after its metadata entry
    Detector(&'a str),
    PenPlate { detector: &'a str, size: Baseplate },
    StringSupport(u32),
    /// PEN holder at the top of a string, sized after the first baseplate
    Tristar { string: u32, size: Baseplate },
    Readout { detector: &'a str, string: u32, part: Readout },
    Rod { string: u32, segment: Segment },
    Minishroud { string: u32, segment: Segment },
    CalibrationTube(u32),
    Wls { layer: WlsLayer, barrel: WlsBarrel },
    Pmt { site: SensorSite, number: u32 },
    PmtBase(u32),
    PmtVacuum,
    PmtCathode,
}

impl Entity<'_> {
    /// Name of the physical volume
    pub fn physical_name(&self) -> String {
        match self {
            Self::World => "world".to_string(),
            Self::Cavern => "cavern".to_string(),
            Self::Tank => "tank".to_string(),
            Self::TankWater => "tank_water".to_string(),
            Self::TankFlange(n) => format!("tank_flange_{}", n),
            Self::TyvekFoil => "tyvek_foil".to_string(),
            Self::OuterCryostat => "outercryostat".to_string(),
            Self::VacuumGap => "vacuum_gap".to_string(),
            Self::InnerCryostat => "innercryostat".to_string(),
            Self::Lar => "lar".to_string(),
            Self::Moderator => "moderator".to_string(),
            Self::TopCopperPlate => "top_copper_plate".to_string(),
            Self::Detector(name) => (*name).to_string(),
            Self::PenPlate { detector, .. } => format!("pen_{}", detector),
            Self::StringSupport(n) => format!("string_{}", n),
            Self::Tristar { string, size } => format!("tristar_{}_string_{}", size.as_str(), string),
            Self::Readout { detector, string, part } => {
                format!("{}_{}_string_{}", detector, part.as_str(), string)
            }
            Self::Rod { string, segment } => format!("rod_{}_{}", string, segment),
            Self::Minishroud { string, segment } => format!("nms_{}_{}", string, segment),
            Self::CalibrationTube(n) => format!("calibration_tube_{}", n),
            Self::Wls { layer, barrel } => format!("wls_{}_{}", layer.as_str(), barrel.as_str()),
            Self::Pmt { site, number } => format!("pmt_{}_{}", site.as_str(), number),
            Self::PmtBase(n) => format!("pmt_floor_{}_base", n),
            Self::PmtVacuum => "pmt_vacuum".to_string(),
            Self::PmtCathode => "pmt_cathode".to_string(),
        }
    }

    /// Name of the logical volume the placement refers to.
    ///
    /// Entities placed many times with one shape share a logical volume.
    pub fn logical_name(&self) -> String {
        match self {
            Self::TankFlange(_) => "tank_flange".to_string(),
            Self::PenPlate { size, .. } => format!("pen_{}", size.as_str()),
            Self::Tristar { size, .. } => format!("tristar_{}", size.as_str()),
            Self::Readout { detector, part, .. } => format!("{}_{}", detector, part.as_str()),
            Self::Rod { string, .. } => format!("rod_{}", string),
            Self::Wls { .. } => format!("{}_lv", self.physical_name()),
            Self::Pmt { .. } => "pmt_window".to_string(),
            Self::PmtBase(_) => "pmt_base".to_string(),
            other => other.physical_name(),
        }
    }
}

/// Material name of a metal, e.g. `metal_copper`
pub fn metal_material(metal: &str) -> String {
    format!("metal_{}", metal)
}

/// Name of an optical surface property between two media
pub fn surface_property(from: &str, to: &str) -> String {
    format!("surface_{}_to_{}", from, to)
}

/// Name of a border surface instance, e.g. `bsurface_lar_ge_V01234A`
pub fn border_surface(from: &str, to: &str, volume: &str) -> String {
    format!("bsurface_{}_{}_{}", from, to, volume)
}

/// Name of a skin surface instance on a logical volume
pub fn skin_surface(logical: &str) -> String {
    format!("ssurface_{}", logical)
}

/// Channel number of a PMT channel name such as `PMT0101` (-> 101)
pub fn pmt_number(channel: &str) -> Result<u32> {
    channel
        .strip_prefix("PMT")
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| GeometryError::config(format!("'{}' is not a valid PMT channel name", channel)))
}

/// Set of names claimed within one build
#[derive(Debug)]
pub struct NameTracker {
    kind: &'static str,
    claimed: HashSet<String>,
}

impl NameTracker {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            claimed: HashSet::new(),
        }
    }

    /// Claim a name, failing if it was handed out before
    pub fn claim(&mut self, name: &str) -> Result<()> {
        if !self.claimed.insert(name.to_string()) {
            return Err(GeometryError::NamingConflict {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.claimed.contains(name)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}
