//! Instrumentation of the water tank: the tyvek foil and the PMTs.
//!
//! PMT positions and looking directions come from the channelmap. The window
//! is the top cap of an ellipsoid; vacuum and cathode are placed once inside
//! the shared window volume, so every window placement carries them along.
//! Floor PMTs stand on an epoxy base, wall PMTs hang on the foil.

use super::watertank::{
    BASE_HEIGHT, BASE_RADIUS, BULGE_WIDTH, HORIZONTAL_WALL, PIT_HEIGHT, TOP_HEIGHT, VERTICAL_WALL,
};
use crate::error::{GeometryError, Result};
use crate::geometry::{ActiveDetector, DetectorKind, RegistryBuilder, Shape, Transform};
use crate::metadata::{ChannelEntry, Channelmap, Location, SensorLocation, SensorSite, SpecialMetadata, System};
use crate::naming::{pmt_number, Entity};
use crate::placement::rotation_towards;
use log::{debug, info};
use std::f64::consts::PI;

/// Semi-axis of the window ellipsoid
const PMT_RADIUS: f64 = 131.0;
/// The window starts this far above the ellipsoid center
const PMT_CUTOFF: f64 = 41.0;
const VACUUM_RADIUS: f64 = 128.0;
const VACUUM_HEIGHT: f64 = PMT_RADIUS - 2.0;
const CATHODE_CUTOFF: f64 = 65.0;
const ELLIPSOID_TOP: f64 = 200.0;
const PMT_BASE_HEIGHT: f64 = 145.0;

const FOIL_THICKNESS: f64 = 3.0;
const FOIL_INNER_RADIUS: f64 = 5_000.0;

/// Bottom of the foil, above the pit rim
pub const FOIL_BOTTOM: f64 = PIT_HEIGHT + 2.0 * HORIZONTAL_WALL;

/// Top of the foil: the water roof height at the foil radius, less a margin
/// of two wall thicknesses
pub fn foil_top() -> f64 {
    let outside = BASE_RADIUS - VERTICAL_WALL - FOIL_INNER_RADIUS;
    let cone_width = BASE_RADIUS - HORIZONTAL_WALL - BULGE_WIDTH / 2.0;
    BASE_HEIGHT - 2.0 * HORIZONTAL_WALL + outside * (TOP_HEIGHT - BASE_HEIGHT) / cone_width
}

pub fn build(builder: &mut RegistryBuilder, special: &SpecialMetadata, channelmap: &Channelmap) -> Result<()> {
    let water = Entity::TankWater.logical_name();

    let tyvek = &special.tyvek;
    let faces = u32::try_from(tyvek.faces)
        .map_err(|_| GeometryError::config(format!("tyvek.faces must be positive, got {}", tyvek.faces)))?;
    let top = foil_top();
    let foil = Shape::Polyhedra {
        sphi: 0.0,
        dphi: 2.0 * PI,
        num_side: faces,
        z: vec![0.0, top - FOIL_BOTTOM],
        rmin: vec![tyvek.r, tyvek.r],
        rmax: vec![tyvek.r + FOIL_THICKNESS, tyvek.r + FOIL_THICKNESS],
    };
    let foil_lv = Entity::TyvekFoil.logical_name();
    super::add_colored(builder, &foil_lv, foil, "tyvek", [0.0, 0.0, 0.0, 0.2])?;
    builder.place(
        &Entity::TyvekFoil.physical_name(),
        &foil_lv,
        &water,
        Transform::translation(0.0, 0.0, FOIL_BOTTOM),
    )?;

    let window_lv = define_pmt(builder)?;
    let base_lv = Entity::PmtBase(0).logical_name();
    super::add_colored(builder, &base_lv, pmt_base(), "epoxy", [0.0, 0.0, 0.0, 1.0])?;

    let mut placed = 0;
    for channel in channelmap.values().filter(|c| c.system == System::Pmts) {
        let location = match &channel.location {
            Location::Sensor(location) => location,
            _ => {
                return Err(GeometryError::config(format!(
                    "PMT '{}' has no sensor location",
                    channel.name
                )))
            }
        };
        place_pmt(builder, channel, location, &window_lv, &base_lv, &water)?;
        placed += 1;
    }
    info!("Placed {} PMTs in the water tank", placed);
    Ok(())
}

/// Window, vacuum and cathode; returns the window logical volume
fn define_pmt(builder: &mut RegistryBuilder) -> Result<String> {
    let ellipsoid = |ax: f64, cz: f64, zcut1: f64| Shape::Ellipsoid {
        ax,
        by: ax,
        cz,
        zcut1,
        zcut2: ELLIPSOID_TOP,
    };

    let window = Entity::Pmt {
        site: SensorSite::Floor,
        number: 0,
    }
    .logical_name();
    super::add_colored(
        builder,
        &window,
        ellipsoid(PMT_RADIUS, PMT_RADIUS, PMT_CUTOFF),
        "borosilicate",
        [0.9, 0.8, 0.5, 0.5],
    )?;

    let vacuum = Entity::PmtVacuum.logical_name();
    builder.add_logical(&vacuum, ellipsoid(VACUUM_RADIUS, VACUUM_HEIGHT, PMT_CUTOFF), "vacuum")?;
    builder.place(&Entity::PmtVacuum.physical_name(), &vacuum, &window, Transform::default())?;

    let cathode = Entity::PmtCathode.logical_name();
    super::add_colored(
        builder,
        &cathode,
        ellipsoid(VACUUM_RADIUS, VACUUM_HEIGHT, CATHODE_CUTOFF),
        "vacuum",
        [0.545, 0.271, 0.074, 1.0],
    )?;
    builder.place(&Entity::PmtCathode.physical_name(), &cathode, &vacuum, Transform::default())?;

    Ok(window)
}

fn pmt_base() -> Shape {
    Shape::GenericPolycone {
        sphi: 0.0,
        dphi: 2.0 * PI,
        r: vec![0.0, 42.25, 42.25, 52.25, 102.75, 125.0, 0.0],
        z: vec![0.0, 0.0, 72.0, 82.0, 110.0, PMT_BASE_HEIGHT, PMT_BASE_HEIGHT],
    }
}

fn place_pmt(
    builder: &mut RegistryBuilder,
    channel: &ChannelEntry,
    location: &SensorLocation,
    window_lv: &str,
    base_lv: &str,
    water: &str,
) -> Result<()> {
    let number = pmt_number(&channel.name)?;
    let direction = location.direction.as_array();
    let rotation = rotation_towards(direction)?;
    let entity = Entity::Pmt {
        site: location.name,
        number,
    };

    let window_position = match location.name {
        SensorSite::Floor => {
            let base_z = location.z + HORIZONTAL_WALL;
            builder.place(
                &Entity::PmtBase(number).physical_name(),
                base_lv,
                water,
                Transform::new(rotation, [location.x, location.y, base_z]),
            )?;
            // the window cut rests on the top of the base
            [location.x, location.y, base_z + PMT_BASE_HEIGHT - PMT_CUTOFF]
        }
        SensorSite::Wall => [
            location.x + PMT_CUTOFF * direction[0],
            location.y + PMT_CUTOFF * direction[1],
            location.z + PMT_CUTOFF * direction[2],
        ],
    };

    let name = entity.physical_name();
    debug!("PMT {} -> {} at {:?}", channel.name, name, window_position);
    builder.place(&name, window_lv, water, Transform::new(rotation, window_position))?;
    builder.register_detector(
        &name,
        ActiveDetector {
            kind: DetectorKind::Optical,
            uid: channel.daq.rawid,
        },
    )
}
