//! Water tank of the Cherenkov veto.
//!
//! The tank is a solid of revolution: a narrow foot standing in the pit, the
//! main cylinder, and a conical roof with a flat dip in the center. The water
//! is the same outline shaved by the wall thicknesses. The detailed tank cuts
//! the access bulge out of the roof and adds the four roof flanges.
//!
//! Heights are measured from the bottom of the pit (tank frame).

use crate::detail::BuildDirective;
use crate::error::Result;
use crate::geometry::{RegistryBuilder, Shape, Transform};
use crate::naming::{metal_material, Entity};
use log::debug;
use std::f64::consts::PI;

pub const PIT_RADIUS: f64 = 4_975.0;
pub const PIT_HEIGHT: f64 = 800.0;
pub const VERTICAL_WALL: f64 = 10.0;
pub const HORIZONTAL_WALL: f64 = 20.0;
pub const BASE_RADIUS: f64 = 6_000.0;
/// Height where the roof cone starts
pub const BASE_HEIGHT: f64 = 8_877.6 + PIT_HEIGHT;
pub const TOP_HEIGHT: f64 = 9_409.8 + PIT_HEIGHT;

/// Width of the access bulge, also the diameter of the flat roof dip
pub const BULGE_WIDTH: f64 = 3_330.0;
const BULGE_DEPTH: f64 = 169.2;
const BULGE_RADIUS: f64 = 3_025.0;

const FLANGE_POSITION_RADIUS: f64 = 5_300.0;
const FLANGE_INNER_RADIUS: f64 = 299.5;
const FLANGE_OUTER_RADIUS: f64 = 390.0;
/// Top of the flanges above the start of the roof
const FLANGE_TOP: f64 = 1_095.0;
const FLANGE_CLEARANCE: f64 = 1.0;
const FLANGE_COUNT: u32 = 4;

/// Position of the tank frame in the world
pub const TANK_Z_IN_WORLD: f64 = -5_000.0;
/// Position of the cryostat center in the tank frame
pub const CRYOSTAT_Z_IN_TANK: f64 = -TANK_Z_IN_WORLD;

const STEEL_COLOR: [f64; 4] = [0.6, 0.6, 0.6, 0.1];
const WATER_COLOR: [f64; 4] = [0.0, 0.5, 1.0, 0.05];

/// (r, z) outline of the tank with the walls shaved off
pub fn outline(v_wall: f64, h_wall: f64) -> (Vec<f64>, Vec<f64>) {
    let bulge_half_width = BULGE_WIDTH / 2.0;
    let bulge_height = TOP_HEIGHT - BULGE_DEPTH;
    let r = vec![
        0.0,
        PIT_RADIUS - v_wall,
        PIT_RADIUS - v_wall,
        BASE_RADIUS - v_wall,
        BASE_RADIUS - v_wall,
        bulge_half_width + v_wall,
        bulge_half_width + v_wall,
        0.0,
    ];
    let z = vec![
        h_wall,
        h_wall,
        PIT_HEIGHT + h_wall,
        PIT_HEIGHT + h_wall,
        BASE_HEIGHT - h_wall,
        TOP_HEIGHT - h_wall,
        bulge_height - h_wall,
        bulge_height - h_wall,
    ];
    (r, z)
}

/// Height of the outer roof surface at radius `r` on the cone
pub fn roof_height(r: f64) -> f64 {
    let slope = (TOP_HEIGHT - BASE_HEIGHT) / (BASE_RADIUS - BULGE_WIDTH / 2.0);
    BASE_HEIGHT + slope * (BASE_RADIUS - r)
}

fn polycone(v_wall: f64, h_wall: f64) -> Shape {
    let (r, z) = outline(v_wall, h_wall);
    Shape::GenericPolycone {
        sphi: 0.0,
        dphi: 2.0 * PI,
        r,
        z,
    }
}

/// The access bulge: a box with circular ends
fn bulge(v_wall: f64) -> Shape {
    let angle = (BULGE_WIDTH / 2.0 / BULGE_RADIUS).asin();
    let length = angle.cos() * BULGE_RADIUS * 2.0;
    let block = Shape::cuboid(length + v_wall, BULGE_WIDTH + v_wall, BULGE_DEPTH);
    // the segment starts 10 mm inside the block so no faces are shared
    let segment = Shape::Tubs {
        rmin: BULGE_WIDTH / 2.0 - 10.0,
        rmax: BULGE_RADIUS + v_wall,
        z: BULGE_DEPTH,
        sphi: -angle,
        dphi: 2.0 * angle,
    };
    block
        .union(segment.clone(), Transform::default())
        .union(segment, Transform::new([0.0, 0.0, PI], [0.0; 3]))
}

pub fn build(builder: &mut RegistryBuilder, world: &str, directive: BuildDirective) -> Result<()> {
    let detailed = directive.is_detailed();

    let mut tank = polycone(0.0, 0.0);
    let mut water = polycone(VERTICAL_WALL, HORIZONTAL_WALL);
    if detailed {
        tank = tank.subtract(
            bulge(0.0),
            Transform::translation(0.0, 0.0, TOP_HEIGHT - BULGE_DEPTH / 2.0),
        );
        water = water.subtract(
            bulge(4.0 * VERTICAL_WALL),
            Transform::translation(0.0, 0.0, TOP_HEIGHT - BULGE_DEPTH / 2.0 - HORIZONTAL_WALL),
        );
    }

    let tank_lv = Entity::Tank.logical_name();
    super::add_colored(builder, &tank_lv, tank, &metal_material("steel"), STEEL_COLOR)?;
    builder.place(
        &Entity::Tank.physical_name(),
        &tank_lv,
        world,
        Transform::translation(0.0, 0.0, TANK_Z_IN_WORLD),
    )?;

    let water_lv = Entity::TankWater.logical_name();
    super::add_colored(builder, &water_lv, water, "water", WATER_COLOR)?;
    builder.place(
        &Entity::TankWater.physical_name(),
        &water_lv,
        &tank_lv,
        Transform::default(),
    )?;

    if detailed {
        place_flanges(builder, world)?;
    }
    Ok(())
}

/// Flanges stand on the roof cone, outside the tank volume
fn place_flanges(builder: &mut RegistryBuilder, world: &str) -> Result<()> {
    let bottom = roof_height(FLANGE_POSITION_RADIUS - FLANGE_OUTER_RADIUS) + FLANGE_CLEARANCE;
    let top = BASE_HEIGHT + FLANGE_TOP;
    debug!("Tank flanges span z = {:.1}..{:.1} mm in the tank frame", bottom, top);

    let lv = Entity::TankFlange(1).logical_name();
    super::add_colored(
        builder,
        &lv,
        Shape::pipe(FLANGE_INNER_RADIUS, FLANGE_OUTER_RADIUS, top - bottom),
        &metal_material("steel"),
        STEEL_COLOR,
    )?;

    for i in 0..FLANGE_COUNT {
        let angle = (45.0 + 90.0 * f64::from(i)).to_radians();
        let translation = [
            FLANGE_POSITION_RADIUS * angle.sin(),
            FLANGE_POSITION_RADIUS * angle.cos(),
            TANK_Z_IN_WORLD + (bottom + top) / 2.0,
        ];
        builder.place(
            &Entity::TankFlange(i + 1).physical_name(),
            &lv,
            world,
            Transform::new([0.0, 0.0, angle], translation),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();
        builder
            .add_logical("world", Shape::cuboid(20_000.0, 20_000.0, 20_000.0), "vacuum")
            .unwrap();
        builder.set_world("world").unwrap();
        builder
    }

    #[test]
    fn test_water_outline_inside_tank() {
        let (tank_r, tank_z) = outline(0.0, 0.0);
        let (water_r, water_z) = outline(VERTICAL_WALL, HORIZONTAL_WALL);
        assert_eq!(tank_r[3], 6000.0);
        assert_eq!(water_r[3], 5990.0);
        assert_eq!(water_z[0], 20.0);
        assert!((tank_z[4] - 9677.6).abs() < 1e-9);
        assert!((water_z[5] - (tank_z[5] - 20.0)).abs() < 1e-9);
    }

    #[test]
    fn test_roof_height() {
        assert!((roof_height(BASE_RADIUS) - BASE_HEIGHT).abs() < 1e-9);
        assert!((roof_height(BULGE_WIDTH / 2.0) - TOP_HEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_simple_tank_has_no_flanges() {
        let mut builder = builder();
        build(&mut builder, "world", BuildDirective::Simple).unwrap();
        let registry = builder.finish().unwrap();
        assert!(registry.contains("tank"));
        assert!(!registry.contains("tank_flange_1"));
        assert!(matches!(
            registry.logical("tank").unwrap().shape,
            Shape::GenericPolycone { .. }
        ));
    }

    #[test]
    fn test_detailed_tank_flanges_clear_the_roof() {
        let mut builder = builder();
        build(&mut builder, "world", BuildDirective::Detailed).unwrap();
        let registry = builder.finish().unwrap();

        assert_eq!(registry.daughters("world").filter(|n| n.logical == "tank_flange").count(), 4);
        let flange = registry.node("tank_flange_2").unwrap();
        let height = match registry.logical("tank_flange").unwrap().shape {
            Shape::Tubs { z, .. } => z,
            ref other => panic!("unexpected flange shape {:?}", other),
        };
        let bottom = flange.transform.translation[2] - height / 2.0 - TANK_Z_IN_WORLD;
        assert!(bottom > roof_height(FLANGE_POSITION_RADIUS - FLANGE_OUTER_RADIUS));
        assert!(matches!(
            registry.logical("tank_water").unwrap().shape,
            Shape::Boolean { .. }
        ));
    }
}
