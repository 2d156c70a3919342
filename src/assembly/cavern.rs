//! Rock cavern of the underground hall.
//!
//! A rock block filling the world horizontally, with the hall (a box topped
//! by an elliptical vault) and the pit of the water tank cut out. Positive x
//! points north, along the access tunnel.

use super::watertank::TANK_Z_IN_WORLD;
use crate::error::Result;
use crate::geometry::{RegistryBuilder, Shape, Transform};
use crate::naming::Entity;
use log::debug;
use std::f64::consts::FRAC_PI_2;

const HALL_HEIGHT: f64 = 19_450.0;
const HALL_WIDTH: f64 = 18_500.0;
/// Height where the vault starts
const VAULT_ONSET: f64 = 10_600.0;
/// Distance from the hall center to the end of the tunnel
const TUNNEL_END: f64 = 17_600.0;
const ROCK_ABOVE: f64 = 5_000.0;
const ROCK_BELOW: f64 = 1_000.0;
const PIT_RADIUS: f64 = 4_975.01;
const PIT_DEPTH: f64 = 800.01;
const CLEARANCE: f64 = 0.01;

pub fn build(builder: &mut RegistryBuilder, world: &str, world_size: f64) -> Result<()> {
    let rock_height = HALL_HEIGHT + ROCK_ABOVE + ROCK_BELOW;
    let rock = Shape::cuboid(world_size - CLEARANCE, world_size - CLEARANCE, rock_height);

    let hall_length = world_size / 2.0 + TUNNEL_END;
    let hall_x = (hall_length - world_size) / 2.0;
    let hall_z = ROCK_BELOW + VAULT_ONSET / 2.0 - rock_height / 2.0;
    let hall = Shape::cuboid(hall_length, HALL_WIDTH, VAULT_ONSET);

    // the tube axis is turned onto x, its dx semi-axis becomes the vault height
    let vault_height = HALL_HEIGHT - VAULT_ONSET;
    let vault = Shape::EllipticalTube {
        dx: vault_height,
        dy: HALL_WIDTH / 2.0,
        dz: hall_length / 2.0,
    };
    let vault_z = hall_z - VAULT_ONSET / 2.0 + HALL_HEIGHT - vault_height;

    let pit = Shape::cylinder(PIT_RADIUS, PIT_DEPTH);
    let pit_z = hall_z - VAULT_ONSET / 2.0 - PIT_DEPTH / 2.0;

    let solid = rock
        .subtract(hall, Transform::translation(hall_x, 0.0, hall_z))
        .subtract(
            vault,
            Transform::new([0.0, FRAC_PI_2, 0.0], [hall_x, 0.0, vault_z]),
        )
        .subtract(pit, Transform::translation(0.0, 0.0, pit_z));

    // the pit floor lies just below the tank bottom
    let pit_floor = pit_z - PIT_DEPTH / 2.0;
    let z = TANK_Z_IN_WORLD - pit_floor - CLEARANCE;
    debug!("Cavern center at z = {:.2} mm", z);

    let name = Entity::Cavern.logical_name();
    super::add_colored(builder, &name, solid, "rock", [0.6, 0.55, 0.5, 0.1])?;
    builder.place(
        &Entity::Cavern.physical_name(),
        &name,
        world,
        Transform::translation(0.0, 0.0, z),
    )
}
