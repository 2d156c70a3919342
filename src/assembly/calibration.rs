//! Calibration tubes.
//!
//! Vertical steel tubes hanging from the top of the cylindrical argon volume.
//! Each tube has its own logical volume since lengths and radii may differ.

use crate::error::Result;
use crate::geometry::{RegistryBuilder, Shape, Transform};
use crate::metadata::SpecialMetadata;
use crate::naming::{metal_material, Entity};
use crate::placement::calibration_tube_position;
use log::{debug, info};

use super::cryostat::TUB_HALF_HEIGHT;

const WALL_THICKNESS: f64 = 1.0;

pub fn build(builder: &mut RegistryBuilder, special: &SpecialMetadata) -> Result<()> {
    let lar = Entity::Lar.logical_name();

    for (id, tube) in &special.calibration {
        let entity = Entity::CalibrationTube(*id);
        let lv = entity.logical_name();
        super::add_colored(
            builder,
            &lv,
            Shape::pipe(
                tube.tube_radius_in_mm - WALL_THICKNESS,
                tube.tube_radius_in_mm,
                tube.length_in_mm,
            ),
            &metal_material("steel"),
            [0.5, 0.5, 0.5, 0.5],
        )?;

        let [x, y] = calibration_tube_position(tube);
        let z = TUB_HALF_HEIGHT - tube.length_in_mm / 2.0;
        debug!("Calibration tube {} at ({:.1}, {:.1}, {:.1})", id, x, y, z);
        builder.place(&entity.physical_name(), &lv, &lar, Transform::translation(x, y, z))?;
    }
    info!("Placed {} calibration tubes", special.calibration.len());
    Ok(())
}
