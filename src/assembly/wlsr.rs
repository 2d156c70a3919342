//! Wavelength-shifting reflector.
//!
//! Two barrels in the argon, each a tetratex reflector foil coated with a
//! TPB layer on its inner face.

use crate::error::Result;
use crate::geometry::{RegistryBuilder, Shape, Transform};
use crate::naming::{border_surface, skin_surface, surface_property, Entity, WlsBarrel, WlsLayer};
use log::debug;

const TETRATEX_THICKNESS: f64 = 0.254;
const TPB_THICKNESS: f64 = 0.001;

/// (inner radius, height, center z) of a barrel in the argon frame
pub fn barrel_dimensions(barrel: WlsBarrel) -> (f64, f64, f64) {
    match barrel {
        WlsBarrel::InnerArgon => (1_250.0, 2_900.0, -100.0),
        WlsBarrel::OuterAtmospheric => (1_400.0, 3_200.0, -100.0),
    }
}

pub fn build(builder: &mut RegistryBuilder) -> Result<()> {
    let lar = Entity::Lar.logical_name();

    for barrel in WlsBarrel::ALL {
        let (radius, height, z) = barrel_dimensions(barrel);
        let tetratex = Entity::Wls {
            layer: WlsLayer::Tetratex,
            barrel,
        };
        let tpb = Entity::Wls {
            layer: WlsLayer::Tpb,
            barrel,
        };

        let tetratex_lv = tetratex.logical_name();
        super::add_colored(
            builder,
            &tetratex_lv,
            Shape::pipe(radius, radius + TETRATEX_THICKNESS, height),
            "tetratex",
            [1.0, 1.0, 1.0, 0.3],
        )?;
        builder.place(
            &tetratex.physical_name(),
            &tetratex_lv,
            &lar,
            Transform::translation(0.0, 0.0, z),
        )?;

        let tpb_lv = tpb.logical_name();
        builder.add_logical(&tpb_lv, Shape::pipe(radius, radius + TPB_THICKNESS, height), "tpb")?;
        let tpb_pv = tpb.physical_name();
        builder.place(&tpb_pv, &tpb_lv, &tetratex_lv, Transform::default())?;

        builder.add_border_surface(
            &border_surface("lar", "tpb", &tpb_pv),
            &surface_property("lar", "tpb"),
            &Entity::Lar.physical_name(),
            &tpb_pv,
        )?;
        builder.add_skin_surface(
            &skin_surface(&tetratex_lv),
            &surface_property("tpb", "tetratex"),
            &tetratex_lv,
        )?;
        debug!("Reflector barrel {} at r = {} mm", barrel.as_str(), radius);
    }
    Ok(())
}
