//! Assembly composition.
//!
//! The assemblies are built in a fixed nesting order into one
//! [`RegistryBuilder`]: world, cavern, water tank, tank instrumentation,
//! cryostat, reflector, HPGe strings and calibration tubes. An assembly only
//! places volumes into mothers that already exist, and the first error aborts
//! the whole build; a registry is only returned when everything was placed.
//!
//! Frames: the world origin is the cryostat center. The water tank frame has
//! its origin at the bottom of the pit, the LAr frame coincides with the
//! cryostat frame.

pub mod calibration;
pub mod cavern;
pub mod cryostat;
pub mod hpge_strings;
pub mod instrumentation;
pub mod watertank;
pub mod wlsr;

use crate::config::BaseConfig;
use crate::detail::{Assembly, ResolvedDetail};
use crate::error::Result;
use crate::geometry::{Rgba, RegistryBuilder, Shape, Transform, VisAttributes, VolumeRegistry};
use crate::metadata::{Channelmap, SpecialMetadata};
use crate::naming::Entity;
use log::{debug, info};

/// Edge length of the world box
pub const WORLD_SIZE_IN_MM: f64 = 20_000.0;
/// Edge length of the world box when the cavern is built
pub const WORLD_SIZE_WITH_CAVERN_IN_MM: f64 = 50_000.0;

pub(crate) const COPPER_COLOR: Rgba = [0.72, 0.45, 0.2, 1.0];

/// Everything a build reads. Nothing of it is modified.
#[derive(Debug, Clone, Copy)]
pub struct BuildInputs<'a> {
    pub config: &'a BaseConfig,
    pub special_metadata: &'a SpecialMetadata,
    pub channelmap: &'a Channelmap,
    pub detail: &'a ResolvedDetail,
}

/// Compose the full geometry
pub fn build(inputs: &BuildInputs) -> Result<VolumeRegistry> {
    inputs.special_metadata.validate()?;
    let detail = inputs.detail;
    let mut builder = RegistryBuilder::new();

    let with_cavern = detail.build(Assembly::Cavern).is_some();
    let world_size = if with_cavern {
        WORLD_SIZE_WITH_CAVERN_IN_MM
    } else {
        WORLD_SIZE_IN_MM
    };
    let world = Entity::World.logical_name();
    builder.add_logical(&world, Shape::cuboid(world_size, world_size, world_size), "vacuum")?;
    builder.set_vis(&world, VisAttributes::Hidden)?;
    builder.set_world(&world)?;

    if with_cavern {
        cavern::build(&mut builder, &world, world_size)?;
    }

    let (cryostat_mother, cryostat_transform) = match detail.build(Assembly::Watertank) {
        Some(directive) => {
            watertank::build(&mut builder, &world, directive)?;
            (
                Entity::TankWater.logical_name(),
                Transform::translation(0.0, 0.0, watertank::CRYOSTAT_Z_IN_TANK),
            )
        }
        None => (world.clone(), Transform::default()),
    };

    if detail.build(Assembly::WatertankInstrumentation).is_some() {
        instrumentation::build(&mut builder, inputs.special_metadata, inputs.channelmap)?;
    }

    cryostat::build(&mut builder, detail.cryostat(), &cryostat_mother, cryostat_transform)?;

    if detail.build(Assembly::Wlsr).is_some() {
        wlsr::build(&mut builder)?;
    }
    if let Some(directive) = detail.build(Assembly::HpgeStrings) {
        hpge_strings::build(&mut builder, inputs, directive)?;
    }
    if detail.build(Assembly::Calibration).is_some() {
        calibration::build(&mut builder, inputs.special_metadata)?;
    }

    for (assembly, directive) in detail.iter() {
        debug!("Assembly {:<26} {:?}", assembly.as_str(), directive);
    }
    let registry = builder.finish()?;
    info!(
        "Composed geometry: {} placements, {} logical volumes, {} detectors",
        registry.len(),
        registry.logical_volumes().count(),
        registry.detectors().count()
    );
    Ok(registry)
}

/// Define a logical volume with a color
pub(crate) fn add_colored(
    builder: &mut RegistryBuilder,
    name: &str,
    shape: Shape,
    material: &str,
    color: Rgba,
) -> Result<()> {
    builder.add_logical(name, shape, material)?;
    builder.set_vis(name, VisAttributes::Color(color))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::detail::DetailLevel;
    use crate::error::GeometryError;

    #[test]
    fn test_full_build_nesting() {
        let (config, generated) = generated();
        let detail = detail(&config, DetailLevel::Full, None);
        let registry = build(&BuildInputs {
            config: &config,
            special_metadata: &generated.special_metadata,
            channelmap: &generated.channelmap,
            detail: &detail,
        })
        .unwrap();

        assert_eq!(registry.world_name(), "world");
        let parent = |name: &str| registry.node(name).unwrap().mother.clone().unwrap();
        assert_eq!(parent("cavern"), "world");
        assert_eq!(parent("tank"), "world");
        assert_eq!(parent("tank_water"), "tank");
        assert_eq!(parent("outercryostat"), "tank_water");
        assert_eq!(parent("vacuum_gap"), "outercryostat");
        assert_eq!(parent("innercryostat"), "vacuum_gap");
        assert_eq!(parent("lar"), "innercryostat");
        assert_eq!(parent("top_copper_plate"), "lar");
        assert_eq!(parent("tyvek_foil"), "tank_water");
        assert_eq!(parent("pmt_floor_101"), "tank_water");

        let geds = generated.special_metadata.hpges.len();
        let pmts = generated
            .channelmap
            .values()
            .filter(|c| c.system == crate::metadata::System::Pmts)
            .count();
        assert_eq!(registry.detectors().count(), geds + pmts);
    }

    #[test]
    fn test_cryostat_in_world_without_tank() {
        let (config, generated) = generated();
        let detail = detail(&config, DetailLevel::Radiogenic, Some(&[Assembly::HpgeStrings]));
        let registry = build(&BuildInputs {
            config: &config,
            special_metadata: &generated.special_metadata,
            channelmap: &generated.channelmap,
            detail: &detail,
        })
        .unwrap();

        assert!(!registry.contains("tank"));
        let outer = registry.node("outercryostat").unwrap();
        assert_eq!(outer.mother.as_deref(), Some("world"));
        assert_eq!(outer.transform, Transform::default());
        assert!(registry.contains("lar"));
    }

    #[test]
    fn test_instrumentation_needs_tank() {
        let (mut config, generated) = generated();
        let level = config.detail.get_mut(&DetailLevel::Full).unwrap();
        level.insert(Assembly::Watertank, crate::detail::Directive::Omit);
        let detail = detail(&config, DetailLevel::Full, None);
        let result = build(&BuildInputs {
            config: &config,
            special_metadata: &generated.special_metadata,
            channelmap: &generated.channelmap,
            detail: &detail,
        });
        assert!(matches!(result, Err(GeometryError::Construction(_))));
    }
}
