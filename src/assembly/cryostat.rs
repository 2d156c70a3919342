//! Cryostat layers and the liquid argon.
//!
//! Four nested layers share one outline grown by a per-layer offset: outer
//! steel wall, insulation vacuum, inner steel wall and the argon. Each layer
//! is placed at the origin of the next outer one. The simple cryostat is a
//! plain cylinder per layer; the detailed one has elliptical heads and the
//! access neck, and adds the neutron moderator shell in the argon.

use crate::detail::BuildDirective;
use crate::error::Result;
use crate::geometry::{RegistryBuilder, Shape, Transform, VisAttributes};
use crate::naming::{metal_material, Entity};
use log::debug;

pub const LAR_RADIUS: f64 = 3_976.0 / 2.0;
/// Half height of the cylindrical part
pub const TUB_HALF_HEIGHT: f64 = 1_950.0;
const TOP_HEAD_HEIGHT: f64 = 826.0;
const BOTTOM_HEAD_HEIGHT: f64 = 829.0;
const NECK_RADIUS: f64 = 400.0;
const NECK_HEIGHT: f64 = 1_720.0;
/// Depth of the neck inside the top head
const NECK_OVERLAP: f64 = 200.0;

const MODERATOR_INNER_RADIUS: f64 = 1_300.0;
const MODERATOR_OUTER_RADIUS: f64 = 1_350.0;
const MODERATOR_HEIGHT: f64 = 3_000.0;
const MODERATOR_Z: f64 = -100.0;

struct Layer {
    entity: Entity<'static>,
    offset: f64,
    material: String,
    vis: VisAttributes,
}

fn layers() -> [Layer; 4] {
    let wall = VisAttributes::Color([0.7, 0.7, 0.7, 0.1]);
    [
        Layer {
            entity: Entity::OuterCryostat,
            offset: 67.0,
            material: metal_material("steel"),
            vis: wall,
        },
        Layer {
            entity: Entity::VacuumGap,
            offset: 52.0,
            material: "vacuum".to_string(),
            vis: VisAttributes::Hidden,
        },
        Layer {
            entity: Entity::InnerCryostat,
            offset: 12.0,
            material: metal_material("steel"),
            vis: wall,
        },
        Layer {
            entity: Entity::Lar,
            offset: 0.0,
            material: "liquidargon".to_string(),
            vis: VisAttributes::Color([0.0, 0.0, 0.0, 0.1]),
        },
    ]
}

/// Outline of a layer grown by `offset` from the argon outline
pub fn layer_shape(offset: f64, detailed: bool) -> Shape {
    let radius = LAR_RADIUS + offset;
    if !detailed {
        return Shape::cylinder(radius, 2.0 * (TUB_HALF_HEIGHT + offset));
    }

    let top_head = TOP_HEAD_HEIGHT + offset;
    let bottom_head = BOTTOM_HEAD_HEIGHT + offset;
    let top = Shape::Ellipsoid {
        ax: radius,
        by: radius,
        cz: top_head,
        zcut1: 0.0,
        zcut2: top_head,
    };
    let bottom = Shape::Ellipsoid {
        ax: radius,
        by: radius,
        cz: bottom_head,
        zcut1: -bottom_head,
        zcut2: 0.0,
    };

    let neck_bottom = TUB_HALF_HEIGHT + TOP_HEAD_HEIGHT - NECK_OVERLAP;
    let neck_top = TUB_HALF_HEIGHT + TOP_HEAD_HEIGHT + NECK_HEIGHT + offset;
    let neck = Shape::cylinder(NECK_RADIUS + offset, neck_top - neck_bottom);

    Shape::cylinder(radius, 2.0 * TUB_HALF_HEIGHT)
        .union(top, Transform::translation(0.0, 0.0, TUB_HALF_HEIGHT))
        .union(bottom, Transform::translation(0.0, 0.0, -TUB_HALF_HEIGHT))
        .union(
            neck,
            Transform::translation(0.0, 0.0, (neck_bottom + neck_top) / 2.0),
        )
}

/// Build the layers into `mother`; the argon logical volume is `lar`
pub fn build(
    builder: &mut RegistryBuilder,
    directive: BuildDirective,
    mother: &str,
    transform: Transform,
) -> Result<()> {
    let detailed = directive.is_detailed();
    debug!("Building the {} cryostat in '{}'", if detailed { "detailed" } else { "simple" }, mother);

    let mut mother = mother.to_string();
    let mut transform = transform;
    for layer in layers() {
        let lv = layer.entity.logical_name();
        builder.add_logical(&lv, layer_shape(layer.offset, detailed), &layer.material)?;
        builder.set_vis(&lv, layer.vis)?;
        builder.place(&layer.entity.physical_name(), &lv, &mother, transform)?;
        mother = lv;
        transform = Transform::default();
    }

    if detailed {
        let lv = Entity::Moderator.logical_name();
        super::add_colored(
            builder,
            &lv,
            Shape::pipe(MODERATOR_INNER_RADIUS, MODERATOR_OUTER_RADIUS, MODERATOR_HEIGHT),
            "pmma",
            [0.8, 0.8, 1.0, 0.2],
        )?;
        builder.place(
            &Entity::Moderator.physical_name(),
            &lv,
            &mother,
            Transform::translation(0.0, 0.0, MODERATOR_Z),
        )?;
    }
    Ok(())
}
