//! HPGe detector strings.
//!
//! Strings hang from the top copper plate. Every detector unit sits one cold
//! rod length below the previous one; position 1 is the top of the string.
//! The channelmap decides which detectors exist and where they go, the
//! special metadata carries the string layout and the per-unit rod lengths
//! and baseplates.
//!
//! The simple directive builds the plate, the string supports and the
//! crystals. Anything else adds PEN baseplates, tristars, copper rods, nylon
//! minishrouds, the optical surfaces and the readout of every unit: signal
//! and HV cables on flat clamps below the baseplate, plus the front-end ASIC.
//! Cables run up along the string at the rod radius, between two rods.

use super::{BuildInputs, COPPER_COLOR};
use crate::detail::BuildDirective;
use crate::error::{GeometryError, Result};
use crate::geometry::{ActiveDetector, DetectorKind, RegistryBuilder, Rgba, Shape, Transform};
use crate::materials::germanium_material;
use crate::metadata::{
    validate_detector_name, Baseplate, ChannelEntry, Channelmap, HpgeGeometry, HpgeStringMeta, HpgeUnitMeta,
    Location, SpecialMetadata, System,
};
use crate::naming::{border_surface, metal_material, skin_surface, surface_property, Entity, Readout, Segment};
use crate::placement::{polar_to_cartesian, stacked_depths, string_position};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Height of the bottom face of the top copper plate in the argon frame
pub const TOP_PLATE_Z: f64 = 1_500.0;
const TOP_PLATE_RADIUS: f64 = 900.0;
const TOP_PLATE_THICKNESS: f64 = 30.0;
const SUPPORT_HEIGHT: f64 = 5.0;
const PEN_THICKNESS: f64 = 2.4;
/// Gap between the PEN plate and the detector above it
const PEN_GAP: f64 = 2.4;
const MINISHROUD_WALL: f64 = 0.125;
const TRISTAR_THICKNESS: f64 = 2.0;

const CABLE_THICKNESS: f64 = 0.076;
const CLAMP_THICKNESS: f64 = 1.8;
/// Readout hanging below the baseplate: a cable layer on a clamp layer
const READOUT_DEPTH: f64 = CABLE_THICKNESS + CLAMP_THICKNESS;
const CABLE_WIDTH: f64 = 2.0;
/// Clearance between a cable strip and the hardware above it
const STRIP_GAP: f64 = 0.5;
/// Azimuth of the signal and HV readout relative to the first rod, in degrees
const SIGNAL_SIDE: f64 = 60.0;
const HV_SIDE: f64 = 180.0;

/// Enrichment assumed for detectors without production data
pub const DEFAULT_ENRICHMENT: f64 = 0.86;

const DETECTOR_COLOR: Rgba = [0.0, 1.0, 1.0, 1.0];
const ULTEM_COLOR: Rgba = [0.8, 0.75, 0.5, 1.0];
const ASIC_COLOR: Rgba = [0.2, 0.2, 0.2, 1.0];

/// One slot of a string with everything needed to build it
#[derive(Debug)]
struct DetectorUnit<'a> {
    channel: &'a ChannelEntry,
    position: u32,
    geometry: &'a HpgeGeometry,
    meta: &'a HpgeUnitMeta,
}

impl DetectorUnit<'_> {
    fn name(&self) -> &str {
        &self.channel.name
    }

    fn enrichment(&self) -> f64 {
        match self.channel.production.as_ref().and_then(|p| p.enrichment) {
            Some(enrichment) => enrichment,
            None => {
                warn!(
                    "{} has no enrichment in metadata, using {}",
                    self.name(),
                    DEFAULT_ENRICHMENT
                );
                DEFAULT_ENRICHMENT
            }
        }
    }

    /// Baseplate size, with the Ortec variant of the medium plate
    fn pen_size(&self) -> Baseplate {
        let ortec = self
            .channel
            .production
            .as_ref()
            .and_then(|p| p.manufacturer.as_deref())
            == Some("Ortec");
        if self.meta.baseplate == Baseplate::Medium && self.name().starts_with('V') && ortec {
            Baseplate::MediumOrtec
        } else {
            self.meta.baseplate
        }
    }
}

pub fn pen_color(size: Baseplate) -> Rgba {
    match size {
        Baseplate::Small | Baseplate::PpcSmall => [1.0, 0.0, 0.0, 1.0],
        Baseplate::Medium => [0.0, 1.0, 0.0, 1.0],
        Baseplate::MediumOrtec => [1.0, 0.0, 1.0, 1.0],
        Baseplate::Large => [0.0, 0.0, 1.0, 1.0],
        Baseplate::Xlarge => [1.0, 1.0, 0.0, 1.0],
    }
}

/// Group the HPGe channels by string, ordered from the top
fn collect_strings<'a>(
    special: &'a SpecialMetadata,
    channelmap: &'a Channelmap,
) -> Result<BTreeMap<u32, Vec<DetectorUnit<'a>>>> {
    let mut strings: BTreeMap<u32, Vec<DetectorUnit>> = BTreeMap::new();

    for channel in channelmap.values().filter(|c| c.system == System::Geds) {
        validate_detector_name(&channel.name)?;
        let (string, position) = match channel.location {
            Location::Slot { string, position } => (string, position),
            _ => {
                return Err(GeometryError::config(format!(
                    "HPGe detector '{}' has no string slot",
                    channel.name
                )))
            }
        };
        if !special.hpge_strings.contains_key(&string) {
            return Err(GeometryError::config(format!(
                "detector '{}' hangs in string {}, which is missing from the special metadata",
                channel.name, string
            )));
        }
        let meta = special.hpges.get(&channel.name).ok_or_else(|| {
            GeometryError::config(format!("detector '{}' is missing from hpges metadata", channel.name))
        })?;
        let geometry = channel.geometry.as_ref().ok_or_else(|| {
            GeometryError::config(format!("detector '{}' has no geometry", channel.name))
        })?;
        geometry.validate(&channel.name)?;

        strings.entry(string).or_default().push(DetectorUnit {
            channel,
            position,
            geometry,
            meta,
        });
    }

    for (string, units) in strings.iter_mut() {
        units.sort_by_key(|unit| unit.position);
        for (i, unit) in units.iter().enumerate() {
            let expected = i as u32 + 1;
            if unit.position != expected {
                return Err(GeometryError::config(format!(
                    "string {} has detector '{}' at position {} where position {} is expected",
                    string,
                    unit.name(),
                    unit.position,
                    expected
                )));
            }
        }
    }
    Ok(strings)
}

pub fn build(builder: &mut RegistryBuilder, inputs: &BuildInputs, directive: BuildDirective) -> Result<()> {
    let lar = Entity::Lar.logical_name();
    let detailed = directive.is_detailed();
    let strings = collect_strings(inputs.special_metadata, inputs.channelmap)?;

    let plate = Entity::TopCopperPlate.logical_name();
    super::add_colored(
        builder,
        &plate,
        Shape::cylinder(TOP_PLATE_RADIUS, TOP_PLATE_THICKNESS),
        &metal_material("copper"),
        COPPER_COLOR,
    )?;
    builder.place(
        &Entity::TopCopperPlate.physical_name(),
        &plate,
        &lar,
        Transform::translation(0.0, 0.0, TOP_PLATE_Z + TOP_PLATE_THICKNESS / 2.0),
    )?;

    let layout = StringLayout {
        lar: &lar,
        rod_radius: inputs.config.string.copper_rods.r,
        detailed,
    };
    let mut detectors = 0;
    for (id, meta) in &inputs.special_metadata.hpge_strings {
        let units = strings.get(id).map(Vec::as_slice).unwrap_or(&[]);
        layout.build_string(builder, *id, meta, units)?;
        detectors += units.len();
    }
    info!(
        "Placed {} HPGe detectors in {} strings",
        detectors,
        inputs.special_metadata.hpge_strings.len()
    );
    Ok(())
}

struct StringLayout<'a> {
    lar: &'a str,
    /// Radius of one copper rod
    rod_radius: f64,
    detailed: bool,
}

impl StringLayout<'_> {
    fn build_string(
        &self,
        builder: &mut RegistryBuilder,
        id: u32,
        meta: &HpgeStringMeta,
        units: &[DetectorUnit],
    ) -> Result<()> {
        let [x, y] = string_position(meta);
        let z0 = TOP_PLATE_Z;
        debug!("String {} at ({:.1}, {:.1}) with {} units", id, x, y, units.len());

        let support = Entity::StringSupport(id);
        super::add_colored(
            builder,
            &support.logical_name(),
            Shape::cylinder(meta.rod_radius_in_mm + self.rod_radius, SUPPORT_HEIGHT),
            &metal_material("copper"),
            COPPER_COLOR,
        )?;
        builder.place(
            &support.physical_name(),
            &support.logical_name(),
            self.lar,
            Transform::translation(x, y, z0 - SUPPORT_HEIGHT / 2.0),
        )?;

        let rod_lengths: Vec<f64> = units.iter().map(|u| u.meta.rodlength_in_mm).collect();
        let depths = stacked_depths(&rod_lengths);
        // lowest point of each unit: the baseplate, and the readout below it
        let readout = if self.detailed { READOUT_DEPTH } else { 0.0 };
        let unit_bottoms: Vec<f64> = depths
            .iter()
            .map(|depth| z0 - depth - PEN_GAP - PEN_THICKNESS - readout)
            .collect();

        for (i, (unit, depth)) in units.iter().zip(&depths).enumerate() {
            self.place_unit(builder, unit, [x, y], z0 - depth)?;
            if self.detailed {
                let above = if i == 0 { z0 - SUPPORT_HEIGHT } else { unit_bottoms[i - 1] };
                let pen_bottom = z0 - depth - PEN_GAP - PEN_THICKNESS;
                self.place_readout(builder, id, meta, unit, [x, y], [pen_bottom, above - STRIP_GAP])?;
            }
        }

        if self.detailed {
            if let Some(first) = units.first() {
                self.place_tristar(builder, id, first.pen_size(), [x, y], z0 - SUPPORT_HEIGHT)?;
            }
            if let Some(&bottom) = unit_bottoms.last() {
                self.place_rods(builder, id, meta, [x, y], z0 - SUPPORT_HEIGHT, bottom)?;
                self.place_minishrouds(builder, id, meta, [x, y], z0 - SUPPORT_HEIGHT, &unit_bottoms)?;
            }
        }
        Ok(())
    }

    /// Place a crystal with its bottom face at `bottom`, and its baseplate
    fn place_unit(
        &self,
        builder: &mut RegistryBuilder,
        unit: &DetectorUnit,
        [x, y]: [f64; 2],
        bottom: f64,
    ) -> Result<()> {
        let entity = Entity::Detector(unit.name());
        let lv = entity.logical_name();
        let height = unit.geometry.height_in_mm;
        super::add_colored(
            builder,
            &lv,
            Shape::cylinder(unit.geometry.radius_in_mm, height),
            &germanium_material(unit.enrichment())?,
            DETECTOR_COLOR,
        )?;
        let pv = entity.physical_name();
        builder.place(&pv, &lv, self.lar, Transform::translation(x, y, bottom + height / 2.0))?;
        builder.register_detector(
            &pv,
            ActiveDetector {
                kind: DetectorKind::Germanium,
                uid: unit.channel.daq.rawid,
            },
        )?;

        if !self.detailed {
            return Ok(());
        }
        let lar_pv = Entity::Lar.physical_name();
        builder.add_border_surface(
            &border_surface("lar", "ge", &pv),
            &surface_property("lar", "germanium"),
            &lar_pv,
            &pv,
        )?;

        let size = unit.pen_size();
        let pen = Entity::PenPlate {
            detector: unit.name(),
            size,
        };
        let pen_lv = pen.logical_name();
        if !builder.has_logical(&pen_lv) {
            super::add_colored(
                builder,
                &pen_lv,
                Shape::cylinder(size.radius_in_mm(), PEN_THICKNESS),
                "pen",
                pen_color(size),
            )?;
        }
        let pen_pv = pen.physical_name();
        builder.place(
            &pen_pv,
            &pen_lv,
            self.lar,
            Transform::translation(x, y, bottom - PEN_GAP - PEN_THICKNESS / 2.0),
        )?;

        // LAr and PEN need a surface in both directions
        let property = surface_property("lar", "pen");
        builder.add_border_surface(&border_surface("lar", "pen", &pen_pv), &property, &lar_pv, &pen_pv)?;
        builder.add_border_surface(&border_surface("tpb", "pen", &pen_pv), &property, &pen_pv, &lar_pv)
    }

    /// PEN tristar hanging below the string support
    fn place_tristar(
        &self,
        builder: &mut RegistryBuilder,
        id: u32,
        size: Baseplate,
        [x, y]: [f64; 2],
        top: f64,
    ) -> Result<()> {
        let tristar = Entity::Tristar { string: id, size };
        let lv = tristar.logical_name();
        if !builder.has_logical(&lv) {
            super::add_colored(
                builder,
                &lv,
                Shape::cylinder(size.radius_in_mm(), TRISTAR_THICKNESS),
                "pen",
                COPPER_COLOR,
            )?;
        }
        builder.place(
            &tristar.physical_name(),
            &lv,
            self.lar,
            Transform::translation(x, y, top - TRISTAR_THICKNESS / 2.0),
        )
    }

    /// Signal and HV readout of one unit.
    ///
    /// Cables lie flat below the baseplate bottom `pen_bottom`, clamps and
    /// the ASIC below them. Each cable leaves the unit radially and runs up
    /// to `strip_top` at the rod radius.
    fn place_readout(
        &self,
        builder: &mut RegistryBuilder,
        id: u32,
        meta: &HpgeStringMeta,
        unit: &DetectorUnit,
        [x, y]: [f64; 2],
        [pen_bottom, strip_top]: [f64; 2],
    ) -> Result<()> {
        let strip_radius = meta.rod_radius_in_mm;
        let strip_length = strip_top - (pen_bottom - CABLE_THICKNESS);
        if strip_length <= 0.0 {
            return Err(GeometryError::construction(format!(
                "no room for the cables of '{}' in string {}",
                unit.name(),
                id
            )));
        }
        let cable_z = pen_bottom - CABLE_THICKNESS / 2.0;
        let clamp_z = pen_bottom - CABLE_THICKNESS - CLAMP_THICKNESS / 2.0;
        let asic_z = pen_bottom - CABLE_THICKNESS - ASIC_SIZE[2] / 2.0;
        let signal = meta.angle_in_deg + SIGNAL_SIDE;
        let hv = meta.angle_in_deg + HV_SIDE;

        let parts = [
            (
                Readout::SignalCable,
                cable(SIGNAL_PAD, SIGNAL_PAD_CENTER, strip_radius, strip_length)?,
                metal_material("copper"),
                COPPER_COLOR,
                signal,
                SIGNAL_PAD_CENTER,
                cable_z,
            ),
            (
                Readout::SignalClamp,
                signal_clamp(),
                "ultem".to_string(),
                ULTEM_COLOR,
                signal,
                SIGNAL_CLAMP_CENTER,
                clamp_z,
            ),
            (
                Readout::SignalAsic,
                Shape::cuboid(ASIC_SIZE[0], ASIC_SIZE[1], ASIC_SIZE[2]),
                "silica".to_string(),
                ASIC_COLOR,
                signal,
                ASIC_CENTER,
                asic_z,
            ),
            (
                Readout::HvCable,
                cable(HV_PAD, HV_CENTER, strip_radius, strip_length)?,
                metal_material("copper"),
                COPPER_COLOR,
                hv,
                HV_CENTER,
                cable_z,
            ),
            (
                Readout::HvClamp,
                Shape::cuboid(HV_CLAMP[0], HV_CLAMP[1], CLAMP_THICKNESS),
                "ultem".to_string(),
                ULTEM_COLOR,
                hv,
                HV_CENTER,
                clamp_z,
            ),
        ];

        for (part, shape, material, color, azimuth, radial, z) in parts {
            let entity = Entity::Readout {
                detector: unit.name(),
                string: id,
                part,
            };
            let lv = entity.logical_name();
            super::add_colored(builder, &lv, shape, &material, color)?;
            let [dx, dy] = polar_to_cartesian(radial, azimuth);
            builder.place(
                &entity.physical_name(),
                &lv,
                self.lar,
                Transform::new([0.0, 0.0, azimuth.to_radians()], [x + dx, y + dy, z]),
            )?;
        }
        Ok(())
    }

    /// Three copper rods around the string axis from `top` to `bottom`
    fn place_rods(
        &self,
        builder: &mut RegistryBuilder,
        id: u32,
        meta: &HpgeStringMeta,
        [x, y]: [f64; 2],
        top: f64,
        bottom: f64,
    ) -> Result<()> {
        let lv = Entity::Rod {
            string: id,
            segment: Segment::Index(0),
        }
        .logical_name();
        super::add_colored(
            builder,
            &lv,
            Shape::cylinder(self.rod_radius, top - bottom),
            &metal_material("copper"),
            COPPER_COLOR,
        )?;

        for i in 0..3 {
            let [dx, dy] = polar_to_cartesian(meta.rod_radius_in_mm, meta.angle_in_deg + 120.0 * f64::from(i));
            let rod = Entity::Rod {
                string: id,
                segment: Segment::Index(i),
            };
            builder.place(
                &rod.physical_name(),
                &lv,
                self.lar,
                Transform::translation(x + dx, y + dy, (top + bottom) / 2.0),
            )?;
        }
        builder.add_skin_surface(
            &skin_surface(&lv),
            &surface_property("lar", &metal_material("copper")),
            &lv,
        )
    }

    /// Upper shroud around the first half of the units, lower one around the rest
    fn place_minishrouds(
        &self,
        builder: &mut RegistryBuilder,
        id: u32,
        meta: &HpgeStringMeta,
        [x, y]: [f64; 2],
        top: f64,
        unit_bottoms: &[f64],
    ) -> Result<()> {
        let split = (unit_bottoms.len() + 1) / 2;
        let upper_bottom = unit_bottoms[split - 1];
        let mut sections = vec![(Segment::Upper, top, upper_bottom)];
        if unit_bottoms.len() > split {
            let lower_bottom = unit_bottoms[unit_bottoms.len() - 1] - meta.minishroud_delta_length_in_mm;
            sections.push((Segment::Lower, upper_bottom, lower_bottom));
        }

        let r = meta.minishroud_radius_in_mm;
        for (segment, top, bottom) in sections {
            let shroud = Entity::Minishroud { string: id, segment };
            builder.add_logical(
                &shroud.logical_name(),
                Shape::pipe(r - MINISHROUD_WALL, r, top - bottom),
                "nylon",
            )?;
            builder.place(
                &shroud.physical_name(),
                &shroud.logical_name(),
                self.lar,
                Transform::translation(x, y, (top + bottom) / 2.0),
            )?;
        }
        Ok(())
    }
}

/// Signal cable pad below the clamp, radial by tangential extent
const SIGNAL_PAD: [f64; 2] = [16.0, 13.0];
/// Distances of the readout parts from the string axis
const SIGNAL_PAD_CENTER: f64 = 14.5;
const SIGNAL_CLAMP_CENTER: f64 = 10.5;
const ASIC_CENTER: f64 = 18.0;
const HV_CENTER: f64 = 38.0;
const HV_PAD: [f64; 2] = [8.0, 13.0];
const HV_CLAMP: [f64; 2] = [5.0, 13.0];
const ASIC_SIZE: [f64; 3] = [1.0, 1.0, 0.5];

/// Flat cable: a pad under the clamp, a link out to `strip_radius` and a
/// strip running `strip_length` upwards from the pad.
///
/// The local x axis points away from the string axis, the origin is the pad
/// centre at `pad_center`.
fn cable(pad: [f64; 2], pad_center: f64, strip_radius: f64, strip_length: f64) -> Result<Shape> {
    let pad_end = pad[0] / 2.0;
    let link = strip_radius - CABLE_THICKNESS / 2.0 - (pad_center + pad_end);
    if link <= 0.0 {
        return Err(GeometryError::construction(format!(
            "rod radius {} leaves no room for the readout cables",
            strip_radius
        )));
    }
    Ok(Shape::cuboid(pad[0], pad[1], CABLE_THICKNESS)
        .union(
            Shape::cuboid(link, CABLE_WIDTH, CABLE_THICKNESS),
            Transform::translation(pad_end + link / 2.0, 0.0, 0.0),
        )
        .union(
            Shape::cuboid(CABLE_THICKNESS, CABLE_WIDTH, strip_length),
            Transform::translation(
                strip_radius - pad_center,
                0.0,
                (strip_length - CABLE_THICKNESS) / 2.0,
            ),
        ))
}

/// Clamp body with two arms reaching out past the ASIC
fn signal_clamp() -> Shape {
    let arm = || Shape::cuboid(9.0, 2.5, CLAMP_THICKNESS);
    Shape::cuboid(5.0, 13.0, CLAMP_THICKNESS)
        .union(arm(), Transform::translation(7.0, 5.25, 0.0))
        .union(arm(), Transform::translation(7.0, -5.25, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::test_support::{detail, generated};
    use crate::assembly::{cryostat, BuildInputs};
    use crate::detail::DetailLevel;
    use crate::geometry::{VolumeNode, VolumeRegistry};
    use crate::metadata::{dummy_detector_name, GeneratedMetadata, Production};
    use crate::placement::cold_length;

    fn build_strings(generated: &GeneratedMetadata, directive: BuildDirective) -> Result<VolumeRegistry> {
        let config = crate::config::BaseConfig::embedded().unwrap();
        let detail = detail(&config, DetailLevel::Radiogenic, None);
        let inputs = BuildInputs {
            config: &config,
            special_metadata: &generated.special_metadata,
            channelmap: &generated.channelmap,
            detail: &detail,
        };
        let mut builder = RegistryBuilder::new();
        builder
            .add_logical("world", Shape::cuboid(20_000.0, 20_000.0, 20_000.0), "vacuum")
            .unwrap();
        builder.set_world("world").unwrap();
        cryostat::build(&mut builder, BuildDirective::Simple, "world", Transform::default()).unwrap();
        build(&mut builder, &inputs, directive)?;
        builder.finish()
    }

    #[test]
    fn test_detector_positions() {
        let (_, generated) = generated();
        let registry = build_strings(&generated, BuildDirective::Detailed).unwrap();

        let first = registry.node(&dummy_detector_name(1, 1)).unwrap();
        let third = registry.node(&dummy_detector_name(1, 3)).unwrap();
        let height = 100.0;
        let spacing = cold_length(140.1);
        let bottom = |node: &VolumeNode| node.transform.translation[2] - height / 2.0;
        assert!((TOP_PLATE_Z - bottom(first) - spacing).abs() < 1e-9);
        assert!((TOP_PLATE_Z - bottom(third) - 3.0 * spacing).abs() < 1e-9);
        assert_eq!(first.transform.translation[0], third.transform.translation[0]);
        assert_eq!(
            first.detector,
            Some(ActiveDetector {
                kind: DetectorKind::Germanium,
                uid: 101
            })
        );
        assert_eq!(registry.logical(&first.logical).unwrap().material, "enriched_germanium_900");
    }

    #[test]
    fn test_detailed_string_parts() {
        let (_, generated) = generated();
        let registry = build_strings(&generated, BuildDirective::Metadata).unwrap();

        for name in ["string_1", "rod_1_0", "rod_1_1", "rod_1_2", "nms_1_upper", "nms_1_lower"] {
            assert!(registry.contains(name), "missing {}", name);
        }
        let pen = registry.node(&format!("pen_{}", dummy_detector_name(1, 1))).unwrap();
        assert_eq!(pen.logical, "pen_xlarge");
        assert!(registry
            .border_surfaces()
            .iter()
            .any(|s| s.name == format!("bsurface_lar_ge_{}", dummy_detector_name(1, 1))));
        assert!(registry.skin_surfaces().iter().any(|s| s.name == "ssurface_rod_1"));
    }

    #[test]
    fn test_readout_hardware() {
        let (_, generated) = generated();
        let registry = build_strings(&generated, BuildDirective::Metadata).unwrap();
        let name = dummy_detector_name(1, 2);

        for part in Readout::ALL {
            let entity = Entity::Readout {
                detector: &name,
                string: 1,
                part,
            };
            let node = registry.node(&entity.physical_name()).unwrap();
            assert_eq!(node.logical, entity.logical_name());
        }
        let material = |part: &str| registry.logical(&format!("{}_{}", name, part)).unwrap().material.clone();
        assert_eq!(material("signal_cable"), "metal_copper");
        assert_eq!(material("hv_clamp"), "ultem");
        assert_eq!(material("signal_asic"), "silica");

        // cable right below the baseplate, ASIC below the cable
        let pen = registry.node(&format!("pen_{}", name)).unwrap().transform.translation[2];
        let cable = registry
            .node(&format!("{}_hv_cable_string_1", name))
            .unwrap()
            .transform
            .translation[2];
        let asic = registry
            .node(&format!("{}_signal_asic_string_1", name))
            .unwrap()
            .transform
            .translation[2];
        assert!((pen - PEN_THICKNESS / 2.0 - CABLE_THICKNESS / 2.0 - cable).abs() < 1e-9);
        assert!((cable - CABLE_THICKNESS / 2.0 - ASIC_SIZE[2] / 2.0 - asic).abs() < 1e-9);

        let tristar = registry.node("tristar_xlarge_string_1").unwrap();
        assert_eq!(tristar.logical, "tristar_xlarge");
        assert_eq!(registry.logical("tristar_xlarge").unwrap().material, "pen");

        assert!(crate::export::find_overlaps(&registry).is_empty());
    }

    #[test]
    fn test_cable_needs_room() {
        assert!(cable(HV_PAD, HV_CENTER, 60.0, 100.0).is_ok());
        assert!(matches!(
            cable(HV_PAD, HV_CENTER, 40.0, 100.0),
            Err(GeometryError::Construction(_))
        ));
    }

    #[test]
    fn test_simple_string_parts() {
        let (_, generated) = generated();
        let registry = build_strings(&generated, BuildDirective::Simple).unwrap();
        assert!(registry.contains("top_copper_plate"));
        assert!(registry.contains("string_1"));
        assert!(registry.contains(&dummy_detector_name(1, 1)));
        assert!(!registry.contains("rod_1_0"));
        assert!(!registry.contains("nms_1_upper"));
        assert!(!registry.contains("tristar_xlarge_string_1"));
        assert!(!registry.contains(&format!("{}_signal_cable_string_1", dummy_detector_name(1, 1))));
        assert!(!registry.contains(&format!("{}_hv_clamp_string_1", dummy_detector_name(1, 1))));
        assert!(registry.border_surfaces().is_empty());
    }

    #[test]
    fn test_single_unit_string_has_one_shroud() {
        let (_, mut generated) = generated();
        generated
            .channelmap
            .retain(|_, c| !matches!(c.location, Location::Slot { string: 1, position } if position > 1));
        let registry = build_strings(&generated, BuildDirective::Detailed).unwrap();
        assert!(registry.contains("nms_1_upper"));
        assert!(!registry.contains("nms_1_lower"));
        assert!(registry.contains("nms_2_lower"));
    }

    #[test]
    fn test_position_gap_is_config_error() {
        let (_, mut generated) = generated();
        generated.channelmap.remove(&dummy_detector_name(1, 2));
        assert!(matches!(
            build_strings(&generated, BuildDirective::Simple),
            Err(GeometryError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_string_is_config_error() {
        let (_, mut generated) = generated();
        generated.special_metadata.hpge_strings.remove(&1);
        assert!(matches!(
            build_strings(&generated, BuildDirective::Simple),
            Err(GeometryError::Config(_))
        ));
    }

    #[test]
    fn test_missing_enrichment_uses_default() {
        let (_, mut generated) = generated();
        let name = dummy_detector_name(2, 1);
        generated.channelmap.get_mut(&name).unwrap().production = Some(Production::default());
        let registry = build_strings(&generated, BuildDirective::Simple).unwrap();
        assert_eq!(registry.logical(&name).unwrap().material, "enriched_germanium_860");
    }

    #[test]
    fn test_ortec_medium_plate() {
        let (_, generated) = generated();
        let channel = generated.channelmap[&dummy_detector_name(1, 1)].clone();
        let mut channel = ChannelEntry {
            name: "V01234A".to_string(),
            production: Some(Production {
                enrichment: Some(0.9),
                manufacturer: Some("Ortec".to_string()),
            }),
            ..channel
        };
        let meta = HpgeUnitMeta {
            rodlength_in_mm: 140.1,
            baseplate: Baseplate::Medium,
        };
        let geometry = channel.geometry.clone().unwrap();
        let unit = DetectorUnit {
            channel: &channel,
            position: 1,
            geometry: &geometry,
            meta: &meta,
        };
        assert_eq!(unit.pen_size(), Baseplate::MediumOrtec);

        channel.production = None;
        let unit = DetectorUnit {
            channel: &channel,
            position: 1,
            geometry: &geometry,
            meta: &meta,
        };
        assert_eq!(unit.pen_size(), Baseplate::Medium);
    }
}
