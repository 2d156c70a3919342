//! GDML writer.
//!
//! Writes the structure of a registry: materials resolved through the
//! [`MaterialCatalog`], one solid per logical volume, the volume tree with
//! its placements and the optical surfaces. Volumes are written daughters
//! first, so every reference points backwards.
//!
//! Geant4 inverts the rotation it reads for a physvol or a boolean operand.
//! Rotations in the registry are the active rotations of the daughter, so
//! the inverse is written.

use crate::error::{GeometryError, Result};
use crate::geometry::{euler_angles, Shape, Transform, VolumeRegistry};
use crate::materials::{element, MaterialCatalog, MaterialDef, GE74, GE76};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gdml xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:noNamespaceSchemaLocation="http://service-spi.web.cern.ch/service-spi/app/releases/GDML/schema/gdml.xsd">
"#;

/// Format a number, without a negative zero
fn num(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

/// Euler angles Geant4 has to read to end up with `rotation`
pub fn gdml_rotation(rotation: [f64; 3]) -> [f64; 3] {
    euler_angles(&Transform::new(rotation, [0.0; 3]).rotation_matrix().inverse())
}

/// Logical volumes reachable from the world, daughters before mothers
fn volume_order(registry: &VolumeRegistry) -> Vec<String> {
    fn visit(registry: &VolumeRegistry, logical: &str, seen: &mut BTreeSet<String>, order: &mut Vec<String>) {
        if !seen.insert(logical.to_string()) {
            return;
        }
        for daughter in registry.daughters(logical) {
            visit(registry, &daughter.logical, seen, order);
        }
        order.push(logical.to_string());
    }

    let mut seen = BTreeSet::new();
    let mut order = Vec::new();
    visit(registry, registry.world_name(), &mut seen, &mut order);
    order
}

struct GdmlWriter<'a> {
    registry: &'a VolumeRegistry,
    catalog: &'a MaterialCatalog,
    out: String,
}

impl GdmlWriter<'_> {
    fn write_materials(&mut self, volumes: &[String]) -> Result<BTreeMap<String, String>> {
        let registry = self.registry;
        let used: BTreeSet<&str> = volumes
            .iter()
            .filter_map(|name| registry.logical(name))
            .map(|lv| lv.material.as_str())
            .collect();

        let mut definitions = Vec::new();
        for name in used {
            definitions.push((name.to_string(), self.catalog.resolve(name)?));
        }

        let mut elements = BTreeSet::new();
        let mut germanium = false;
        for (_, def) in &definitions {
            match def {
                MaterialDef::Compound { composition, .. } => elements.extend(composition.keys().cloned()),
                MaterialDef::EnrichedGermanium { .. } => germanium = true,
                MaterialDef::Nist { .. } => {}
            }
        }

        self.out.push_str("  <materials>\n");
        if germanium {
            for (name, n, molar_mass) in [GE76, GE74] {
                self.out.push_str(&format!(
                    "    <isotope name=\"{}\" Z=\"32\" N=\"{}\"><atom unit=\"g/mole\" value=\"{}\"/></isotope>\n",
                    name, n, molar_mass
                ));
            }
        }
        for symbol in &elements {
            let (z, molar_mass) = element(symbol)
                .ok_or_else(|| GeometryError::config(format!("unknown element '{}'", symbol)))?;
            self.out.push_str(&format!(
                "    <element name=\"{0}\" formula=\"{0}\" Z=\"{1}\"><atom unit=\"g/mole\" value=\"{2}\"/></element>\n",
                symbol, z, molar_mass
            ));
        }

        let mut references = BTreeMap::new();
        for (name, def) in &definitions {
            let density = def.density_in_g_cm3();
            match def {
                MaterialDef::Nist { nist } => {
                    references.insert(name.clone(), nist.clone());
                    continue;
                }
                MaterialDef::EnrichedGermanium { enrichment } => {
                    self.out.push_str(&format!(
                        "    <element name=\"{0}_element\"><fraction ref=\"{1}\" n=\"{2}\"/><fraction ref=\"{3}\" n=\"{4}\"/></element>\n",
                        name,
                        GE76.0,
                        num(*enrichment),
                        GE74.0,
                        num(1.0 - enrichment)
                    ));
                    self.out.push_str(&format!("    <material name=\"{}\" state=\"solid\">\n", name));
                    self.write_density(density);
                    self.out
                        .push_str(&format!("      <fraction ref=\"{}_element\" n=\"1\"/>\n", name));
                }
                MaterialDef::Compound { composition, .. } => {
                    self.out.push_str(&format!("    <material name=\"{}\" state=\"solid\">\n", name));
                    self.write_density(density);
                    for (symbol, count) in composition {
                        self.out
                            .push_str(&format!("      <composite ref=\"{}\" n=\"{}\"/>\n", symbol, count));
                    }
                }
            }
            self.out.push_str("    </material>\n");
            references.insert(name.clone(), name.clone());
        }
        self.out.push_str("  </materials>\n");
        Ok(references)
    }

    fn write_density(&mut self, density: Option<f64>) {
        if let Some(density) = density {
            self.out
                .push_str(&format!("      <D unit=\"g/cm3\" value=\"{}\"/>\n", num(density)));
        }
    }

    fn write_solids(&mut self, volumes: &[String]) -> Result<()> {
        let registry = self.registry;
        self.out.push_str("  <solids>\n");
        for name in volumes {
            if let Some(lv) = registry.logical(name) {
                self.write_solid(&format!("{}_solid", name), &lv.shape);
            }
        }

        let properties: BTreeSet<&str> = registry
            .border_surfaces()
            .iter()
            .map(|s| s.property.as_str())
            .chain(registry.skin_surfaces().iter().map(|s| s.property.as_str()))
            .collect();
        for property in properties {
            let surface = self.catalog.surface(property)?;
            self.out.push_str(&format!(
                "    <opticalsurface name=\"{}\" model=\"{}\" finish=\"{}\" type=\"{}\" value=\"{}\"/>\n",
                property,
                surface.model,
                surface.finish,
                surface.surface_type,
                num(surface.value)
            ));
        }
        self.out.push_str("  </solids>\n");
        Ok(())
    }

    fn write_solid(&mut self, name: &str, shape: &Shape) {
        let line = match shape {
            Shape::Box { x, y, z } => format!(
                "<box name=\"{}\" x=\"{}\" y=\"{}\" z=\"{}\" lunit=\"mm\"/>",
                name,
                num(*x),
                num(*y),
                num(*z)
            ),
            Shape::Tubs {
                rmin,
                rmax,
                z,
                sphi,
                dphi,
            } => format!(
                "<tube name=\"{}\" rmin=\"{}\" rmax=\"{}\" z=\"{}\" startphi=\"{}\" deltaphi=\"{}\" aunit=\"rad\" lunit=\"mm\"/>",
                name,
                num(*rmin),
                num(*rmax),
                num(*z),
                num(*sphi),
                num(*dphi)
            ),
            Shape::GenericPolycone { sphi, dphi, r, z } => {
                let mut text = format!(
                    "<genericPolycone name=\"{}\" startphi=\"{}\" deltaphi=\"{}\" aunit=\"rad\" lunit=\"mm\">\n",
                    name,
                    num(*sphi),
                    num(*dphi)
                );
                for (r, z) in r.iter().zip(z) {
                    text.push_str(&format!("      <rzpoint r=\"{}\" z=\"{}\"/>\n", num(*r), num(*z)));
                }
                text.push_str("    </genericPolycone>");
                text
            }
            Shape::Polyhedra {
                sphi,
                dphi,
                num_side,
                z,
                rmin,
                rmax,
            } => {
                let mut text = format!(
                    "<polyhedra name=\"{}\" startphi=\"{}\" deltaphi=\"{}\" numsides=\"{}\" aunit=\"rad\" lunit=\"mm\">\n",
                    name,
                    num(*sphi),
                    num(*dphi),
                    num_side
                );
                for ((z, rmin), rmax) in z.iter().zip(rmin).zip(rmax) {
                    text.push_str(&format!(
                        "      <zplane z=\"{}\" rmin=\"{}\" rmax=\"{}\"/>\n",
                        num(*z),
                        num(*rmin),
                        num(*rmax)
                    ));
                }
                text.push_str("    </polyhedra>");
                text
            }
            Shape::Ellipsoid {
                ax,
                by,
                cz,
                zcut1,
                zcut2,
            } => format!(
                "<ellipsoid name=\"{}\" ax=\"{}\" by=\"{}\" cz=\"{}\" zcut1=\"{}\" zcut2=\"{}\" lunit=\"mm\"/>",
                name,
                num(*ax),
                num(*by),
                num(*cz),
                num(*zcut1),
                num(*zcut2)
            ),
            Shape::EllipticalTube { dx, dy, dz } => format!(
                "<eltube name=\"{}\" dx=\"{}\" dy=\"{}\" dz=\"{}\" lunit=\"mm\"/>",
                name,
                num(*dx),
                num(*dy),
                num(*dz)
            ),
            Shape::Boolean {
                op,
                first,
                second,
                transform,
            } => {
                let first_name = format!("{}_first", name);
                let second_name = format!("{}_second", name);
                self.write_solid(&first_name, first);
                self.write_solid(&second_name, second);
                let mut text = format!(
                    "<{} name=\"{}\">\n      <first ref=\"{}\"/>\n      <second ref=\"{}\"/>\n",
                    op.as_str(),
                    name,
                    first_name,
                    second_name
                );
                text.push_str(&placement(name, transform, "      "));
                text.push_str(&format!("    </{}>", op.as_str()));
                text
            }
        };
        self.out.push_str("    ");
        self.out.push_str(&line);
        self.out.push('\n');
    }

    fn write_structure(&mut self, volumes: &[String], materials: &BTreeMap<String, String>) -> Result<()> {
        let registry = self.registry;
        self.out.push_str("  <structure>\n");
        for name in volumes {
            let lv = registry
                .logical(name)
                .ok_or_else(|| GeometryError::construction(format!("logical volume '{}' is missing", name)))?;
            let material = materials
                .get(&lv.material)
                .ok_or_else(|| GeometryError::config(format!("material '{}' is not defined", lv.material)))?;

            self.out.push_str(&format!("    <volume name=\"{}\">\n", name));
            self.out
                .push_str(&format!("      <materialref ref=\"{}\"/>\n", material));
            self.out
                .push_str(&format!("      <solidref ref=\"{}_solid\"/>\n", name));
            for node in registry.daughters(name) {
                self.out.push_str(&format!("      <physvol name=\"{}\">\n", node.name));
                self.out
                    .push_str(&format!("        <volumeref ref=\"{}\"/>\n", node.logical));
                self.out
                    .push_str(&placement(&node.name, &node.transform, "        "));
                self.out.push_str("      </physvol>\n");
            }
            self.out.push_str("    </volume>\n");
        }

        for surface in registry.border_surfaces() {
            self.out.push_str(&format!(
                "    <bordersurface name=\"{}\" surfaceproperty=\"{}\">\n      <physvolref ref=\"{}\"/>\n      <physvolref ref=\"{}\"/>\n    </bordersurface>\n",
                surface.name, surface.property, surface.from, surface.to
            ));
        }
        for surface in registry.skin_surfaces() {
            self.out.push_str(&format!(
                "    <skinsurface name=\"{}\" surfaceproperty=\"{}\">\n      <volumeref ref=\"{}\"/>\n    </skinsurface>\n",
                surface.name, surface.property, surface.logical
            ));
        }
        self.out.push_str("  </structure>\n");
        Ok(())
    }
}

/// Inline position and rotation elements of a placement
fn placement(name: &str, transform: &Transform, indent: &str) -> String {
    let [x, y, z] = transform.translation;
    let mut text = format!(
        "{}<position name=\"{}_pos\" x=\"{}\" y=\"{}\" z=\"{}\" unit=\"mm\"/>\n",
        indent,
        name,
        num(x),
        num(y),
        num(z)
    );
    if transform.is_rotated() {
        let [a, b, c] = gdml_rotation(transform.rotation);
        text.push_str(&format!(
            "{}<rotation name=\"{}_rot\" x=\"{}\" y=\"{}\" z=\"{}\" unit=\"rad\"/>\n",
            indent,
            name,
            num(a),
            num(b),
            num(c)
        ));
    }
    text
}

/// Render a registry as a GDML document
pub fn to_gdml(registry: &VolumeRegistry, catalog: &MaterialCatalog) -> Result<String> {
    let volumes = volume_order(registry);
    debug!("Writing {} logical volumes", volumes.len());

    let mut writer = GdmlWriter {
        registry,
        catalog,
        out: String::from(HEADER),
    };
    writer.out.push_str("  <define/>\n");
    let materials = writer.write_materials(&volumes)?;
    writer.write_solids(&volumes)?;
    writer.write_structure(&volumes, &materials)?;
    writer.out.push_str(&format!(
        "  <setup name=\"Default\" version=\"1.0\">\n    <world ref=\"{}\"/>\n  </setup>\n</gdml>\n",
        registry.world_name()
    ));
    Ok(writer.out)
}

pub fn write_gdml(registry: &VolumeRegistry, catalog: &MaterialCatalog, path: &Path) -> Result<()> {
    let content = to_gdml(registry, catalog)?;
    std::fs::write(path, content).map_err(|e| GeometryError::io(path, e))?;
    info!("Wrote geometry to: {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RegistryBuilder;

    fn sample() -> VolumeRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .add_logical("world", Shape::cuboid(1000.0, 1000.0, 1000.0), "vacuum")
            .unwrap();
        builder.set_world("world").unwrap();
        builder
            .add_logical(
                "lar",
                Shape::cylinder(300.0, 400.0).subtract(
                    Shape::cuboid(10.0, 10.0, 10.0),
                    Transform::new([0.0, 0.0, 0.5], [0.0, 0.0, 200.0]),
                ),
                "liquidargon",
            )
            .unwrap();
        builder.place("lar", "lar", "world", Transform::default()).unwrap();
        builder
            .add_logical("V01234A", Shape::cylinder(40.0, 80.0), "enriched_germanium_900")
            .unwrap();
        builder
            .place(
                "V01234A",
                "V01234A",
                "lar",
                Transform::new([0.0, 0.0, 0.5], [10.0, 0.0, -50.0]),
            )
            .unwrap();
        builder.add_logical("pen_small", Shape::cylinder(20.0, 2.4), "pen").unwrap();
        builder
            .place("pen_V01234A", "pen_small", "lar", Transform::translation(10.0, 0.0, -95.0))
            .unwrap();
        builder
            .add_border_surface("bsurface_lar_pen_pen_V01234A", "surface_lar_to_pen", "lar", "pen_V01234A")
            .unwrap();
        builder
            .add_skin_surface("ssurface_pen_small", "surface_lar_to_pen", "pen_small")
            .unwrap();
        builder.finish().unwrap()
    }

    #[test]
    fn test_document_sections() {
        let gdml = to_gdml(&sample(), &MaterialCatalog::standard()).unwrap();
        assert!(gdml.starts_with("<?xml"));
        assert!(gdml.trim_end().ends_with("</gdml>"));
        assert!(gdml.contains("<materialref ref=\"G4_lAr\"/>"));
        assert!(gdml.contains("<materialref ref=\"G4_Galactic\"/>"));
        assert!(gdml.contains("<isotope name=\"Ge76\""));
        assert!(gdml.contains("<composite ref=\"C\" n=\"14\"/>"));
        assert!(gdml.contains("<subtraction name=\"lar_solid\">"));
        assert!(gdml.contains("<opticalsurface name=\"surface_lar_to_pen\""));
        assert!(gdml.contains("<bordersurface name=\"bsurface_lar_pen_pen_V01234A\""));
        assert!(gdml.contains("<world ref=\"world\"/>"));
        assert_eq!(gdml.matches("<physvol ").count(), 3);
    }

    #[test]
    fn test_daughters_written_first() {
        let gdml = to_gdml(&sample(), &MaterialCatalog::standard()).unwrap();
        let position = |needle: &str| gdml.find(needle).unwrap();
        assert!(position("<volume name=\"V01234A\">") < position("<volume name=\"lar\">"));
        assert!(position("<volume name=\"lar\">") < position("<volume name=\"world\">"));
        assert!(position("<subtraction name=\"lar_solid\">") > position("name=\"lar_solid_second\""));
    }

    #[test]
    fn test_rotation_is_inverted() {
        let gdml = to_gdml(&sample(), &MaterialCatalog::standard()).unwrap();
        let start = gdml.find("<rotation name=\"V01234A_rot\" x=\"0\" y=\"0\" z=\"").unwrap();
        let rest = &gdml[start..];
        let value = rest.split('"').nth(7).unwrap();
        assert!((value.parse::<f64>().unwrap() + 0.5).abs() < 1e-12, "{}", value);
        assert!(!gdml.contains("pen_V01234A_rot"));

        let euler = [0.3, -0.2, 1.1];
        let back = gdml_rotation(gdml_rotation(euler));
        for i in 0..3 {
            assert!((euler[i] - back[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_unknown_material_fails() {
        let mut builder = RegistryBuilder::new();
        builder
            .add_logical("world", Shape::cuboid(1000.0, 1000.0, 1000.0), "unobtainium")
            .unwrap();
        builder.set_world("world").unwrap();
        let registry = builder.finish().unwrap();
        assert!(matches!(
            to_gdml(&registry, &MaterialCatalog::standard()),
            Err(GeometryError::Config(_))
        ));
    }
}
