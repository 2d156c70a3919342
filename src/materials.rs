//! Material and optical surface catalog.
//!
//! Volumes refer to materials by name only. The catalog maps these names onto
//! Geant4 NIST materials or simple compounds, and holds the optical surface
//! properties referenced by border and skin surfaces. An optics plugin file
//! (YAML or JSON) can add entries or replace the built-in ones.
//!
//! Enriched germanium is not listed; names of the form
//! `enriched_germanium_{permille}` resolve to a Ge-76/Ge-74 mixture.

use crate::error::{GeometryError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const GERMANIUM_PREFIX: &str = "enriched_germanium_";

/// Density of natural germanium in g/cm3
const NATURAL_GERMANIUM_DENSITY: f64 = 5.323;
const NATURAL_GERMANIUM_MOLAR_MASS: f64 = 72.630;

/// Isotope data: (name, neutrons + protons, molar mass in g/mole)
pub const GE76: (&str, u32, f64) = ("Ge76", 76, 75.921_402_7);
pub const GE74: (&str, u32, f64) = ("Ge74", 74, 73.921_177_8);

/// Element data for compounds: symbol, atomic number, molar mass in g/mole
const ELEMENTS: [(&str, u32, f64); 12] = [
    ("H", 1, 1.008),
    ("B", 5, 10.81),
    ("C", 6, 12.011),
    ("N", 7, 14.007),
    ("O", 8, 15.999),
    ("Na", 11, 22.990),
    ("Al", 13, 26.982),
    ("Si", 14, 28.085),
    ("Ar", 18, 39.948),
    ("Fe", 26, 55.845),
    ("Cu", 29, 63.546),
    ("Ge", 32, 72.630),
];

/// Atomic number and molar mass of a chemical element
pub fn element(symbol: &str) -> Option<(u32, f64)> {
    ELEMENTS
        .iter()
        .find(|(s, _, _)| *s == symbol)
        .map(|(_, z, a)| (*z, *a))
}

/// Name of the germanium material with the given Ge-76 fraction
pub fn germanium_material(enrichment: f64) -> Result<String> {
    if !(0.0..=1.0).contains(&enrichment) {
        return Err(GeometryError::config(format!(
            "enrichment must be within [0, 1], got {}",
            enrichment
        )));
    }
    Ok(format!("{}{:03}", GERMANIUM_PREFIX, (enrichment * 1000.0).round() as u32))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialDef {
    /// Material of the Geant4 NIST database
    Nist { nist: String },
    /// Compound given by the number of atoms per molecule
    Compound {
        density_in_g_cm3: f64,
        composition: BTreeMap<String, u32>,
    },
    /// Germanium with the given Ge-76 mass fraction, the rest Ge-74
    EnrichedGermanium { enrichment: f64 },
}

impl MaterialDef {
    fn nist(name: &str) -> Self {
        Self::Nist {
            nist: name.to_string(),
        }
    }

    fn compound(density_in_g_cm3: f64, atoms: &[(&str, u32)]) -> Self {
        Self::Compound {
            density_in_g_cm3,
            composition: atoms.iter().map(|(s, n)| (s.to_string(), *n)).collect(),
        }
    }

    /// Molar mass of the germanium mixture
    pub fn germanium_molar_mass(enrichment: f64) -> f64 {
        1.0 / (enrichment / GE76.2 + (1.0 - enrichment) / GE74.2)
    }

    /// Density in g/cm3; `None` for NIST materials
    pub fn density_in_g_cm3(&self) -> Option<f64> {
        match self {
            Self::Nist { .. } => None,
            Self::Compound { density_in_g_cm3, .. } => Some(*density_in_g_cm3),
            // the atom density of germanium does not depend on the isotopes
            Self::EnrichedGermanium { enrichment } => Some(
                NATURAL_GERMANIUM_DENSITY * Self::germanium_molar_mass(*enrichment)
                    / NATURAL_GERMANIUM_MOLAR_MASS,
            ),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        match self {
            Self::Nist { nist } => {
                if !nist.starts_with("G4_") {
                    return Err(GeometryError::config(format!(
                        "material '{}': '{}' is not a NIST material name",
                        name, nist
                    )));
                }
            }
            Self::Compound {
                density_in_g_cm3,
                composition,
            } => {
                if !(density_in_g_cm3.is_finite() && *density_in_g_cm3 > 0.0) {
                    return Err(GeometryError::config(format!(
                        "material '{}' needs a positive density",
                        name
                    )));
                }
                if composition.is_empty() || composition.values().any(|n| *n == 0) {
                    return Err(GeometryError::config(format!(
                        "material '{}' has an empty composition",
                        name
                    )));
                }
                if let Some(symbol) = composition.keys().find(|s| element(s).is_none()) {
                    return Err(GeometryError::config(format!(
                        "material '{}' uses unknown element '{}'",
                        name, symbol
                    )));
                }
            }
            Self::EnrichedGermanium { enrichment } => {
                germanium_material(*enrichment)?;
            }
        }
        Ok(())
    }
}

/// Geant4 optical surface parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalSurfaceDef {
    pub model: String,
    pub finish: String,
    #[serde(rename = "type")]
    pub surface_type: String,
    pub value: f64,
}

impl OpticalSurfaceDef {
    fn new(finish: &str, surface_type: &str, value: f64) -> Self {
        Self {
            model: "unified".to_string(),
            finish: finish.to_string(),
            surface_type: surface_type.to_string(),
            value,
        }
    }
}

/// Contents of an optics plugin file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpticsPlugin {
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDef>,
    #[serde(default)]
    pub surfaces: BTreeMap<String, OpticalSurfaceDef>,
}

impl OpticsPlugin {
    /// Read a plugin file; `.yaml`/`.yml` files are YAML, anything else JSON
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading optics plugin from: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| GeometryError::io(path, e))?;
        let plugin: OpticsPlugin = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Ok(plugin)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialCatalog {
    materials: BTreeMap<String, MaterialDef>,
    surfaces: BTreeMap<String, OpticalSurfaceDef>,
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl MaterialCatalog {
    /// Catalog with every material and surface the assemblies use
    pub fn standard() -> Self {
        let materials = [
            ("vacuum", MaterialDef::nist("G4_Galactic")),
            ("rock", MaterialDef::nist("G4_CONCRETE")),
            ("water", MaterialDef::nist("G4_WATER")),
            ("liquidargon", MaterialDef::nist("G4_lAr")),
            ("metal_steel", MaterialDef::nist("G4_STAINLESS-STEEL")),
            ("metal_copper", MaterialDef::nist("G4_Cu")),
            ("pmma", MaterialDef::nist("G4_PLEXIGLASS")),
            ("nylon", MaterialDef::nist("G4_NYLON-6-6")),
            ("tetratex", MaterialDef::nist("G4_TEFLON")),
            ("tyvek", MaterialDef::nist("G4_POLYETHYLENE")),
            ("borosilicate", MaterialDef::nist("G4_Pyrex_Glass")),
            ("epoxy", MaterialDef::compound(1.2, &[("C", 21), ("H", 25), ("O", 5)])),
            ("pen", MaterialDef::compound(1.36, &[("C", 14), ("H", 10), ("O", 4)])),
            ("tpb", MaterialDef::compound(1.08, &[("C", 28), ("H", 22)])),
            ("ultem", MaterialDef::compound(1.27, &[("C", 37), ("H", 24), ("N", 2), ("O", 6)])),
            ("silica", MaterialDef::nist("G4_SILICON_DIOXIDE")),
        ]
        .into_iter()
        .map(|(name, def)| (name.to_string(), def))
        .collect();

        let surfaces = [
            (
                "surface_lar_to_germanium",
                OpticalSurfaceDef::new("ground", "dielectric_metal", 0.3),
            ),
            (
                "surface_lar_to_pen",
                OpticalSurfaceDef::new("ground", "dielectric_dielectric", 0.5),
            ),
            (
                "surface_lar_to_tpb",
                OpticalSurfaceDef::new("ground", "dielectric_dielectric", 0.3),
            ),
            (
                "surface_tpb_to_tetratex",
                OpticalSurfaceDef::new("groundfrontpainted", "dielectric_dielectric", 0.5),
            ),
            (
                "surface_lar_to_metal_copper",
                OpticalSurfaceDef::new("ground", "dielectric_metal", 0.5),
            ),
        ]
        .into_iter()
        .map(|(name, def)| (name.to_string(), def))
        .collect();

        Self { materials, surfaces }
    }

    /// Add or replace the entries of a plugin
    pub fn extend(&mut self, plugin: OpticsPlugin) -> Result<()> {
        for (name, def) in plugin.materials {
            def.validate(&name)?;
            if self.materials.insert(name.clone(), def).is_some() {
                debug!("Optics plugin replaces material '{}'", name);
            }
        }
        for (name, def) in plugin.surfaces {
            if self.surfaces.insert(name.clone(), def).is_some() {
                debug!("Optics plugin replaces surface '{}'", name);
            }
        }
        Ok(())
    }

    /// Definition of a material by name
    pub fn resolve(&self, name: &str) -> Result<MaterialDef> {
        if let Some(def) = self.materials.get(name) {
            return Ok(def.clone());
        }
        name.strip_prefix(GERMANIUM_PREFIX)
            .and_then(|permille| permille.parse::<u32>().ok())
            .filter(|permille| *permille <= 1000)
            .map(|permille| MaterialDef::EnrichedGermanium {
                enrichment: f64::from(permille) / 1000.0,
            })
            .ok_or_else(|| GeometryError::config(format!("material '{}' is not defined", name)))
    }

    pub fn surface(&self, name: &str) -> Result<&OpticalSurfaceDef> {
        self.surfaces
            .get(name)
            .ok_or_else(|| GeometryError::config(format!("optical surface '{}' is not defined", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_standard_materials() {
        let catalog = MaterialCatalog::standard();
        assert_eq!(
            catalog.resolve("metal_copper").unwrap(),
            MaterialDef::Nist {
                nist: "G4_Cu".to_string()
            }
        );
        assert!(catalog.resolve("liquidargon").is_ok());
        assert!(matches!(catalog.resolve("ultem").unwrap(), MaterialDef::Compound { .. }));
        assert!(catalog.resolve("silica").is_ok());
        assert!(catalog.surface("surface_lar_to_tpb").is_ok());
        assert!(matches!(catalog.resolve("unobtainium"), Err(GeometryError::Config(_))));
    }

    #[test]
    fn test_germanium_names() {
        assert_eq!(germanium_material(0.86).unwrap(), "enriched_germanium_860");
        assert_eq!(germanium_material(0.9).unwrap(), "enriched_germanium_900");
        assert!(germanium_material(1.2).is_err());

        let catalog = MaterialCatalog::standard();
        let def = catalog.resolve("enriched_germanium_860").unwrap();
        assert_eq!(def, MaterialDef::EnrichedGermanium { enrichment: 0.86 });
        let density = def.density_in_g_cm3().unwrap();
        assert!(density > 5.4 && density < 5.6, "{}", density);
        assert!(catalog.resolve("enriched_germanium_1500").is_err());
    }

    #[test]
    fn test_plugin_extends_catalog() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
materials:
  tyvek:
    density_in_g_cm3: 0.38
    composition: {{C: 2, H: 4}}
  lead:
    nist: G4_Pb
surfaces:
  surface_lar_to_tpb:
    model: unified
    finish: polished
    type: dielectric_dielectric
    value: 1.0
"#
        )
        .unwrap();

        let plugin = OpticsPlugin::load(file.path()).unwrap();
        let mut catalog = MaterialCatalog::standard();
        catalog.extend(plugin).unwrap();

        assert_eq!(catalog.resolve("tyvek").unwrap().density_in_g_cm3(), Some(0.38));
        assert!(catalog.resolve("lead").is_ok());
        assert_eq!(catalog.surface("surface_lar_to_tpb").unwrap().finish, "polished");
    }

    #[test]
    fn test_plugin_rejects_unknown_elements() {
        let mut plugin = OpticsPlugin::default();
        plugin.materials.insert(
            "mystery".to_string(),
            MaterialDef::Compound {
                density_in_g_cm3: 1.0,
                composition: [("Xx".to_string(), 1)].into_iter().collect(),
            },
        );
        let mut catalog = MaterialCatalog::standard();
        assert!(matches!(catalog.extend(plugin), Err(GeometryError::Config(_))));
    }
}
