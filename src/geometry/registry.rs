//! The volume registry.
//!
//! Logical volumes (shape + material) are defined once and referenced by name
//! from any number of placements. A placement ([`VolumeNode`]) lives in the
//! frame of its mother logical volume. The registry is assembled through a
//! [`RegistryBuilder`], which owns the per-build name trackers; once
//! finished the registry is read-only.

use super::shapes::Shape;
use super::transform::Transform;
use crate::error::{GeometryError, Result};
use crate::naming::NameTracker;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub type Rgba = [f64; 4];

/// Visualization attributes of a logical volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisAttributes {
    Color(Rgba),
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalVolume {
    pub name: String,
    pub shape: Shape,
    pub material: String,
    pub vis: Option<VisAttributes>,
}

/// Kind of sensitive detector a placement is registered as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DetectorKind {
    Germanium,
    Optical,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Germanium => "Germanium",
            Self::Optical => "Optical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveDetector {
    pub kind: DetectorKind,
    pub uid: u32,
}

/// One physical placement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeNode {
    pub name: String,
    pub logical: String,
    /// Mother logical volume; `None` only for the world
    pub mother: Option<String>,
    pub transform: Transform,
    pub detector: Option<ActiveDetector>,
}

/// Optical surface between two placements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderSurface {
    pub name: String,
    pub property: String,
    pub from: String,
    pub to: String,
}

/// Optical surface wrapping every placement of a logical volume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkinSurface {
    pub name: String,
    pub property: String,
    pub logical: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRegistry {
    world: String,
    logical_volumes: BTreeMap<String, LogicalVolume>,
    nodes: BTreeMap<String, VolumeNode>,
    /// Node names in construction order
    order: Vec<String>,
    border_surfaces: Vec<BorderSurface>,
    skin_surfaces: Vec<SkinSurface>,
}

impl VolumeRegistry {
    /// The world node
    pub fn world(&self) -> Option<&VolumeNode> {
        self.nodes.get(&self.world)
    }

    pub fn world_name(&self) -> &str {
        &self.world
    }

    pub fn node(&self, name: &str) -> Option<&VolumeNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn logical(&self, name: &str) -> Option<&LogicalVolume> {
        self.logical_volumes.get(name)
    }

    /// Logical volume placed by a node
    pub fn logical_of(&self, node: &VolumeNode) -> Option<&LogicalVolume> {
        self.logical_volumes.get(&node.logical)
    }

    /// All nodes in construction order
    pub fn nodes(&self) -> impl Iterator<Item = &VolumeNode> + '_ {
        self.order.iter().filter_map(move |name| self.nodes.get(name))
    }

    /// Placements inside a logical volume, in construction order
    pub fn daughters<'a>(&'a self, mother: &'a str) -> impl Iterator<Item = &'a VolumeNode> + 'a {
        self.nodes()
            .filter(move |node| node.mother.as_deref() == Some(mother))
    }

    pub fn logical_volumes(&self) -> impl Iterator<Item = &LogicalVolume> + '_ {
        self.logical_volumes.values()
    }

    pub fn border_surfaces(&self) -> &[BorderSurface] {
        &self.border_surfaces
    }

    pub fn skin_surfaces(&self) -> &[SkinSurface] {
        &self.skin_surfaces
    }

    /// Nodes registered as sensitive detectors, in construction order
    pub fn detectors(&self) -> impl Iterator<Item = (&VolumeNode, ActiveDetector)> + '_ {
        self.nodes()
            .filter_map(|node| node.detector.map(|detector| (node, detector)))
    }

    /// Names of all materials referenced by logical volumes
    pub fn materials(&self) -> BTreeSet<&str> {
        self.logical_volumes
            .values()
            .map(|lv| lv.material.as_str())
            .collect()
    }

    /// Number of placements
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Collects volumes for one build.
///
/// Every name is claimed on its tracker as it is added, so a repeated name
/// fails at the point where it is produced.
#[derive(Debug)]
pub struct RegistryBuilder {
    physical_names: NameTracker,
    logical_names: NameTracker,
    surface_names: NameTracker,
    detector_uids: NameTracker,
    world: Option<String>,
    logical_volumes: BTreeMap<String, LogicalVolume>,
    nodes: BTreeMap<String, VolumeNode>,
    order: Vec<String>,
    border_surfaces: Vec<BorderSurface>,
    skin_surfaces: Vec<SkinSurface>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            physical_names: NameTracker::new("physical volume"),
            logical_names: NameTracker::new("logical volume"),
            surface_names: NameTracker::new("optical surface"),
            detector_uids: NameTracker::new("detector uid"),
            world: None,
            logical_volumes: BTreeMap::new(),
            nodes: BTreeMap::new(),
            order: Vec::new(),
            border_surfaces: Vec::new(),
            skin_surfaces: Vec::new(),
        }
    }

    /// Define a logical volume
    pub fn add_logical(&mut self, name: &str, shape: Shape, material: &str) -> Result<()> {
        shape
            .validate()
            .map_err(|e| GeometryError::construction(format!("logical volume '{}': {}", name, e)))?;
        self.logical_names.claim(name)?;
        self.logical_volumes.insert(
            name.to_string(),
            LogicalVolume {
                name: name.to_string(),
                shape,
                material: material.to_string(),
                vis: None,
            },
        );
        Ok(())
    }

    pub fn has_logical(&self, name: &str) -> bool {
        self.logical_volumes.contains_key(name)
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn set_vis(&mut self, logical: &str, vis: VisAttributes) -> Result<()> {
        let lv = self.logical_volumes.get_mut(logical).ok_or_else(|| {
            GeometryError::construction(format!("logical volume '{}' is not defined", logical))
        })?;
        lv.vis = Some(vis);
        Ok(())
    }

    /// Make a defined logical volume the world; its node carries the same name
    pub fn set_world(&mut self, logical: &str) -> Result<()> {
        if let Some(world) = &self.world {
            return Err(GeometryError::construction(format!(
                "world is already set to '{}'",
                world
            )));
        }
        self.require_logical(logical)?;
        self.physical_names.claim(logical)?;
        self.insert_node(VolumeNode {
            name: logical.to_string(),
            logical: logical.to_string(),
            mother: None,
            transform: Transform::default(),
            detector: None,
        });
        self.world = Some(logical.to_string());
        Ok(())
    }

    /// Place a logical volume into a mother logical volume
    pub fn place(&mut self, name: &str, logical: &str, mother: &str, transform: Transform) -> Result<()> {
        if !self.has_logical(mother) {
            return Err(GeometryError::construction(format!(
                "cannot place '{}': mother volume '{}' does not exist",
                name, mother
            )));
        }
        self.require_logical(logical)?;
        if logical == mother {
            return Err(GeometryError::construction(format!(
                "cannot place '{}' inside itself",
                logical
            )));
        }
        let finite = transform
            .rotation
            .iter()
            .chain(transform.translation.iter())
            .all(|v| v.is_finite());
        if !finite {
            return Err(GeometryError::construction(format!(
                "placement of '{}' has a non-finite transform",
                name
            )));
        }

        self.physical_names.claim(name)?;
        debug!("Placing '{}' ({}) in '{}'", name, logical, mother);
        self.insert_node(VolumeNode {
            name: name.to_string(),
            logical: logical.to_string(),
            mother: Some(mother.to_string()),
            transform,
            detector: None,
        });
        Ok(())
    }

    /// Register a placed volume as sensitive detector
    pub fn register_detector(&mut self, node: &str, detector: ActiveDetector) -> Result<()> {
        if !self.nodes.contains_key(node) {
            return Err(GeometryError::construction(format!(
                "cannot register unknown volume '{}' as detector",
                node
            )));
        }
        self.detector_uids.claim(&detector.uid.to_string())?;
        if let Some(entry) = self.nodes.get_mut(node) {
            entry.detector = Some(detector);
        }
        Ok(())
    }

    /// Add an optical surface between two placed volumes
    pub fn add_border_surface(&mut self, name: &str, property: &str, from: &str, to: &str) -> Result<()> {
        for volume in [from, to] {
            if !self.nodes.contains_key(volume) {
                return Err(GeometryError::construction(format!(
                    "border surface '{}' refers to unknown volume '{}'",
                    name, volume
                )));
            }
        }
        self.surface_names.claim(name)?;
        self.border_surfaces.push(BorderSurface {
            name: name.to_string(),
            property: property.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        });
        Ok(())
    }

    /// Add an optical surface around a logical volume
    pub fn add_skin_surface(&mut self, name: &str, property: &str, logical: &str) -> Result<()> {
        self.require_logical(logical)?;
        self.surface_names.claim(name)?;
        self.skin_surfaces.push(SkinSurface {
            name: name.to_string(),
            property: property.to_string(),
            logical: logical.to_string(),
        });
        Ok(())
    }

    pub fn finish(self) -> Result<VolumeRegistry> {
        let world = self
            .world
            .ok_or_else(|| GeometryError::construction("no world volume was defined"))?;

        let placed: BTreeSet<&str> = self.nodes.values().map(|n| n.logical.as_str()).collect();
        for name in self.logical_volumes.keys() {
            if !placed.contains(name.as_str()) {
                debug!("Logical volume '{}' is defined but never placed", name);
            }
        }

        Ok(VolumeRegistry {
            world,
            logical_volumes: self.logical_volumes,
            nodes: self.nodes,
            order: self.order,
            border_surfaces: self.border_surfaces,
            skin_surfaces: self.skin_surfaces,
        })
    }

    fn require_logical(&self, name: &str) -> Result<()> {
        if !self.has_logical(name) {
            return Err(GeometryError::construction(format!(
                "logical volume '{}' is not defined",
                name
            )));
        }
        Ok(())
    }

    fn insert_node(&mut self, node: VolumeNode) {
        self.order.push(node.name.clone());
        self.nodes.insert(node.name.clone(), node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_with_world() -> RegistryBuilder {
        let mut builder = RegistryBuilder::new();
        builder
            .add_logical("world", Shape::cuboid(1000.0, 1000.0, 1000.0), "vacuum")
            .unwrap();
        builder.set_world("world").unwrap();
        builder
    }

    #[test]
    fn test_shared_logical_with_distinct_placements() {
        let mut builder = builder_with_world();
        builder
            .add_logical("rod_1", Shape::cylinder(1.5, 100.0), "metal_copper")
            .unwrap();
        for i in 0..3 {
            builder
                .place(
                    &format!("rod_1_{}", i),
                    "rod_1",
                    "world",
                    Transform::translation(10.0 * i as f64, 0.0, 0.0),
                )
                .unwrap();
        }
        let registry = builder.finish().unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.daughters("world").count(), 3);
        assert!(registry.daughters("world").all(|n| n.logical == "rod_1"));
        assert_eq!(registry.world().unwrap().mother, None);
        assert!(registry.materials().contains("metal_copper"));
    }

    #[test]
    fn test_duplicate_physical_name() {
        let mut builder = builder_with_world();
        builder.add_logical("box", Shape::cuboid(1.0, 1.0, 1.0), "vacuum").unwrap();
        builder.place("a", "box", "world", Transform::default()).unwrap();
        let err = builder.place("a", "box", "world", Transform::default()).unwrap_err();
        assert!(matches!(err, GeometryError::NamingConflict { .. }));
    }

    #[test]
    fn test_duplicate_logical_name() {
        let mut builder = builder_with_world();
        builder.add_logical("box", Shape::cuboid(1.0, 1.0, 1.0), "vacuum").unwrap();
        let err = builder
            .add_logical("box", Shape::cuboid(2.0, 1.0, 1.0), "vacuum")
            .unwrap_err();
        assert!(matches!(err, GeometryError::NamingConflict { .. }));
    }

    #[test]
    fn test_missing_mother_is_construction_error() {
        let mut builder = builder_with_world();
        builder.add_logical("box", Shape::cuboid(1.0, 1.0, 1.0), "vacuum").unwrap();
        let err = builder
            .place("a", "box", "tank_water", Transform::default())
            .unwrap_err();
        assert!(matches!(err, GeometryError::Construction(_)));
    }

    #[test]
    fn test_degenerate_shape_is_construction_error() {
        let mut builder = builder_with_world();
        let err = builder
            .add_logical("flat", Shape::cylinder(10.0, 0.0), "vacuum")
            .unwrap_err();
        assert!(matches!(err, GeometryError::Construction(_)));
        assert!(!builder.has_logical("flat"));
    }

    #[test]
    fn test_detector_uid_unique() {
        let mut builder = builder_with_world();
        builder.add_logical("det", Shape::cylinder(10.0, 10.0), "enriched_germanium").unwrap();
        builder.place("V00001A", "det", "world", Transform::default()).unwrap();
        builder.place("V00002A", "det", "world", Transform::translation(0.0, 0.0, 50.0)).unwrap();
        let detector = ActiveDetector {
            kind: DetectorKind::Germanium,
            uid: 101,
        };
        builder.register_detector("V00001A", detector).unwrap();
        assert!(builder.register_detector("V00002A", detector).is_err());
    }

    #[test]
    fn test_surfaces() {
        let mut builder = builder_with_world();
        builder.add_logical("box", Shape::cuboid(1.0, 1.0, 1.0), "vacuum").unwrap();
        builder.place("a", "box", "world", Transform::default()).unwrap();
        builder
            .add_border_surface("bsurface_world_a", "surface_vacuum_to_vacuum", "world", "a")
            .unwrap();
        assert!(builder
            .add_border_surface("bsurface_world_b", "surface_vacuum_to_vacuum", "world", "b")
            .is_err());
        builder.add_skin_surface("ssurface_box", "surface_box", "box").unwrap();
        assert!(matches!(
            builder.add_skin_surface("ssurface_box", "surface_box", "box"),
            Err(GeometryError::NamingConflict { .. })
        ));
        let registry = builder.finish().unwrap();
        assert_eq!(registry.border_surfaces().len(), 1);
        assert_eq!(registry.skin_surfaces().len(), 1);
    }

    #[test]
    fn test_finish_requires_world() {
        let builder = RegistryBuilder::new();
        assert!(matches!(builder.finish(), Err(GeometryError::Construction(_))));
    }
}
