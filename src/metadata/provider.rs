//! External detector metadata.
//!
//! The generator only sees the [`DetectorProvider`] capability; where the
//! records come from is up to the implementation.

use super::types::DetectorGeometry;
use crate::error::{GeometryError, Result};
use log::info;
use std::collections::BTreeMap;
use std::path::Path;

/// Source of real detector geometries
pub trait DetectorProvider {
    /// Look up the record of one detector by its metadata name
    fn lookup_detector(&self, name: &str) -> Result<DetectorGeometry>;
}

/// Detector records held in memory, optionally read from a JSON file.
///
/// The file maps detector names to records with `system`, `geometry` and
/// `production` keys; a channelmap file has that shape as well.
#[derive(Debug, Clone, Default)]
pub struct DetectorDatabase {
    records: BTreeMap<String, DetectorGeometry>,
}

impl DetectorDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, record: DetectorGeometry) {
        self.records.insert(name.into(), record);
    }

    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading detector database from: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| GeometryError::io(path, e))?;
        let records: BTreeMap<String, DetectorGeometry> = serde_json::from_str(&content)?;
        info!("Detector database holds {} records", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DetectorProvider for DetectorDatabase {
    fn lookup_detector(&self, name: &str) -> Result<DetectorGeometry> {
        self.records
            .get(name)
            .cloned()
            .ok_or_else(|| GeometryError::config(format!("detector '{}' not found in metadata", name)))
    }
}
