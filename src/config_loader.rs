use crate::config::{BaseConfig, ConfigOverride};
use crate::error::{GeometryError, Result};
use crate::metadata::{read_channelmap, Channelmap, GeneratedMetadata, SpecialMetadata};
use log::{debug, info};
use std::fs::File;
use std::path::Path;

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| GeometryError::io(path, e))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Load the base configuration, falling back to the embedded one
pub fn load_base_config(path: Option<&Path>) -> Result<BaseConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading base configuration from: {:?}", path);
            serde_json::from_reader::<_, BaseConfig>(open(path)?)?
        }
        None => {
            info!("Using the embedded base configuration");
            BaseConfig::embedded()?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load an override document. Files ending in `.yaml`/`.yml` are YAML, all others JSON.
pub fn load_override(path: &Path) -> Result<ConfigOverride> {
    info!("Loading configuration override from: {:?}", path);
    let file = open(path)?;
    let overrides = if is_yaml(path) {
        serde_yaml::from_reader(file)?
    } else {
        serde_json::from_reader(file)?
    };
    Ok(overrides)
}

/// Load the base configuration and merge the optional override into it
pub fn load_config(base: Option<&Path>, override_path: Option<&Path>) -> Result<BaseConfig> {
    let config = load_base_config(base)?;
    let Some(path) = override_path else {
        return Ok(config);
    };
    let merged = config.merge(load_override(path)?);
    merged.validate()?;
    debug!("Merged configuration: {:?}", merged);
    Ok(merged)
}

pub fn load_special_metadata(path: &Path) -> Result<SpecialMetadata> {
    info!("Loading special metadata from: {:?}", path);
    let special = SpecialMetadata::from_yaml(open(path)?)?;
    special.validate()?;
    info!(
        "Special metadata describes {} strings, {} calibration tubes and {} fiber modules",
        special.hpge_strings.len(),
        special.calibration.len(),
        special.fibers.len()
    );
    Ok(special)
}

pub fn load_channelmap(path: &Path) -> Result<Channelmap> {
    info!("Loading channelmap from: {:?}", path);
    let channelmap = read_channelmap(open(path)?)?;
    info!("Channelmap holds {} channels", channelmap.len());
    Ok(channelmap)
}

/// Load metadata written earlier by the generator
pub fn load_metadata(special_metadata_path: &Path, channelmap_path: &Path) -> Result<GeneratedMetadata> {
    Ok(GeneratedMetadata {
        special_metadata: load_special_metadata(special_metadata_path)?,
        channelmap: load_channelmap(channelmap_path)?,
    })
}
