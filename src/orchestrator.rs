//! Geometry orchestrator.
//!
//! Coordinates one build from configuration loading through metadata
//! synthesis to the composed volume registry. Every call works on fresh
//! state; nothing is cached between builds.

use crate::assembly::{self, BuildInputs};
use crate::config::BaseConfig;
use crate::config_loader;
use crate::detail::{parse_assembly_list, resolve, Assembly, DetailLevel, ResolvedDetail};
use crate::error::{GeometryError, Result};
use crate::geometry::VolumeRegistry;
use crate::materials::{MaterialCatalog, OpticsPlugin};
use crate::metadata::{generate, DetectorDatabase, DetectorOverride, DetectorProvider, GeneratedMetadata};
use log::info;
use std::path::PathBuf;

/// Where the channelmap and special metadata of a build come from
#[derive(Debug, Clone, Default)]
pub enum MetadataSource {
    /// Synthesize them from the base config
    #[default]
    Generate,
    /// Synthesize them, filling every HPGe slot with one detector of a database
    Substitute {
        request: DetectorOverride,
        database: PathBuf,
    },
    /// Read files written earlier by the generator
    Files {
        special_metadata: PathBuf,
        channelmap: PathBuf,
    },
}

/// Files receiving the metadata of a build
#[derive(Debug, Clone)]
pub struct MetadataOutput {
    pub special_metadata: PathBuf,
    pub channelmap: PathBuf,
}

/// Everything one invocation asks for
#[derive(Debug, Clone, Default)]
pub struct GeometryRequest {
    /// Replaces the embedded base config
    pub base_config: Option<PathBuf>,
    /// Merged into the base config
    pub config_override: Option<PathBuf>,
    pub detail: DetailLevel,
    /// Comma separated allow-list
    pub assemblies: Option<String>,
    pub metadata: MetadataSource,
    /// Written as soon as the metadata exists, before any volume is built
    pub metadata_output: Option<MetadataOutput>,
    pub optics_plugin: Option<PathBuf>,
}

/// Result of a build, with the inputs the exporters still need
#[derive(Debug)]
pub struct Geometry {
    pub config: BaseConfig,
    pub detail: ResolvedDetail,
    pub metadata: GeneratedMetadata,
    pub catalog: MaterialCatalog,
    pub registry: VolumeRegistry,
}

/// Load the configuration and resolve the detail directives
pub fn resolve_request(request: &GeometryRequest) -> Result<(BaseConfig, ResolvedDetail)> {
    let config = config_loader::load_config(request.base_config.as_deref(), request.config_override.as_deref())?;
    let allow_list: Option<Vec<Assembly>> = request
        .assemblies
        .as_deref()
        .map(parse_assembly_list)
        .transpose()?;
    let detail = resolve(&config.detail, request.detail, allow_list.as_deref())?;
    Ok((config, detail))
}

/// Obtain the metadata of a build
pub fn load_or_generate_metadata(config: &BaseConfig, source: &MetadataSource) -> Result<GeneratedMetadata> {
    match source {
        MetadataSource::Generate => generate(config, None, None),
        MetadataSource::Substitute { request, database } => {
            let database = DetectorDatabase::load(database)?;
            if database.is_empty() {
                return Err(GeometryError::config(format!(
                    "detector database holds no record for '{}'",
                    request.hpge
                )));
            }
            generate(config, Some(&database as &dyn DetectorProvider), Some(request))
        }
        MetadataSource::Files {
            special_metadata,
            channelmap,
        } => config_loader::load_metadata(special_metadata, channelmap),
    }
}

/// Material catalog with the optional plugin applied
pub fn material_catalog(optics_plugin: Option<&std::path::Path>) -> Result<MaterialCatalog> {
    let mut catalog = MaterialCatalog::standard();
    if let Some(path) = optics_plugin {
        catalog.extend(OpticsPlugin::load(path)?)?;
    }
    Ok(catalog)
}

/// Run one build
pub fn construct(request: &GeometryRequest) -> Result<Geometry> {
    let (config, detail) = resolve_request(request)?;
    info!("Constructing geometry with detail level '{}'", request.detail);

    let metadata = load_or_generate_metadata(&config, &request.metadata)?;
    if let Some(output) = &request.metadata_output {
        metadata.write(&output.special_metadata, &output.channelmap)?;
    }
    let catalog = material_catalog(request.optics_plugin.as_deref())?;

    let registry = assembly::build(&BuildInputs {
        config: &config,
        special_metadata: &metadata.special_metadata,
        channelmap: &metadata.channelmap,
        detail: &detail,
    })?;

    for material in registry.materials() {
        catalog.resolve(material)?;
    }

    Ok(Geometry {
        config,
        detail,
        metadata,
        catalog,
        registry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    #[test]
    fn test_default_request() {
        let geometry = construct(&GeometryRequest::default()).unwrap();
        assert_eq!(geometry.registry.world_name(), "world");
        assert!(geometry.registry.contains("lar"));
        assert!(geometry.registry.detectors().count() > 0);
    }

    #[test]
    fn test_allow_list_is_applied() {
        let request = GeometryRequest {
            detail: DetailLevel::Simple,
            assemblies: Some("hpge_strings".to_string()),
            ..GeometryRequest::default()
        };
        let geometry = construct(&request).unwrap();
        assert!(!geometry.registry.contains("tank"));
        assert!(geometry.registry.contains("outercryostat"));
        assert!(geometry.registry.contains("string_1"));
    }

    #[test]
    fn test_unknown_assembly_fails_before_construction() {
        let request = GeometryRequest {
            assemblies: Some("hpge_strings,bogus".to_string()),
            ..GeometryRequest::default()
        };
        assert!(matches!(resolve_request(&request), Err(GeometryError::Config(_))));
    }

    #[test]
    fn test_empty_database() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{}}").unwrap();
        let source = MetadataSource::Substitute {
            request: DetectorOverride::parse("{'hpge': 'V01234A'}").unwrap(),
            database: file.path().to_path_buf(),
        };
        let config = BaseConfig::embedded().unwrap();
        assert!(matches!(
            load_or_generate_metadata(&config, &source),
            Err(GeometryError::Config(_))
        ));
    }

    #[test]
    fn test_metadata_is_written_before_building() {
        let dir = TempDir::new().unwrap();
        let output = MetadataOutput {
            special_metadata: dir.path().join("special_metadata.yaml"),
            channelmap: dir.path().join("channelmap.json"),
        };
        let request = GeometryRequest {
            detail: DetailLevel::Simple,
            metadata_output: Some(output.clone()),
            optics_plugin: Some(dir.path().join("missing_plugin.yaml")),
            ..GeometryRequest::default()
        };
        assert!(matches!(construct(&request), Err(GeometryError::Io { .. })));

        let written = config_loader::load_metadata(&output.special_metadata, &output.channelmap).unwrap();
        let config = BaseConfig::embedded().unwrap();
        assert_eq!(written, generate(&config, None, None).unwrap());
    }
}
