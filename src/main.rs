use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use l1000geom::detail::DetailLevel;
use l1000geom::export::{self, Scene};
use l1000geom::metadata::DetectorOverride;
use l1000geom::orchestrator::{self, GeometryRequest, MetadataOutput, MetadataSource};
use log::{info, LevelFilter};
use std::path::PathBuf;

/// Monte Carlo geometry generator for the LEGEND-1000 experiment
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File name for the output GDML geometry
    filename: Option<PathBuf>,

    /// Increase the program verbosity
    #[arg(short, long)]
    verbose: bool,

    /// Increase the program verbosity to maximum
    #[arg(short, long)]
    debug: bool,

    /// Hand the geometry to an external viewer, optionally with a scene file (`--visualize=scene.json`)
    #[arg(long, num_args = 0..=1, require_equals = true, value_name = "SCENE")]
    visualize: Option<Option<PathBuf>>,

    /// Write a Geant4 macro file containing visualization attributes
    #[arg(long)]
    vis_macro_file: Option<PathBuf>,

    /// Write a Geant4 macro file registering the active detectors with remage
    #[arg(long)]
    det_macro_file: Option<PathBuf>,

    /// Check for overlaps (coarse, might report false positives)
    #[arg(long)]
    check_overlaps: bool,

    /// Comma separated assemblies to generate; all others are omitted
    #[arg(long)]
    assemblies: Option<String>,

    /// Detail level of the setup
    #[arg(long, default_value = "radiogenic")]
    detail: DetailLevel,

    /// Override document (JSON or YAML) merged into the base configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base configuration replacing the embedded one
    #[arg(long)]
    metadata_config: Option<PathBuf>,

    /// Write the generated channelmap and special metadata
    #[arg(long)]
    generate_metadata: bool,

    #[arg(long, default_value = "special_metadata.yaml")]
    output_special_metadata: PathBuf,

    #[arg(long, default_value = "channelmap.json")]
    output_channelmap: PathBuf,

    /// Read special metadata instead of generating it
    #[arg(long, requires = "channelmap", conflicts_with = "dets_from_metadata")]
    special_metadata: Option<PathBuf>,

    /// Read the channelmap instead of generating it
    #[arg(long, requires = "special_metadata")]
    channelmap: Option<PathBuf>,

    /// Fill every HPGe slot with one real detector, e.g. '{"hpge": "V01234A"}'
    #[arg(long, requires = "detector_db")]
    dets_from_metadata: Option<String>,

    /// JSON detector database backing --dets-from-metadata
    #[arg(long)]
    detector_db: Option<PathBuf>,

    /// Material and optical surface definitions (YAML or JSON)
    #[arg(long)]
    pygeom_optics_plugin: Option<PathBuf>,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if self.visualize.is_none() && self.filename.is_none() {
            bail!("no output file and no visualization specified");
        }
        if (self.vis_macro_file.is_some() || self.det_macro_file.is_some()) && self.filename.is_none() {
            bail!("writing macro file(s) without gdml file is not possible");
        }
        Ok(())
    }

    fn metadata_source(&self) -> Result<MetadataSource> {
        if let (Some(special_metadata), Some(channelmap)) = (&self.special_metadata, &self.channelmap) {
            return Ok(MetadataSource::Files {
                special_metadata: special_metadata.clone(),
                channelmap: channelmap.clone(),
            });
        }
        match (&self.dets_from_metadata, &self.detector_db) {
            (Some(request), Some(database)) => Ok(MetadataSource::Substitute {
                request: DetectorOverride::parse(request)
                    .wrap_err("Failed to parse --dets-from-metadata")?,
                database: database.clone(),
            }),
            _ => Ok(MetadataSource::Generate),
        }
    }

    fn request(&self) -> Result<GeometryRequest> {
        Ok(GeometryRequest {
            base_config: self.metadata_config.clone(),
            config_override: self.config.clone(),
            detail: self.detail,
            assemblies: self.assemblies.clone(),
            metadata: self.metadata_source()?,
            metadata_output: self.generate_metadata.then(|| MetadataOutput {
                special_metadata: self.output_special_metadata.clone(),
                channelmap: self.output_channelmap.clone(),
            }),
            optics_plugin: self.pygeom_optics_plugin.clone(),
        })
    }

    fn log_filter(&self) -> (LevelFilter, Option<LevelFilter>) {
        match (self.debug, self.verbose) {
            (true, _) => (LevelFilter::Debug, None),
            (false, true) => (LevelFilter::Info, Some(LevelFilter::Debug)),
            (false, false) => (LevelFilter::Info, None),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    match args.log_filter() {
        (LevelFilter::Debug, _) => {
            logger.filter_level(LevelFilter::Debug);
        }
        (_, Some(crate_level)) => {
            logger.filter_module("l1000geom", crate_level);
        }
        _ => {}
    }
    logger.init();

    args.validate()?;
    let request = args.request()?;

    let geometry = orchestrator::construct(&request).wrap_err("Failed to construct the geometry")?;

    if args.check_overlaps {
        info!("Checking for overlaps");
        export::check_overlaps(&geometry.registry);
    }

    if let Some(filename) = &args.filename {
        info!("Exporting GDML geometry to {:?}", filename);
        export::write_gdml(&geometry.registry, &geometry.catalog, filename)
            .wrap_err_with(|| format!("Failed to write GDML file '{}'", filename.display()))?;
    }

    if let Some(path) = &args.det_macro_file {
        export::write_detector_macro(&geometry.registry, path)
            .wrap_err_with(|| format!("Failed to write detector macro '{}'", path.display()))?;
    }

    if let Some(path) = &args.vis_macro_file {
        export::write_vis_macro(&geometry.registry, path)
            .wrap_err_with(|| format!("Failed to write visualization macro '{}'", path.display()))?;
    }

    if let Some(scene) = &args.visualize {
        info!("Visualizing");
        let scene = match scene {
            Some(path) => Scene::load(path).wrap_err("Failed to load the scene file")?,
            None => Scene::default(),
        };
        export::visualize(&geometry.registry, &scene)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["legend-pygeom-l1000", "l1000.gdml"]);

        assert_eq!(args.filename, Some(PathBuf::from("l1000.gdml")));
        assert_eq!(args.detail, DetailLevel::Radiogenic);
        assert_eq!(args.output_channelmap, PathBuf::from("channelmap.json"));
        assert!(args.visualize.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_visualize_with_and_without_scene() {
        let args = Args::parse_from(["legend-pygeom-l1000", "--visualize"]);
        assert_eq!(args.visualize, Some(None));
        assert!(args.validate().is_ok());

        let args = Args::parse_from(["legend-pygeom-l1000", "--visualize=scene.json", "out.gdml"]);
        assert_eq!(args.visualize, Some(Some(PathBuf::from("scene.json"))));
        assert_eq!(args.filename, Some(PathBuf::from("out.gdml")));
    }

    #[test]
    fn test_output_requirements() {
        let args = Args::parse_from(["legend-pygeom-l1000", "--detail", "full"]);
        assert_eq!(args.detail, DetailLevel::Full);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["legend-pygeom-l1000", "--visualize", "--det-macro-file", "det.mac"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_unknown_detail_level() {
        assert!(Args::try_parse_from(["legend-pygeom-l1000", "--detail", "extreme", "out.gdml"]).is_err());
    }

    #[test]
    fn test_metadata_sources() {
        let args = Args::parse_from([
            "legend-pygeom-l1000",
            "--special-metadata",
            "special_metadata.yaml",
            "--channelmap",
            "channelmap.json",
            "out.gdml",
        ]);
        assert!(matches!(args.request().unwrap().metadata, MetadataSource::Files { .. }));

        let args = Args::parse_from([
            "legend-pygeom-l1000",
            "--dets-from-metadata",
            r#"{"hpge": "V01234A"}"#,
            "--detector-db",
            "dets.json",
            "out.gdml",
        ]);
        match args.request().unwrap().metadata {
            MetadataSource::Substitute { request, .. } => assert_eq!(request.hpge, "V01234A"),
            other => panic!("unexpected metadata source {:?}", other),
        }

        assert!(Args::try_parse_from(["legend-pygeom-l1000", "--dets-from-metadata", "{}", "out.gdml"]).is_err());
        assert!(Args::try_parse_from(["legend-pygeom-l1000", "--channelmap", "c.json", "out.gdml"]).is_err());
    }

    #[test]
    fn test_generate_metadata_outputs() {
        let args = Args::parse_from(["legend-pygeom-l1000", "out.gdml"]);
        assert!(args.request().unwrap().metadata_output.is_none());

        let args = Args::parse_from([
            "legend-pygeom-l1000",
            "--generate-metadata",
            "--output-channelmap",
            "cmap.json",
            "out.gdml",
        ]);
        let output = args.request().unwrap().metadata_output.unwrap();
        assert_eq!(output.special_metadata, PathBuf::from("special_metadata.yaml"));
        assert_eq!(output.channelmap, PathBuf::from("cmap.json"));
    }

    #[test]
    fn test_log_filter() {
        let args = Args::parse_from(["legend-pygeom-l1000", "-v", "out.gdml"]);
        assert_eq!(args.log_filter(), (LevelFilter::Info, Some(LevelFilter::Debug)));
        let args = Args::parse_from(["legend-pygeom-l1000", "-v", "-d", "out.gdml"]);
        assert_eq!(args.log_filter().0, LevelFilter::Debug);
    }
}
