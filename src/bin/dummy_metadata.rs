//! Standalone metadata generator.
//!
//! Writes the channelmap and special metadata for a base configuration
//! without composing any geometry.

use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use l1000geom::config_loader;
use l1000geom::metadata::{generate, DetectorDatabase, DetectorOverride, DetectorProvider};
use log::info;
use std::path::PathBuf;

/// Generate dummy LEGEND-1000 channelmap and special metadata
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base configuration (JSON)
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short = 's', long, alias = "output_special_metadata", default_value = "special_metadata.yaml")]
    output_special_metadata: PathBuf,

    #[arg(short = 'c', long, alias = "output_channelmap", default_value = "channelmap.json")]
    output_channelmap: PathBuf,

    /// Fill every HPGe slot with one real detector, e.g. "{'hpge': 'V01234A'}"
    #[arg(short = 'd', long, alias = "dets_from_metadata")]
    dets_from_metadata: Option<String>,

    /// JSON detector database backing --dets-from-metadata
    #[arg(long)]
    detector_db: Option<PathBuf>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config_loader::load_base_config(Some(&args.input))
        .wrap_err_with(|| format!("Failed to load configuration '{}'", args.input.display()))?;

    let request = args
        .dets_from_metadata
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(DetectorOverride::parse)
        .transpose()
        .wrap_err("Failed to parse --dets-from-metadata")?;

    let database = match (&request, &args.detector_db) {
        (Some(_), Some(path)) => Some(DetectorDatabase::load(path).wrap_err("Failed to load the detector database")?),
        (Some(request), None) => bail!("substituting '{}' requires --detector-db", request.hpge),
        (None, _) => None,
    };

    let generated = generate(
        &config,
        database.as_ref().map(|db| db as &dyn DetectorProvider),
        request.as_ref(),
    )
    .wrap_err("Failed to generate metadata")?;

    generated
        .write(&args.output_special_metadata, &args.output_channelmap)
        .wrap_err("Failed to write the generated metadata")?;
    info!(
        "Generated {} channels for {} strings",
        generated.channelmap.len(),
        generated.special_metadata.hpge_strings.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["l1000-dummy-metadata", "-i", "config.json"]);
        assert_eq!(args.input, PathBuf::from("config.json"));
        assert_eq!(args.output_special_metadata, PathBuf::from("special_metadata.yaml"));
        assert!(args.dets_from_metadata.is_none());
    }

    #[test]
    fn test_underscore_aliases() {
        let args = Args::parse_from([
            "l1000-dummy-metadata",
            "--input",
            "config.json",
            "--output_channelmap",
            "out/chm.json",
            "-d",
            "{'hpge': 'V01234A'}",
        ]);
        assert_eq!(args.output_channelmap, PathBuf::from("out/chm.json"));
        assert_eq!(args.dets_from_metadata.as_deref(), Some("{'hpge': 'V01234A'}"));
    }

    #[test]
    fn test_input_is_required() {
        assert!(Args::try_parse_from(["l1000-dummy-metadata"]).is_err());
    }
}
