//! Source data conversion.
//!
//! Converts the centreline, milepost, region, place and administrative area
//! shapefiles into the spatial stores read by the gazetteer build.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use furlong::config::{Config, ROOT_ENV_VAR};
use furlong::conversion::convert_sources;
use furlong::external::SystemRunner;

#[derive(Parser, Debug)]
#[command(name = "furlong-convert")]
#[command(about = "Convert source shapefiles into spatial stores")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "furlong.toml")]
    config: PathBuf,

    /// Project root substituted for ${root_dir} in the configuration
    #[arg(long, env = ROOT_ENV_VAR)]
    root: Option<PathBuf>,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = Config::load_from_file(&args.config, args.root.as_deref())?;

    info!("Furlong source conversion, data version {}", config.version);
    let start = Utc::now();

    if let Err(e) = convert_sources(&SystemRunner, &config) {
        error!("Conversion failed: {:#}", e);
        return Err(e);
    }

    info!(
        "Conversion complete in {}s",
        (Utc::now() - start).num_seconds()
    );
    Ok(())
}
