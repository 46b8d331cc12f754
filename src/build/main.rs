//! Gazetteer build.
//!
//! Joins precomputed line samples against regions, populated places and
//! administrative areas, writing one gazetteer per sampling resolution.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use furlong::config::{Config, Resolution, ROOT_ENV_VAR};
use furlong::external::SystemRunner;
use furlong::gazetteer::{write_aggregated_gazetteer, GazetteerBuilder};

#[derive(Parser, Debug)]
#[command(name = "furlong-build")]
#[command(about = "Build railway gazetteers from precomputed line samples")]
struct Args {
    /// Sampling resolutions in yards, built one after another
    #[arg(required = true)]
    resolutions: Vec<Resolution>,

    /// Configuration file
    #[arg(short, long, default_value = "furlong.toml")]
    config: PathBuf,

    /// Project root substituted for ${root_dir} in the configuration
    #[arg(long, env = ROOT_ENV_VAR)]
    root: Option<PathBuf>,

    /// Also write the aggregated gazetteer from the finest resolution
    #[arg(long)]
    aggregate: bool,

    /// Write only the raw CSV, skipping the SQL store
    #[arg(long)]
    skip_normalize: bool,

    /// Show progress bars for the join stages
    #[arg(long)]
    progress: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    if let Err(e) = run(args) {
        error!("Build failed: {:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load_from_file(&args.config, args.root.as_deref())?;
    if args.skip_normalize {
        config.build.normalize = false;
    }

    info!("Furlong gazetteer build, data version {}", config.version);
    let start = Utc::now();

    let runner = SystemRunner;
    let builder = GazetteerBuilder::new(&config, &runner).with_progress(args.progress);

    for resolution in &args.resolutions {
        let summary = builder.build(*resolution)?;
        info!(
            "Wrote {} ({} records)",
            summary.raw_csv.display(),
            summary.records
        );
        if let Some(store) = &summary.store {
            info!("Wrote {}", store.display());
        }
    }

    if args.aggregate {
        if let Some(finest) = args.resolutions.iter().min() {
            let summary = write_aggregated_gazetteer(&runner, &config, *finest)?;
            info!(
                "Wrote {} ({} ranges)",
                summary.csv.display(),
                summary.ranges
            );
            if let Some(store) = &summary.store {
                info!("Wrote {}", store.display());
            }
        }
    }

    let elapsed = Utc::now() - start;
    info!("Build complete in {}s", elapsed.num_seconds());
    Ok(())
}
