//! Sampler service.
//!
//! Loads a pipeline configuration, opens the configured zarr stores, and
//! either produces N training batches, emits one live example at the
//! freshest valid anchor, or enumerates every valid anchor for a validation
//! split. Anchors skipped over data gaps are logged, never fatal.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pipeline::{DatasetPipeline, PipelineConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Produce training batches with seeded random anchors.
    Train,
    /// Produce one example at the freshest jointly valid anchor.
    Live,
    /// List every valid anchor (validation splits).
    Enumerate,
}

#[derive(Parser, Debug)]
#[command(name = "sampler")]
#[command(about = "Aligned example sampler for solar forecasting datasets")]
struct Args {
    /// Pipeline configuration file
    #[arg(short, long, env = "PIPELINE_CONFIG", default_value = "config/pipeline.yaml")]
    config: PathBuf,

    /// What to produce
    #[arg(long, value_enum, default_value = "train")]
    mode: Mode,

    /// Number of batches to produce in train mode
    #[arg(long, default_value = "1")]
    batches: usize,

    /// Override the configured sampling seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(config = %args.config.display(), mode = ?args.mode, "starting sampler");

    let mut config = PipelineConfig::from_yaml_file(&args.config)?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut pipeline = DatasetPipeline::new(&config)?;

    match args.mode {
        Mode::Train => {
            for i in 0..args.batches {
                let batch = pipeline.next_batch().await?;
                for (key, array) in &batch.arrays {
                    info!(batch = i, source = %key, dims = ?array.dims, "stacked modality");
                }
                info!(
                    batch = i,
                    examples = batch.len(),
                    first_anchor = %batch.anchors[0],
                    "produced batch"
                );
            }
        }
        Mode::Live => {
            let example = pipeline.live_example().await?;
            for (key, array) in &example.arrays {
                info!(source = %key, dims = ?array.dims, "fetched modality");
            }
            info!(anchor = %example.anchor, "produced live example");
            println!(
                "{}",
                serde_json::json!({
                    "anchor": example.anchor,
                    "sources": example.arrays.keys().collect::<Vec<_>>(),
                })
            );
        }
        Mode::Enumerate => {
            let anchors: Vec<_> = pipeline.validation_anchors().await?.collect();
            info!(count = anchors.len(), "enumerated valid anchors");
            for anchor in anchors {
                println!("{}", anchor.to_rfc3339());
            }
        }
    }

    Ok(())
}
