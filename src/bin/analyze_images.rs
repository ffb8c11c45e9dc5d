//! analyze_images - run the detection pipeline over image files
//!
//! Vets the files up front (count, extension, size), runs each through the
//! detector, persists accepted detections with the image source tag, and
//! prints the batch summary as JSON.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use indra_netra::analyze::ImageBatch;
use indra_netra::{
    BackendRegistry, DetectionLog, DetectorAdapter, Settings, SqliteKvStore, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQLite store path.
    #[arg(long, default_value = "netra.db", env = "NETRA_DB_PATH")]
    db: String,
    /// Confidence threshold override (defaults to stored settings).
    #[arg(long)]
    threshold: Option<f32>,
    /// Image files to analyze (at most ten).
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut store = SqliteKvStore::open(&args.db)?;
    let settings = Settings::load(&store);
    let threshold = args.threshold.unwrap_or(settings.confidence_threshold);

    let batch = ImageBatch::from_paths(&args.files, threshold)?;

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    let mut adapter = DetectorAdapter::from_registry(&registry, None)?;
    adapter.load(&mut |_| {})?;

    let mut detection_log = DetectionLog::load(&store);
    let summary = batch.analyze(&mut adapter, &mut detection_log, &mut store);

    log::info!(
        "analyzed {}/{} images, {} detections, batch threat {}",
        summary.analyzed,
        summary.total,
        summary.total_detections,
        summary.batch_threat
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
