//! report - print an analytics report for the stored detection log
//!
//! Reads the detection log from the SQLite store, applies the requested
//! filter, and prints the aggregated report as JSON on stdout.

use anyhow::{anyhow, Result};
use clap::Parser;

use indra_netra::analytics::{aggregate, AnalyticsFilter, TimeRange};
use indra_netra::log::{now_ms, DetectionSource};
use indra_netra::{DetectionLog, SqliteKvStore, VehicleType};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQLite store path.
    #[arg(long, default_value = "netra.db", env = "NETRA_DB_PATH")]
    db: String,
    /// Reporting window: 1day, 7days, 30days.
    #[arg(long, default_value = "1day")]
    range: String,
    /// Restrict to one vehicle type (display name, e.g. "Fighter Jet").
    #[arg(long)]
    vehicle_type: Option<String>,
    /// Restrict to one source: live, image, surveillance.
    #[arg(long)]
    source: Option<String>,
    /// Minimum confidence, inclusive.
    #[arg(long, default_value_t = 0.0)]
    min_confidence: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let range = TimeRange::from_name(&args.range)
        .ok_or_else(|| anyhow!("unknown range '{}', expected 1day, 7days or 30days", args.range))?;

    let mut filter = AnalyticsFilter::new(range);
    filter.min_confidence = args.min_confidence;
    if let Some(name) = &args.vehicle_type {
        filter.vehicle_type = Some(
            VehicleType::from_display_name(name)
                .ok_or_else(|| anyhow!("unknown vehicle type '{}'", name))?,
        );
    }
    if let Some(source) = &args.source {
        filter.source = Some(match source.as_str() {
            "live" => DetectionSource::Live,
            "image" => DetectionSource::Image,
            "surveillance" => DetectionSource::Surveillance,
            other => return Err(anyhow!("unknown source '{}'", other)),
        });
    }

    let store = SqliteKvStore::open(&args.db)?;
    let detection_log = DetectionLog::load(&store);
    let report = aggregate(&detection_log.load_all(), &filter, now_ms());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
