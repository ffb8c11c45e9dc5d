//! demo - end-to-end synthetic run of the detection pipeline
//!
//! Runs the stub detector over synthetic camera frames, persists accepted
//! detections to a throwaway SQLite store, and writes an analytics report to
//! the output directory. No hardware, no model file, no audio.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use indra_netra::alert::NullSink;
use indra_netra::analytics::{aggregate, AnalyticsFilter, TimeRange};
use indra_netra::ingest::{CameraConfig, CameraSource};
use indra_netra::log::now_ms;
use indra_netra::sampler::{DetectionSession, SessionConfig};
use indra_netra::{
    BackendRegistry, DetectionLog, DetectorAdapter, Settings, SqliteKvStore, StubBackend,
    ThreatLevel,
};

const DEFAULT_DB_PATH: &str = "demo_netra.db";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Duration in seconds of synthetic footage.
    #[arg(long, default_value_t = 5)]
    seconds: u64,
    /// Synthetic frame rate.
    #[arg(long, default_value_t = 10)]
    fps: u32,
    /// SQLite store path.
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db: String,
    /// Confidence threshold override (defaults to stored settings).
    #[arg(long)]
    threshold: Option<f32>,
    /// Output directory for the analytics report.
    #[arg(long, default_value = "demo_out")]
    out: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if args.fps == 0 {
        return Err(anyhow!("fps must be >= 1"));
    }
    let total_frames = args.seconds.saturating_mul(args.fps as u64);

    let out_dir = PathBuf::from(&args.out);
    fs::create_dir_all(&out_dir)?;

    stage("open store + load settings");
    let mut store = SqliteKvStore::open(&args.db)?;
    let mut settings = Settings::load(&store);
    if let Some(threshold) = args.threshold {
        settings.confidence_threshold = threshold;
    }
    let mut detection_log = DetectionLog::load(&store);

    stage("load stub detection model");
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    let mut adapter = DetectorAdapter::from_registry(&registry, None)?;
    adapter.load(&mut |_| {})?;

    stage("run synthetic detection session");
    let camera = CameraSource::new(CameraConfig {
        device: "stub://demo".to_string(),
        width: 640,
        height: 480,
        target_fps: args.fps,
    })?;
    let mut session = DetectionSession::new(
        SessionConfig::from_settings(&settings),
        Box::new(NullSink::default()),
    );
    session.start(Box::new(camera))?;

    let mut samples = 0u64;
    let mut high_threat_samples = 0u64;
    for _ in 0..total_frames {
        if let Some(outcome) = session.step(&mut adapter, &mut detection_log, &mut store)? {
            samples += 1;
            if outcome.threat == ThreatLevel::High {
                high_threat_samples += 1;
            }
        }
    }
    let frames_seen = session.frame_count();
    let detections = session.detection_count();
    session.stop();

    stage("write analytics report");
    let report = aggregate(
        &detection_log.load_all(),
        &AnalyticsFilter::new(TimeRange::OneDay),
        now_ms(),
    );
    let report_path = out_dir.join("analytics_report.json");
    fs::write(&report_path, serde_json::to_vec_pretty(&report)?)?;

    println!("demo summary:");
    println!("  frames processed: {}", frames_seen);
    println!("  frames sampled: {}", samples);
    println!("  detections accepted: {}", detections);
    println!("  high-threat samples: {}", high_threat_samples);
    println!("  detection log size: {}", detection_log.len());
    println!("  store: {}", args.db);
    println!("  report: {}", report_path.display());
    println!("next steps:");
    println!("  cargo run --bin report -- --db {}", args.db);
    println!("  ls -la {}", out_dir.display());

    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
