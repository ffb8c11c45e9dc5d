//! netrad - Indra Netra detection daemon
//!
//! This daemon:
//! 1. Opens the KV store and loads user settings
//! 2. Registers detector backends and loads the selected model
//! 3. Connects the configured camera and starts a detection session
//! 4. Samples frames, remaps and filters detections, threat-scores each set
//! 5. Persists accepted detections to the bounded log, firing audio alerts
//!    for High-threat sets subject to the cooldown

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use indra_netra::alert::{AplaySink, NullSink};
use indra_netra::ingest::{CameraConfig, CameraSource};
use indra_netra::sampler::{DetectionSession, SessionConfig};
use indra_netra::ui::Ui;
use indra_netra::{
    AlertSink, BackendRegistry, DetectionLog, DetectorAdapter, NetradConfig, Settings,
    SqliteKvStore, StreamRegistry, StreamSimulator, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file path (also read from NETRA_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the camera device (stub://name or /dev/videoN).
    #[arg(long)]
    camera: Option<String>,
    /// Override the detector backend name.
    #[arg(long)]
    backend: Option<String>,
    /// Run the surveillance stream simulator alongside the live session.
    #[arg(long, default_value_t = false)]
    simulate_streams: bool,
    /// Disable audio alert playback (threat scoring still runs).
    #[arg(long, default_value_t = false)]
    mute: bool,
    /// UI mode: auto, plain, pretty.
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = NetradConfig::load_from(args.config.as_deref())?;
    if let Some(camera) = args.camera {
        cfg.camera_device = camera;
    }
    if let Some(backend) = args.backend {
        cfg.backend = backend;
    }

    let ui = Ui::from_args(
        args.ui.as_deref(),
        std::io::stderr().is_terminal(),
        std::env::var_os("NO_COLOR").is_some(),
    );

    let mut store = SqliteKvStore::open(&cfg.db_path)
        .with_context(|| format!("open kv store at {}", cfg.db_path))?;
    let settings = Settings::load(&store);
    let mut detection_log = DetectionLog::load(&store);
    log::info!(
        "netrad starting: db={} backend={} camera={} ({} stored detections)",
        cfg.db_path,
        cfg.backend,
        cfg.camera_device,
        detection_log.len()
    );

    let (width, height) = settings.resolution().unwrap_or((1280, 720));

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());
    #[cfg(feature = "backend-tract")]
    if let Some(model_path) = &cfg.model_path {
        registry.register(indra_netra::TractBackend::new(model_path, width, height));
    }
    let mut adapter = DetectorAdapter::from_registry(&registry, Some(&cfg.backend))?;

    match ui.percent_bar("loading model") {
        Some(bar) => {
            adapter.load(&mut |pct| bar.set_position(pct as u64))?;
            bar.finish_and_clear();
        }
        None => {
            let _stage = ui.stage("load detection model");
            adapter.load(&mut |_| {})?;
        }
    }
    log::info!("model loaded on backend '{}'", cfg.backend);

    let camera = CameraSource::new(CameraConfig {
        device: cfg.camera_device.clone(),
        width,
        height,
        target_fps: settings.camera_fps,
    })?;

    let sink: Box<dyn AlertSink> = if args.mute {
        Box::new(NullSink::default())
    } else {
        Box::new(AplaySink)
    };
    let mut session = DetectionSession::new(SessionConfig::from_settings(&settings), sink);
    session.start(Box::new(camera))?;
    log::info!(
        "detection session active (every {} frames, threshold {:.2})",
        settings.detection_frequency.max(1),
        settings.confidence_threshold
    );

    let stream_registry = StreamRegistry::load(&store);
    let mut simulator = StreamSimulator::new();
    let mut last_simulation = Instant::now();
    if args.simulate_streams {
        log::info!(
            "stream simulator enabled for {} configured streams",
            stream_registry.list().len()
        );
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .context("install signal handler")?;
    }

    let mut last_health_log = Instant::now();
    while running.load(Ordering::SeqCst) {
        match session.step(&mut adapter, &mut detection_log, &mut store) {
            Ok(Some(outcome)) if !outcome.detections.is_empty() => {
                log::debug!(
                    "sample: {} detections, threat={}",
                    outcome.detections.len(),
                    outcome.threat
                );
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("session step failed: {:#}", e);
                break;
            }
        }

        if args.simulate_streams && last_simulation.elapsed() >= indra_netra::streams::SIMULATION_TICK
        {
            last_simulation = Instant::now();
            for alert in simulator.tick(&stream_registry, &mut detection_log, &mut store) {
                log::warn!(
                    "stream alert: {} on '{}' ({} detections)",
                    alert.threat,
                    alert.stream_name,
                    alert.detection_count
                );
            }
        }

        if last_health_log.elapsed() >= cfg.health_interval {
            last_health_log = Instant::now();
            log::info!(
                "health: frames={} detections={} fps={:.1} log={}",
                session.frame_count(),
                session.detection_count(),
                session.observed_fps(),
                detection_log.len()
            );
        }
    }

    log::info!("shutting down");
    session.stop();
    log::info!(
        "session closed: {} records in the detection log",
        detection_log.len()
    );
    Ok(())
}
