//! Detection session lifecycle: throttling, skip-and-continue on inference
//! failure, and deterministic source release.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use indra_netra::alert::NullSink;
use indra_netra::ingest::FrameSource;
use indra_netra::log::{DetectionLog, DetectionSource};
use indra_netra::sampler::{DetectionSession, SessionConfig, SessionState};
use indra_netra::{
    BBox, DetectorAdapter, DetectorBackend, Frame, InMemoryKvStore, RawDetection, Settings,
    ThreatLevel,
};

struct CountingSource {
    releases: Arc<AtomicU32>,
}

impl FrameSource for CountingSource {
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        Ok(Frame::new(vec![0u8; Frame::expected_len(8, 8)], 8, 8))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend returning a fixed script of results, one entry per detect call.
struct ScriptedBackend {
    script: Vec<Result<Vec<RawDetection>>>,
    calls: usize,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<Vec<RawDetection>>>) -> Self {
        Self { script, calls: 0 }
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load_model(&mut self, on_progress: &mut dyn FnMut(u8)) -> Result<()> {
        on_progress(100);
        Ok(())
    }

    fn detect(&mut self, _pixels: &[u8], _w: u32, _h: u32) -> Result<Vec<RawDetection>> {
        let call = self.calls;
        self.calls += 1;
        match self.script.get(call) {
            Some(Ok(detections)) => Ok(detections.clone()),
            Some(Err(e)) => Err(anyhow!("{}", e)),
            None => Ok(Vec::new()),
        }
    }
}

fn tank() -> RawDetection {
    RawDetection::new("car", 0.95, BBox::new(0.0, 0.0, 100.0, 100.0))
}

fn adapter_with(script: Vec<Result<Vec<RawDetection>>>) -> DetectorAdapter {
    let mut adapter = DetectorAdapter::new(Arc::new(Mutex::new(ScriptedBackend::new(script))));
    adapter.load(&mut |_| {}).unwrap();
    adapter
}

fn session_config(interval: u32) -> SessionConfig {
    let settings = Settings {
        detection_frequency: interval,
        alerts_enabled: false,
        ..Settings::default()
    };
    SessionConfig::from_settings(&settings)
}

#[test]
fn only_every_nth_frame_is_sampled() {
    let mut adapter = adapter_with(vec![Ok(vec![tank()]), Ok(vec![tank()])]);
    let mut detection_log = DetectionLog::new();
    let mut store = InMemoryKvStore::new();
    let mut session = DetectionSession::new(session_config(3), Box::new(NullSink::default()));
    session
        .start(Box::new(CountingSource {
            releases: Arc::new(AtomicU32::new(0)),
        }))
        .unwrap();

    let mut sampled = Vec::new();
    for _ in 0..6 {
        let outcome = session
            .step(&mut adapter, &mut detection_log, &mut store)
            .unwrap();
        sampled.push(outcome.is_some());
    }
    assert_eq!(sampled, vec![false, false, true, false, false, true]);
    assert_eq!(session.frame_count(), 6);
    assert_eq!(detection_log.len(), 2);
}

#[test]
fn inference_failure_skips_the_frame_and_continues() {
    let mut adapter = adapter_with(vec![
        Err(anyhow!("tensor shape mismatch")),
        Ok(vec![tank()]),
    ]);
    let mut detection_log = DetectionLog::new();
    let mut store = InMemoryKvStore::new();
    let mut session = DetectionSession::new(session_config(1), Box::new(NullSink::default()));
    session
        .start(Box::new(CountingSource {
            releases: Arc::new(AtomicU32::new(0)),
        }))
        .unwrap();

    // First sample fails inside the backend: swallowed, session stays active.
    let outcome = session
        .step(&mut adapter, &mut detection_log, &mut store)
        .unwrap();
    assert!(outcome.is_none());
    assert_eq!(session.state(), SessionState::Active);

    // Next sample succeeds.
    let outcome = session
        .step(&mut adapter, &mut detection_log, &mut store)
        .unwrap()
        .expect("second frame should sample");
    assert_eq!(outcome.detections.len(), 1);
    assert_eq!(outcome.threat, ThreatLevel::High);
    assert_eq!(detection_log.len(), 1);
}

#[test]
fn records_carry_the_live_source_and_set_threat() {
    let mut adapter = adapter_with(vec![Ok(vec![tank()])]);
    let mut detection_log = DetectionLog::new();
    let mut store = InMemoryKvStore::new();
    let mut session = DetectionSession::new(session_config(1), Box::new(NullSink::default()));
    session
        .start(Box::new(CountingSource {
            releases: Arc::new(AtomicU32::new(0)),
        }))
        .unwrap();

    session
        .step(&mut adapter, &mut detection_log, &mut store)
        .unwrap();
    let records = detection_log.load_all();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, DetectionSource::Live);
    assert_eq!(records[0].threat_level, ThreatLevel::High);
    assert!(records[0].bbox.is_some());
}

#[test]
fn stop_releases_the_source_exactly_once() {
    let releases = Arc::new(AtomicU32::new(0));
    let mut session = DetectionSession::new(session_config(1), Box::new(NullSink::default()));
    session
        .start(Box::new(CountingSource {
            releases: releases.clone(),
        }))
        .unwrap();
    assert_eq!(session.state(), SessionState::Active);

    session.stop();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(releases.load(Ordering::SeqCst), 1);

    // Repeated stop and drop must not release again.
    session.stop();
    drop(session);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_an_active_session_releases_the_source() {
    let releases = Arc::new(AtomicU32::new(0));
    {
        let mut session = DetectionSession::new(session_config(1), Box::new(NullSink::default()));
        session
            .start(Box::new(CountingSource {
                releases: releases.clone(),
            }))
            .unwrap();
    }
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn step_on_an_idle_session_is_an_error() {
    let mut adapter = adapter_with(vec![]);
    let mut detection_log = DetectionLog::new();
    let mut store = InMemoryKvStore::new();
    let mut session = DetectionSession::new(session_config(1), Box::new(NullSink::default()));
    assert!(session
        .step(&mut adapter, &mut detection_log, &mut store)
        .is_err());
}
