//! Surveillance stream registry and simulator.
//!
//! Streams are named remote feeds persisted as one JSON list under
//! `indra-netra-streams`. Real remote ingestion is not wired up; `stub://`
//! streams run through a simulator that synthesizes plausible detections on
//! a fixed tick and raises stream alerts for Medium-or-higher verdicts.
//! Alerts are kept newest-first with a hard cap.

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::detect::{BBox, RawDetection};
use crate::log::{new_record_id, now_ms, DetectionLog, DetectionRecord, DetectionSource};
use crate::remap::remap_and_filter;
use crate::storage::{KvStore, STREAMS_KEY};
use crate::threat::{score_threat, ThreatLevel};

/// Spacing between simulator passes.
pub const SIMULATION_TICK: Duration = Duration::from_secs(5);

/// Retention cap for stream alerts.
pub const MAX_STREAM_ALERTS: usize = 50;

/// One configured surveillance stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    pub location: String,
    pub active: bool,
}

impl StreamConfig {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            url: url.into(),
            location: location.into(),
            active: true,
        }
    }
}

/// An unacknowledged (or acknowledged) alert raised by the simulator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamAlert {
    pub id: String,
    pub stream_id: String,
    pub stream_name: String,
    pub timestamp: u64,
    pub threat: ThreatLevel,
    pub detection_count: usize,
    pub acknowledged: bool,
}

/// Persisted stream registry. All mutations flush eagerly.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: Vec<StreamConfig>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the bulk key; missing or unparsable state starts empty.
    pub fn load(store: &dyn KvStore) -> Self {
        let raw = match store.get_item(STREAMS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                log::warn!("stream registry read failed, starting empty: {:#}", e);
                return Self::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(streams) => Self { streams },
            Err(e) => {
                log::warn!("stream registry was unparsable, starting empty: {}", e);
                Self::new()
            }
        }
    }

    pub fn list(&self) -> &[StreamConfig] {
        &self.streams
    }

    pub fn get(&self, id: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|stream| stream.id == id)
    }

    pub fn add(&mut self, store: &mut dyn KvStore, stream: StreamConfig) -> Result<()> {
        if self.streams.iter().any(|s| s.id == stream.id) {
            return Err(anyhow!("stream '{}' already registered", stream.id));
        }
        self.streams.push(stream);
        self.flush(store)
    }

    pub fn remove(&mut self, store: &mut dyn KvStore, id: &str) -> Result<()> {
        let before = self.streams.len();
        self.streams.retain(|stream| stream.id != id);
        if self.streams.len() == before {
            return Err(anyhow!("stream '{}' not found", id));
        }
        self.flush(store)
    }

    pub fn set_active(&mut self, store: &mut dyn KvStore, id: &str, active: bool) -> Result<()> {
        let stream = self
            .streams
            .iter_mut()
            .find(|stream| stream.id == id)
            .ok_or_else(|| anyhow!("stream '{}' not found", id))?;
        stream.active = active;
        self.flush(store)
    }

    fn flush(&self, store: &mut dyn KvStore) -> Result<()> {
        let encoded = serde_json::to_string(&self.streams)?;
        store.set_item(STREAMS_KEY, &encoded)
    }
}

/// Attempt a live connection to a stream. Only `stub://` URLs connect; real
/// transports are rejected rather than half-implemented.
pub fn connect_stream(stream: &StreamConfig) -> Result<()> {
    if stream.url.starts_with("stub://") {
        log::info!("stream '{}' connected ({})", stream.name, stream.url);
        return Ok(());
    }
    Err(anyhow!(
        "stream url '{}' not yet supported, only stub:// streams connect",
        stream.url
    ))
}

/// Generic labels the simulator draws from. Indexes into the remap table's
/// source side plus labels the filter drops.
const SIMULATED_LABELS: [&str; 7] = [
    "car", "truck", "airplane", "boat", "train", "person", "bird",
];

/// Synthesizes detections for active streams on each tick.
#[derive(Debug, Default)]
pub struct StreamSimulator {
    alerts: VecDeque<StreamAlert>,
}

impl StreamSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one pass over every active stream. Synthesized detections go
    /// through the real remap and threat stages; a Medium-or-higher verdict
    /// persists its records and raises an alert.
    pub fn tick(
        &mut self,
        registry: &StreamRegistry,
        detection_log: &mut DetectionLog,
        store: &mut dyn KvStore,
    ) -> Vec<StreamAlert> {
        let mut raised = Vec::new();
        for stream in registry.list().iter().filter(|stream| stream.active) {
            let raw = synthesize_detections(&mut rand::thread_rng());
            let detections = remap_and_filter(&raw, 0.0);
            let threat = score_threat(&detections);
            if threat < ThreatLevel::Medium {
                continue;
            }

            for detection in &detections {
                detection_log.append(
                    store,
                    DetectionRecord::new(
                        detection.vehicle_type,
                        detection.score,
                        Some(detection.bbox),
                        threat,
                        DetectionSource::Surveillance,
                    ),
                );
            }

            let alert = StreamAlert {
                id: new_record_id(),
                stream_id: stream.id.clone(),
                stream_name: stream.name.clone(),
                timestamp: now_ms(),
                threat,
                detection_count: detections.len(),
                acknowledged: false,
            };
            log::info!(
                "stream '{}' raised a {} alert ({} detections)",
                stream.name,
                threat,
                alert.detection_count
            );
            self.push_alert(alert.clone());
            raised.push(alert);
        }
        raised
    }

    /// Alerts newest first.
    pub fn alerts(&self) -> impl Iterator<Item = &StreamAlert> {
        self.alerts.iter()
    }

    pub fn unacknowledged(&self) -> usize {
        self.alerts.iter().filter(|alert| !alert.acknowledged).count()
    }

    pub fn acknowledge(&mut self, alert_id: &str) -> Result<()> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|alert| alert.id == alert_id)
            .ok_or_else(|| anyhow!("alert '{}' not found", alert_id))?;
        alert.acknowledged = true;
        Ok(())
    }

    fn push_alert(&mut self, alert: StreamAlert) {
        self.alerts.push_front(alert);
        while self.alerts.len() > MAX_STREAM_ALERTS {
            self.alerts.pop_back();
        }
    }
}

/// Draw 0..=3 raw detections with random labels, scores and boxes.
fn synthesize_detections<R: Rng>(rng: &mut R) -> Vec<RawDetection> {
    let count = rng.gen_range(0..=3);
    (0..count)
        .map(|_| {
            let label = SIMULATED_LABELS[rng.gen_range(0..SIMULATED_LABELS.len())];
            let score: f32 = rng.gen_range(0.2..1.0);
            let w: f32 = rng.gen_range(20.0..300.0);
            let h: f32 = rng.gen_range(20.0..300.0);
            RawDetection::new(label, score, BBox::new(0.0, 0.0, w, h))
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
