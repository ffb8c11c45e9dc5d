//! Frame sampler / detection session controller.
//!
//! A session steps one frame at a time: every frame is counted toward the
//! observed FPS, every Nth frame runs the full pipeline (detect → remap →
//! threat-score → persist), the rest pass through. One step is always fully
//! consumed before the next begins, so inference calls never overlap and
//! `stop` is deterministic: after it returns no step can observe an active
//! session.

use std::time::Instant;

use anyhow::{anyhow, Result};

use crate::alert::{AlertGate, AlertSink};
use crate::detect::DetectorAdapter;
use crate::errors::{has_code, DETECTION_ERROR};
use crate::ingest::FrameSource;
use crate::log::{DetectionLog, DetectionRecord, DetectionSource};
use crate::remap::{remap_and_filter, MilitaryDetection};
use crate::settings::Settings;
use crate::storage::KvStore;
use crate::threat::{max_score, score_threat, ThreatLevel};

/// Session parameters, captured from settings at session start. Later
/// settings changes apply to the next session, not this one.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Run inference every Nth frame.
    pub sampling_interval: u32,
    pub confidence_threshold: f32,
    pub alerts_enabled: bool,
    pub alert_threshold: f32,
    pub alert_volume: u32,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sampling_interval: settings.detection_frequency.max(1),
            confidence_threshold: settings.confidence_threshold,
            alerts_enabled: settings.alerts_enabled,
            alert_threshold: settings.alert_threshold,
            alert_volume: settings.alert_volume,
        }
    }
}

/// What one sampled frame produced, for the overlay collaborator.
#[derive(Clone, Debug)]
pub struct SampleOutcome {
    pub detections: Vec<MilitaryDetection>,
    pub threat: ThreatLevel,
    /// Observed source FPS over the last completed 1-second window.
    pub fps: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// One live detection session.
pub struct DetectionSession {
    config: SessionConfig,
    state: SessionState,
    source: Option<Box<dyn FrameSource>>,
    alert_gate: AlertGate,
    alert_sink: Box<dyn AlertSink>,
    frame_count: u64,
    detection_count: u64,
    frames_in_window: u32,
    window_start: Instant,
    observed_fps: f32,
}

impl DetectionSession {
    pub fn new(config: SessionConfig, alert_sink: Box<dyn AlertSink>) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            source: None,
            alert_gate: AlertGate::new(),
            alert_sink,
            frame_count: 0,
            detection_count: 0,
            frames_in_window: 0,
            window_start: Instant::now(),
            observed_fps: 0.0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Frames seen this session.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Records accepted this session.
    pub fn detection_count(&self) -> u64 {
        self.detection_count
    }

    pub fn observed_fps(&self) -> f32 {
        self.observed_fps
    }

    /// `Idle → Active`: acquire the frame source and reset per-session
    /// counters. On a connect failure the source is released and the
    /// session stays idle.
    pub fn start(&mut self, mut source: Box<dyn FrameSource>) -> Result<()> {
        if self.state == SessionState::Active {
            return Err(anyhow!("detection session already active"));
        }
        if let Err(e) = source.connect() {
            source.release();
            return Err(e);
        }
        self.source = Some(source);
        self.state = SessionState::Active;
        self.frame_count = 0;
        self.detection_count = 0;
        self.frames_in_window = 0;
        self.window_start = Instant::now();
        self.observed_fps = 0.0;
        self.alert_gate.reset();
        Ok(())
    }

    /// Process one frame. Returns `Ok(None)` for pass-through frames and
    /// for sampled frames whose inference failed (`DetectionError` is
    /// skip-and-continue); `Ok(Some(..))` for a completed sample.
    pub fn step(
        &mut self,
        adapter: &mut DetectorAdapter,
        detection_log: &mut DetectionLog,
        store: &mut dyn KvStore,
    ) -> Result<Option<SampleOutcome>> {
        if self.state == SessionState::Idle {
            return Err(anyhow!("detection session is idle"));
        }
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| anyhow!("detection session has no frame source"))?;

        let frame = source.next_frame()?;
        self.frame_count += 1;
        self.tick_fps_window(Instant::now());

        if self.frame_count % self.config.sampling_interval as u64 != 0 {
            return Ok(None);
        }

        let raw = match adapter.detect(&frame) {
            Ok(raw) => raw,
            Err(e) if has_code(&e, DETECTION_ERROR) => {
                log::warn!("inference failed, skipping frame {}: {:#}", self.frame_count, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let detections = remap_and_filter(&raw, self.config.confidence_threshold);
        let threat = score_threat(&detections);

        for detection in &detections {
            log::info!(
                "detection: {} conf={:.2} threat={} frame={}",
                detection.vehicle_type,
                detection.score,
                threat,
                self.frame_count
            );
            detection_log.append(
                store,
                DetectionRecord::new(
                    detection.vehicle_type,
                    detection.score,
                    Some(detection.bbox),
                    threat,
                    DetectionSource::Live,
                ),
            );
        }
        self.detection_count += detections.len() as u64;

        if threat == ThreatLevel::High
            && self.config.alerts_enabled
            && max_score(&detections) >= self.config.alert_threshold
            && self.alert_gate.try_fire(Instant::now())
        {
            if let Err(e) = self.alert_sink.play(self.config.alert_volume) {
                log::warn!("alert playback failed: {:#}", e);
            }
        }

        Ok(Some(SampleOutcome {
            detections,
            threat,
            fps: self.observed_fps,
        }))
    }

    /// `Active → Idle`: release the frame source and reset counters. Safe
    /// to call from any state; the source is released exactly once.
    pub fn stop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        self.state = SessionState::Idle;
        self.frame_count = 0;
        self.detection_count = 0;
        self.frames_in_window = 0;
        self.observed_fps = 0.0;
    }

    fn tick_fps_window(&mut self, now: Instant) {
        self.frames_in_window += 1;
        let elapsed = now.duration_since(self.window_start).as_secs_f32();
        if elapsed >= 1.0 {
            self.observed_fps = self.frames_in_window as f32 / elapsed;
            self.frames_in_window = 0;
            self.window_start = now;
        }
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        // Dropping an active session must not leak the capture device.
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::NullSink;
    use crate::errors::PipelineError;
    use crate::frame::Frame;

    struct ScriptedSource {
        fail_connect: bool,
        releases: u32,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                fail_connect: false,
                releases: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn connect(&mut self) -> Result<()> {
            if self.fail_connect {
                return Err(PipelineError::camera_access("no such device".to_string()).into());
            }
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Frame> {
            Ok(Frame::new(vec![0u8; Frame::expected_len(4, 4)], 4, 4))
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    fn test_config() -> SessionConfig {
        SessionConfig::from_settings(&Settings::default())
    }

    #[test]
    fn session_starts_idle() {
        let session = DetectionSession::new(test_config(), Box::new(NullSink::default()));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn failed_connect_leaves_session_idle() {
        let mut session = DetectionSession::new(test_config(), Box::new(NullSink::default()));
        let source = ScriptedSource {
            fail_connect: true,
            releases: 0,
        };
        assert!(session.start(Box::new(source)).is_err());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn start_then_start_is_rejected() -> Result<()> {
        let mut session = DetectionSession::new(test_config(), Box::new(NullSink::default()));
        session.start(Box::new(ScriptedSource::new()))?;
        assert!(session.start(Box::new(ScriptedSource::new())).is_err());
        assert_eq!(session.state(), SessionState::Active);
        Ok(())
    }

    #[test]
    fn stop_from_idle_is_a_no_op() {
        let mut session = DetectionSession::new(test_config(), Box::new(NullSink::default()));
        session.stop();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn sampling_interval_below_one_is_clamped() {
        let settings = Settings {
            detection_frequency: 0,
            ..Settings::default()
        };
        assert_eq!(SessionConfig::from_settings(&settings).sampling_interval, 1);
    }
}
