//! Indra Netra: military vehicle detection pipeline
//!
//! This crate implements the detection pipeline behind the Indra Netra demo:
//! frames come in from a camera or image files, every Nth frame runs a
//! general-object detector, detections are remapped into a fixed military
//! taxonomy and filtered, the surviving set is threat-scored, and accepted
//! detections are persisted to a bounded local log.
//!
//! # Module Structure
//!
//! - `frame`: owned RGB frames handed between stages
//! - `ingest`: frame sources (synthetic camera, V4L2, image files)
//! - `detect`: detector backends, registry, and the loading adapter
//! - `remap`: generic-label remap into the military taxonomy + filtering
//! - `threat`: threat scoring over a detection set
//! - `sampler`: the live detection session (throttling, FPS, alerts)
//! - `log`: bounded persisted detection log
//! - `storage`: the KV boundary (SQLite and in-memory stores)
//! - `settings` / `config`: per-user settings and daemon wiring
//! - `streams`: surveillance stream registry and simulator
//! - `analytics`: aggregation over persisted records

pub mod alert;
pub mod analytics;
#[cfg(feature = "image-analysis")]
pub mod analyze;
pub mod config;
pub mod detect;
pub mod errors;
pub mod frame;
pub mod ingest;
pub mod log;
pub mod remap;
pub mod sampler;
pub mod settings;
pub mod storage;
pub mod streams;
pub mod threat;
pub mod ui;

pub use alert::{AlertGate, AlertSink, AplaySink, NullSink, ALERT_COOLDOWN};
pub use analytics::{aggregate, AnalyticsFilter, AnalyticsReport, TimeRange};
pub use config::NetradConfig;
pub use detect::{BackendRegistry, BBox, DetectorAdapter, DetectorBackend, RawDetection, StubBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use errors::{error_code, has_code, PipelineError};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, FrameSource};
pub use log::{DetectionLog, DetectionRecord, DetectionSource, MAX_LOG_RECORDS};
pub use remap::{remap_and_filter, MilitaryDetection, VehicleType};
pub use sampler::{DetectionSession, SampleOutcome, SessionConfig, SessionState};
pub use settings::{DetectionPreset, Settings};
pub use storage::{storage_usage, InMemoryKvStore, KvStore, SqliteKvStore};
pub use streams::{StreamConfig, StreamRegistry, StreamSimulator};
pub use threat::{score_threat, ThreatLevel};
