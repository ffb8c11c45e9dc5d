//! Bounded, persisted detection log.
//!
//! Every accepted detection becomes an immutable `DetectionRecord`. The log
//! keeps the newest 1000 records, evicting oldest-first by insertion order
//! (not by timestamp; out-of-order insertion is not guarded against), and
//! flushes eagerly to the `indra-netra-detections` bulk key after every
//! mutation. A persistence failure is swallowed with a warning so the
//! pipeline keeps running on the in-memory copy.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::detect::BBox;
use crate::remap::VehicleType;
use crate::storage::{KvStore, DETECTIONS_KEY};
use crate::threat::ThreatLevel;

/// Retention bound: the log never stores more than this many records.
pub const MAX_LOG_RECORDS: usize = 1000;

/// Which flow produced a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Live,
    Image,
    Surveillance,
}

impl DetectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSource::Live => "live",
            DetectionSource::Image => "image",
            DetectionSource::Surveillance => "surveillance",
        }
    }
}

impl std::fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted detection event. Never mutated after creation; deleted only
/// by bulk clear.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: String,
    /// Epoch milliseconds at record creation.
    pub timestamp: u64,
    pub vehicle_type: VehicleType,
    pub confidence: f32,
    pub bbox: Option<BBox>,
    /// Threat level of the detection set this record was accepted in.
    pub threat_level: ThreatLevel,
    pub source: DetectionSource,
    /// File name for `Image`-sourced records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl DetectionRecord {
    pub fn new(
        vehicle_type: VehicleType,
        confidence: f32,
        bbox: Option<BBox>,
        threat_level: ThreatLevel,
        source: DetectionSource,
    ) -> Self {
        Self {
            id: new_record_id(),
            timestamp: now_ms(),
            vehicle_type,
            confidence,
            bbox,
            threat_level,
            source,
            image_ref: None,
        }
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Random 16-byte hex id. Uniqueness by entropy, no clock coupling.
pub fn new_record_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Current time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The bounded detection log.
///
/// Owns the in-memory record sequence; callers hand in the store on each
/// mutation so one writer flushes all persistence.
#[derive(Debug, Default)]
pub struct DetectionLog {
    records: VecDeque<DetectionRecord>,
}

impl DetectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the log from the bulk key. A missing key yields an empty log;
    /// an unparsable value is discarded with a warning rather than failing
    /// startup.
    pub fn load(store: &dyn KvStore) -> Self {
        let raw = match store.get_item(DETECTIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(e) => {
                log::warn!("detection log read failed, starting empty: {:#}", e);
                return Self::new();
            }
        };
        match serde_json::from_str::<VecDeque<DetectionRecord>>(&raw) {
            Ok(mut records) => {
                while records.len() > MAX_LOG_RECORDS {
                    records.pop_front();
                }
                Self { records }
            }
            Err(e) => {
                log::warn!("detection log was unparsable, starting empty: {}", e);
                Self::new()
            }
        }
    }

    /// Append one record, evicting the oldest past the retention bound, and
    /// flush eagerly. A flush failure keeps the in-memory log and warns.
    pub fn append(&mut self, store: &mut dyn KvStore, record: DetectionRecord) {
        self.records.push_back(record);
        while self.records.len() > MAX_LOG_RECORDS {
            self.records.pop_front();
        }
        self.flush_best_effort(store);
    }

    /// Snapshot of the stored records, oldest first.
    pub fn load_all(&self) -> Vec<DetectionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bulk clear, in memory and in the store.
    pub fn clear(&mut self, store: &mut dyn KvStore) -> Result<()> {
        self.records.clear();
        store.remove_item(DETECTIONS_KEY)
    }

    fn flush_best_effort(&self, store: &mut dyn KvStore) {
        let encoded = match serde_json::to_string(&self.records) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("detection log serialization failed, skipping flush: {}", e);
                return;
            }
        };
        if let Err(e) = store.set_item(DETECTIONS_KEY, &encoded) {
            log::warn!("detection log flush failed, keeping in-memory copy: {:#}", e);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
