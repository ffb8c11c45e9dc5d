//! Detection log retention and durability.

use indra_netra::log::{DetectionLog, DetectionRecord, DetectionSource, MAX_LOG_RECORDS};
use indra_netra::threat::ThreatLevel;
use indra_netra::{BBox, InMemoryKvStore, KvStore, SqliteKvStore, VehicleType};

fn record(confidence: f32) -> DetectionRecord {
    DetectionRecord::new(
        VehicleType::TankMilitaryVehicle,
        confidence,
        Some(BBox::new(0.0, 0.0, 100.0, 100.0)),
        ThreatLevel::High,
        DetectionSource::Live,
    )
}

#[test]
fn retention_keeps_the_newest_thousand() {
    let mut store = InMemoryKvStore::new();
    let mut detection_log = DetectionLog::new();

    // Confidence encodes insertion order so eviction order is observable.
    for i in 0..(MAX_LOG_RECORDS + 1) {
        detection_log.append(&mut store, record(i as f32));
    }

    assert_eq!(detection_log.len(), MAX_LOG_RECORDS);
    let records = detection_log.load_all();
    // Record 0 was evicted; 1..=1000 remain in order.
    assert_eq!(records[0].confidence, 1.0);
    assert_eq!(
        records[MAX_LOG_RECORDS - 1].confidence,
        MAX_LOG_RECORDS as f32
    );
}

#[test]
fn oversized_persisted_log_is_truncated_on_load() {
    let mut store = InMemoryKvStore::new();
    let records: Vec<DetectionRecord> = (0..(MAX_LOG_RECORDS + 50))
        .map(|i| record(i as f32))
        .collect();
    store
        .set_item(
            "indra-netra-detections",
            &serde_json::to_string(&records).unwrap(),
        )
        .unwrap();

    let detection_log = DetectionLog::load(&store);
    assert_eq!(detection_log.len(), MAX_LOG_RECORDS);
    // Oldest entries were dropped.
    assert_eq!(detection_log.load_all()[0].confidence, 50.0);
}

#[test]
fn log_round_trips_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("netra.db");

    {
        let mut store = SqliteKvStore::open(db_path.to_str().unwrap()).unwrap();
        let mut detection_log = DetectionLog::load(&store);
        detection_log.append(&mut store, record(0.7));
        detection_log.append(&mut store, record(0.9));
    }

    let store = SqliteKvStore::open(db_path.to_str().unwrap()).unwrap();
    let reloaded = DetectionLog::load(&store);
    assert_eq!(reloaded.len(), 2);
    let records = reloaded.load_all();
    assert_eq!(records[0].confidence, 0.7);
    assert_eq!(records[1].confidence, 0.9);
    assert_eq!(records[0].vehicle_type, VehicleType::TankMilitaryVehicle);
}

#[test]
fn clear_empties_memory_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("netra.db");
    let mut store = SqliteKvStore::open(db_path.to_str().unwrap()).unwrap();

    let mut detection_log = DetectionLog::new();
    detection_log.append(&mut store, record(0.8));
    detection_log.clear(&mut store).unwrap();

    assert!(detection_log.is_empty());
    assert_eq!(store.get_item("indra-netra-detections").unwrap(), None);
}
