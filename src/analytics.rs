//! Detection analytics.
//!
//! Pure aggregation over persisted detection records: a time-range filter
//! with optional vehicle-type, source and confidence narrowing, rolled up
//! into a timeline, per-type and per-threat counts, and a confidence
//! histogram. All timestamps are epoch milliseconds; bucket labels are UTC.

use serde::{Deserialize, Serialize};

use crate::log::{DetectionRecord, DetectionSource};
use crate::remap::VehicleType;
use crate::threat::ThreatLevel;

const HOUR_MS: u64 = 60 * 60 * 1000;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Reporting window, anchored at "now" and extending backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
}

impl TimeRange {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "1day" => Some(TimeRange::OneDay),
            "7days" => Some(TimeRange::SevenDays),
            "30days" => Some(TimeRange::ThirtyDays),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimeRange::OneDay => "1day",
            TimeRange::SevenDays => "7days",
            TimeRange::ThirtyDays => "30days",
        }
    }

    fn duration_ms(&self) -> u64 {
        self.bucket_count() as u64 * self.bucket_ms()
    }

    /// One-day reports bucket hourly, longer ranges daily.
    fn bucket_ms(&self) -> u64 {
        match self {
            TimeRange::OneDay => HOUR_MS,
            TimeRange::SevenDays | TimeRange::ThirtyDays => DAY_MS,
        }
    }

    fn bucket_count(&self) -> usize {
        match self {
            TimeRange::OneDay => 24,
            TimeRange::SevenDays => 7,
            TimeRange::ThirtyDays => 30,
        }
    }
}

/// Record filter for a report.
#[derive(Clone, Debug)]
pub struct AnalyticsFilter {
    pub range: TimeRange,
    pub vehicle_type: Option<VehicleType>,
    pub source: Option<DetectionSource>,
    pub min_confidence: f32,
}

impl AnalyticsFilter {
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            vehicle_type: None,
            source: None,
            min_confidence: 0.0,
        }
    }

    fn matches(&self, record: &DetectionRecord) -> bool {
        if let Some(vehicle_type) = self.vehicle_type {
            if record.vehicle_type != vehicle_type {
                return false;
            }
        }
        if let Some(source) = self.source {
            if record.source != source {
                return false;
            }
        }
        record.confidence >= self.min_confidence
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TimelineBucket {
    pub label: String,
    pub count: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct LabeledCount {
    pub label: String,
    pub count: usize,
}

/// Aggregated report for one filter.
#[derive(Clone, Debug, Serialize)]
pub struct AnalyticsReport {
    pub range: TimeRange,
    pub total_detections: usize,
    /// Mean confidence of matched records; 0 when none matched.
    pub average_confidence: f32,
    /// Oldest bucket first.
    pub timeline: Vec<TimelineBucket>,
    pub vehicle_types: Vec<LabeledCount>,
    /// Five 20%-wide confidence bins.
    pub confidence_histogram: Vec<LabeledCount>,
    pub threat_levels: Vec<LabeledCount>,
}

/// Aggregate `records` into a report. `now_ms` anchors the window so
/// reports are reproducible in tests.
pub fn aggregate(
    records: &[DetectionRecord],
    filter: &AnalyticsFilter,
    now_ms: u64,
) -> AnalyticsReport {
    let range = filter.range;
    let window_start = now_ms.saturating_sub(range.duration_ms());
    let bucket_ms = range.bucket_ms();
    let bucket_count = range.bucket_count();

    let matched: Vec<&DetectionRecord> = records
        .iter()
        .filter(|record| record.timestamp > window_start && record.timestamp <= now_ms)
        .filter(|record| filter.matches(record))
        .collect();

    let mut timeline: Vec<TimelineBucket> = (0..bucket_count)
        .map(|i| TimelineBucket {
            label: bucket_label(range, window_start + i as u64 * bucket_ms),
            count: 0,
        })
        .collect();
    let mut type_counts = [0usize; VehicleType::ALL.len()];
    let mut histogram = [0usize; 5];
    let mut threat_counts = [0usize; 4];
    let mut confidence_sum = 0.0f64;

    for record in &matched {
        let index = ((record.timestamp - window_start - 1) / bucket_ms) as usize;
        timeline[index.min(bucket_count - 1)].count += 1;

        if let Some(pos) = VehicleType::ALL
            .iter()
            .position(|t| *t == record.vehicle_type)
        {
            type_counts[pos] += 1;
        }

        let bin = ((record.confidence.clamp(0.0, 1.0) * 100.0) as usize / 20).min(4);
        histogram[bin] += 1;

        let level = match record.threat_level {
            ThreatLevel::None => 0,
            ThreatLevel::Low => 1,
            ThreatLevel::Medium => 2,
            ThreatLevel::High => 3,
        };
        threat_counts[level] += 1;

        confidence_sum += record.confidence as f64;
    }

    let average_confidence = if matched.is_empty() {
        0.0
    } else {
        (confidence_sum / matched.len() as f64) as f32
    };

    AnalyticsReport {
        range,
        total_detections: matched.len(),
        average_confidence,
        timeline,
        vehicle_types: VehicleType::ALL
            .iter()
            .zip(type_counts)
            .map(|(t, count)| LabeledCount {
                label: t.display_name().to_string(),
                count,
            })
            .collect(),
        confidence_histogram: (0..5)
            .map(|bin| LabeledCount {
                label: format!("{}-{}%", bin * 20, (bin + 1) * 20),
                count: histogram[bin],
            })
            .collect(),
        threat_levels: ["none", "low", "medium", "high"]
            .iter()
            .zip(threat_counts)
            .map(|(label, count)| LabeledCount {
                label: label.to_string(),
                count,
            })
            .collect(),
    }
}

/// UTC label for the bucket starting at `start_ms`: `HH:00` for hourly
/// buckets, `YYYY-MM-DD` for daily ones.
fn bucket_label(range: TimeRange, start_ms: u64) -> String {
    match range {
        TimeRange::OneDay => {
            let hour = (start_ms / HOUR_MS) % 24;
            format!("{:02}:00", hour)
        }
        TimeRange::SevenDays | TimeRange::ThirtyDays => {
            let (year, month, day) = civil_from_days((start_ms / DAY_MS) as i64);
            format!("{:04}-{:02}-{:02}", year, month, day)
        }
    }
}

/// Days since 1970-01-01 to a civil (year, month, day), proleptic Gregorian.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;

    // 2026-08-28 12:00:00 UTC
    const NOW_MS: u64 = 1_787_918_400_000;

    fn record_at(ts: u64, vehicle_type: VehicleType, confidence: f32) -> DetectionRecord {
        let mut record = DetectionRecord::new(
            vehicle_type,
            confidence,
            Some(BBox::new(0.0, 0.0, 100.0, 100.0)),
            ThreatLevel::Low,
            DetectionSource::Live,
        );
        record.timestamp = ts;
        record
    }

    #[test]
    fn civil_dates_are_correct() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
        // Leap day
        assert_eq!(civil_from_days(19_782), (2024, 2, 29));
    }

    #[test]
    fn empty_input_yields_zeroed_report() {
        let report = aggregate(&[], &AnalyticsFilter::new(TimeRange::OneDay), NOW_MS);
        assert_eq!(report.total_detections, 0);
        assert_eq!(report.average_confidence, 0.0);
        assert_eq!(report.timeline.len(), 24);
        assert!(report.timeline.iter().all(|b| b.count == 0));
    }

    #[test]
    fn records_outside_the_window_are_dropped() {
        let records = vec![
            record_at(NOW_MS - 2 * DAY_MS, VehicleType::TankMilitaryVehicle, 0.9),
            record_at(NOW_MS - HOUR_MS, VehicleType::TankMilitaryVehicle, 0.7),
        ];
        let report = aggregate(&records, &AnalyticsFilter::new(TimeRange::OneDay), NOW_MS);
        assert_eq!(report.total_detections, 1);
        assert_eq!(report.average_confidence, 0.7);
    }

    #[test]
    fn timeline_has_one_bucket_per_hour_oldest_first() {
        let records = vec![
            record_at(NOW_MS - 30_000, VehicleType::FighterJet, 0.8),
            record_at(NOW_MS - 23 * HOUR_MS - 30_000, VehicleType::FighterJet, 0.8),
        ];
        let report = aggregate(&records, &AnalyticsFilter::new(TimeRange::OneDay), NOW_MS);
        assert_eq!(report.timeline.len(), 24);
        assert_eq!(report.timeline[0].count, 1);
        assert_eq!(report.timeline[23].count, 1);
        // Window ends at 12:00, so the newest bucket starts at 11:00.
        assert_eq!(report.timeline[23].label, "11:00");
        assert_eq!(report.timeline[0].label, "12:00");
    }

    #[test]
    fn daily_ranges_bucket_by_date() {
        let records = vec![record_at(NOW_MS - 30_000, VehicleType::NavalShip, 0.6)];
        let report = aggregate(&records, &AnalyticsFilter::new(TimeRange::SevenDays), NOW_MS);
        assert_eq!(report.timeline.len(), 7);
        assert_eq!(report.timeline[6].count, 1);
        assert_eq!(report.timeline[6].label, "2026-08-27");

        let report = aggregate(&records, &AnalyticsFilter::new(TimeRange::ThirtyDays), NOW_MS);
        assert_eq!(report.timeline.len(), 30);
        assert_eq!(report.timeline[29].count, 1);
    }

    #[test]
    fn vehicle_type_and_source_filters_narrow() {
        let mut image_record = record_at(NOW_MS - 1000, VehicleType::MilitaryTruck, 0.9);
        image_record.source = DetectionSource::Image;
        let records = vec![
            record_at(NOW_MS - 1000, VehicleType::TankMilitaryVehicle, 0.9),
            image_record,
        ];

        let mut filter = AnalyticsFilter::new(TimeRange::OneDay);
        filter.vehicle_type = Some(VehicleType::MilitaryTruck);
        assert_eq!(aggregate(&records, &filter, NOW_MS).total_detections, 1);

        let mut filter = AnalyticsFilter::new(TimeRange::OneDay);
        filter.source = Some(DetectionSource::Live);
        assert_eq!(aggregate(&records, &filter, NOW_MS).total_detections, 1);
    }

    #[test]
    fn min_confidence_is_inclusive() {
        let records = vec![record_at(NOW_MS - 1000, VehicleType::NavalShip, 0.5)];
        let mut filter = AnalyticsFilter::new(TimeRange::OneDay);
        filter.min_confidence = 0.5;
        assert_eq!(aggregate(&records, &filter, NOW_MS).total_detections, 1);
        filter.min_confidence = 0.51;
        assert_eq!(aggregate(&records, &filter, NOW_MS).total_detections, 0);
    }

    #[test]
    fn histogram_bins_are_twenty_percent_wide() {
        let records = vec![
            record_at(NOW_MS - 1000, VehicleType::NavalShip, 0.05),
            record_at(NOW_MS - 1000, VehicleType::NavalShip, 0.55),
            record_at(NOW_MS - 1000, VehicleType::NavalShip, 0.85),
            record_at(NOW_MS - 1000, VehicleType::NavalShip, 1.0),
        ];
        let report = aggregate(&records, &AnalyticsFilter::new(TimeRange::OneDay), NOW_MS);
        let counts: Vec<usize> = report.confidence_histogram.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 0, 1, 0, 2]);
        assert_eq!(report.confidence_histogram[4].label, "80-100%");
    }

    #[test]
    fn threat_counts_cover_every_level() {
        let mut high = record_at(NOW_MS - 1000, VehicleType::TankMilitaryVehicle, 0.95);
        high.threat_level = ThreatLevel::High;
        let low = record_at(NOW_MS - 1000, VehicleType::NavalShip, 0.6);
        let report = aggregate(&[high, low], &AnalyticsFilter::new(TimeRange::OneDay), NOW_MS);
        let by_label: Vec<(String, usize)> = report
            .threat_levels
            .iter()
            .map(|c| (c.label.clone(), c.count))
            .collect();
        assert_eq!(
            by_label,
            vec![
                ("none".to_string(), 0),
                ("low".to_string(), 1),
                ("medium".to_string(), 0),
                ("high".to_string(), 1),
            ]
        );
    }
}
