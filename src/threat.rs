//! Threat scorer.
//!
//! Derives a discrete threat level from a detection set's cardinality and
//! maximum confidence. The rule is evaluated top-down, first match wins.
//!
//! The rule has a known gap: two detections whose maximum score sits below
//! 0.7 fall through every branch to `None`. That is the shipped behavior and
//! is pinned by test, not corrected here.

use serde::{Deserialize, Serialize};

use crate::remap::MilitaryDetection;

/// Discrete threat severity. Ordering follows severity, `None` lowest.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::None => "none",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest score in the set, 0.0 when empty.
pub fn max_score(detections: &[MilitaryDetection]) -> f32 {
    detections.iter().fold(0.0_f32, |acc, d| acc.max(d.score))
}

/// Score a detection set. First matching branch wins.
pub fn score_threat(detections: &[MilitaryDetection]) -> ThreatLevel {
    if detections.is_empty() {
        return ThreatLevel::None;
    }

    let count = detections.len();
    let max = max_score(detections);

    if count >= 3 || max > 0.9 {
        return ThreatLevel::High;
    }
    if (1..=2).contains(&count) && (0.7..=0.9).contains(&max) {
        return ThreatLevel::Medium;
    }
    if count == 1 && (0.5..0.7).contains(&max) {
        return ThreatLevel::Low;
    }

    ThreatLevel::None
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;
    use crate::remap::VehicleType;

    fn det(score: f32) -> MilitaryDetection {
        MilitaryDetection {
            vehicle_type: VehicleType::TankMilitaryVehicle,
            score,
            bbox: BBox::new(0.0, 0.0, 100.0, 100.0),
        }
    }

    #[test]
    fn empty_set_is_none() {
        assert_eq!(score_threat(&[]), ThreatLevel::None);
    }

    #[test]
    fn three_detections_are_high_at_any_confidence() {
        assert_eq!(
            score_threat(&[det(0.1), det(0.1), det(0.1)]),
            ThreatLevel::High
        );
        assert_eq!(
            score_threat(&[det(0.99), det(0.5), det(0.3), det(0.2)]),
            ThreatLevel::High
        );
    }

    #[test]
    fn single_detection_bands() {
        assert_eq!(score_threat(&[det(0.95)]), ThreatLevel::High);
        assert_eq!(score_threat(&[det(0.75)]), ThreatLevel::Medium);
        assert_eq!(score_threat(&[det(0.55)]), ThreatLevel::Low);
        assert_eq!(score_threat(&[det(0.3)]), ThreatLevel::None);
    }

    #[test]
    fn band_boundaries() {
        // 0.9 is Medium (High requires strictly greater)
        assert_eq!(score_threat(&[det(0.9)]), ThreatLevel::Medium);
        assert_eq!(score_threat(&[det(0.7)]), ThreatLevel::Medium);
        // 0.7 exclusive upper bound for Low
        assert_eq!(score_threat(&[det(0.5)]), ThreatLevel::Low);
        assert_eq!(score_threat(&[det(0.69)]), ThreatLevel::Low);
    }

    #[test]
    fn high_score_short_circuits_count() {
        assert_eq!(score_threat(&[det(0.95), det(0.1)]), ThreatLevel::High);
    }

    #[test]
    fn two_moderate_detections_fall_through_to_none() {
        // Known rule gap: two detections below the Medium band score no
        // threat at all. Shipped behavior, kept as-is.
        assert_eq!(score_threat(&[det(0.65), det(0.6)]), ThreatLevel::None);
    }

    #[test]
    fn severity_ordering() {
        assert!(ThreatLevel::High > ThreatLevel::Medium);
        assert!(ThreatLevel::Medium > ThreatLevel::Low);
        assert!(ThreatLevel::Low > ThreatLevel::None);
    }

    #[test]
    fn threat_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ThreatLevel::High).unwrap(),
            "\"high\""
        );
        let back: ThreatLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, ThreatLevel::Medium);
    }
}
