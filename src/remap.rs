//! Military remap & filter stage.
//!
//! A pretrained general-object detector has no military classes, so this
//! stage substitutes a fixed label remap: five generic vehicle labels map to
//! the military taxonomy, everything else is dropped. A per-type acceptance
//! rule then rejects weak matches; the tank rule additionally requires a
//! minimum box area because small "car" boxes are almost never armor.
//!
//! The filter is stable (input order preserved) and performs no non-max
//! suppression of overlapping boxes.

use serde::{Deserialize, Serialize};

use crate::detect::{BBox, RawDetection};

/// Fixed military-vehicle taxonomy.
///
/// Serialized forms are the display strings persisted in detection records
/// and matched exactly by the analytics filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[serde(rename = "Tank/Military Vehicle")]
    TankMilitaryVehicle,
    #[serde(rename = "Military Truck")]
    MilitaryTruck,
    #[serde(rename = "Fighter Jet")]
    FighterJet,
    #[serde(rename = "Naval Ship")]
    NavalShip,
    #[serde(rename = "Military Train")]
    MilitaryTrain,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [
        VehicleType::TankMilitaryVehicle,
        VehicleType::MilitaryTruck,
        VehicleType::FighterJet,
        VehicleType::NavalShip,
        VehicleType::MilitaryTrain,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            VehicleType::TankMilitaryVehicle => "Tank/Military Vehicle",
            VehicleType::MilitaryTruck => "Military Truck",
            VehicleType::FighterJet => "Fighter Jet",
            VehicleType::NavalShip => "Naval Ship",
            VehicleType::MilitaryTrain => "Military Train",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|vehicle_type| vehicle_type.display_name() == name)
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A raw detection after remap into the military taxonomy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MilitaryDetection {
    pub vehicle_type: VehicleType,
    pub score: f32,
    pub bbox: BBox,
}

/// Generic detector label → taxonomy entry. Labels absent here never become
/// military detections.
const REMAP_TABLE: [(&str, VehicleType); 5] = [
    ("car", VehicleType::TankMilitaryVehicle),
    ("truck", VehicleType::MilitaryTruck),
    ("airplane", VehicleType::FighterJet),
    ("boat", VehicleType::NavalShip),
    ("train", VehicleType::MilitaryTrain),
];

/// Minimum box area (px²) for the tank class. Larger boxes are more likely
/// to be military-scale vehicles.
pub const TANK_MIN_AREA_PX: f32 = 5000.0;
/// Score floor for the tank class, applied together with the area rule.
pub const TANK_MIN_SCORE: f32 = 0.3;
/// Score floor for every other taxonomy class.
pub const OTHER_MIN_SCORE: f32 = 0.4;

/// Taxonomy entry for a generic detector label, if any.
pub fn remap_label(label: &str) -> Option<VehicleType> {
    REMAP_TABLE
        .iter()
        .find(|(source, _)| *source == label)
        .map(|(_, vehicle_type)| *vehicle_type)
}

/// Remap raw detections into the military taxonomy and filter.
///
/// `confidence_threshold` is the caller-supplied floor from settings; it is
/// applied on top of the per-type acceptance rules. Output preserves input
/// order and never exceeds input length.
pub fn remap_and_filter(raw: &[RawDetection], confidence_threshold: f32) -> Vec<MilitaryDetection> {
    raw.iter()
        .filter_map(|det| {
            let vehicle_type = remap_label(&det.label)?;
            let accepted = match vehicle_type {
                VehicleType::TankMilitaryVehicle => {
                    det.bbox.area() > TANK_MIN_AREA_PX && det.score > TANK_MIN_SCORE
                }
                _ => det.score > OTHER_MIN_SCORE,
            };
            if !accepted || det.score < confidence_threshold {
                return None;
            }
            Some(MilitaryDetection {
                vehicle_type,
                score: det.score,
                bbox: det.bbox,
            })
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: &str, score: f32, w: f32, h: f32) -> RawDetection {
        RawDetection::new(label, score, BBox::new(0.0, 0.0, w, h))
    }

    #[test]
    fn unmapped_labels_never_pass() {
        let input = vec![
            raw("person", 0.99, 500.0, 500.0),
            raw("bicycle", 0.99, 500.0, 500.0),
            raw("dog", 0.99, 500.0, 500.0),
        ];
        assert!(remap_and_filter(&input, 0.0).is_empty());
    }

    #[test]
    fn tank_rule_requires_area_and_score() {
        // area 10000 > 5000, score above both floors
        let big = vec![raw("car", 0.95, 100.0, 100.0)];
        let out = remap_and_filter(&big, 0.5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].vehicle_type, VehicleType::TankMilitaryVehicle);
        assert_eq!(out[0].score, 0.95);

        // area 2500 < 5000, rejected regardless of score
        let small = vec![raw("car", 0.95, 50.0, 50.0)];
        assert!(remap_and_filter(&small, 0.5).is_empty());

        // area ok, score at the 0.3 floor (rule is strict greater-than)
        let weak = vec![raw("car", 0.3, 100.0, 100.0)];
        assert!(remap_and_filter(&weak, 0.0).is_empty());
    }

    #[test]
    fn non_tank_classes_use_score_floor_only() {
        let input = vec![
            raw("airplane", 0.45, 10.0, 10.0),
            raw("boat", 0.4, 500.0, 500.0),
            raw("truck", 0.41, 5.0, 5.0),
            raw("train", 0.9, 5.0, 5.0),
        ];
        let out = remap_and_filter(&input, 0.0);
        let types: Vec<_> = out.iter().map(|d| d.vehicle_type).collect();
        assert_eq!(
            types,
            vec![
                VehicleType::FighterJet,
                VehicleType::MilitaryTruck,
                VehicleType::MilitaryTrain
            ]
        );
    }

    #[test]
    fn caller_threshold_is_an_additional_floor() {
        let input = vec![raw("airplane", 0.55, 10.0, 10.0)];
        assert_eq!(remap_and_filter(&input, 0.5).len(), 1);
        assert!(remap_and_filter(&input, 0.6).is_empty());
        // threshold is >=, not >
        assert_eq!(remap_and_filter(&input, 0.55).len(), 1);
    }

    #[test]
    fn output_is_stable_and_never_longer_than_input() {
        let input = vec![
            raw("train", 0.8, 10.0, 10.0),
            raw("person", 0.9, 10.0, 10.0),
            raw("car", 0.9, 100.0, 100.0),
            raw("boat", 0.7, 10.0, 10.0),
        ];
        let out = remap_and_filter(&input, 0.0);
        assert!(out.len() <= input.len());
        let types: Vec<_> = out.iter().map(|d| d.vehicle_type).collect();
        assert_eq!(
            types,
            vec![
                VehicleType::MilitaryTrain,
                VehicleType::TankMilitaryVehicle,
                VehicleType::NavalShip
            ]
        );
    }

    #[test]
    fn display_names_round_trip() {
        for vehicle_type in VehicleType::ALL {
            assert_eq!(
                VehicleType::from_display_name(vehicle_type.display_name()),
                Some(vehicle_type)
            );
        }
        assert_eq!(VehicleType::from_display_name("Tractor"), None);
    }

    #[test]
    fn vehicle_type_serializes_as_display_string() {
        let json = serde_json::to_string(&VehicleType::TankMilitaryVehicle).unwrap();
        assert_eq!(json, "\"Tank/Military Vehicle\"");
        let back: VehicleType = serde_json::from_str("\"Naval Ship\"").unwrap();
        assert_eq!(back, VehicleType::NavalShip);
    }
}
