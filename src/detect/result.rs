use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in source-frame pixel space, origin top-left.
///
/// Serializes as the `[x, y, width, height]` array every persisted artifact
/// uses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box area in square pixels.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// One raw detection as produced by a backend.
///
/// Ephemeral: produced per inference call, consumed by the remap stage, never
/// persisted as-is.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawDetection {
    /// Generic label in the backend's vocabulary (e.g. "car", "truck").
    pub label: String,
    /// Confidence in [0, 1].
    pub score: f32,
    pub bbox: BBox,
}

impl RawDetection {
    pub fn new(label: impl Into<String>, score: f32, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            score,
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_area_is_width_times_height() {
        assert_eq!(BBox::new(0.0, 0.0, 100.0, 100.0).area(), 10_000.0);
        assert_eq!(BBox::new(5.0, 7.0, 50.0, 50.0).area(), 2_500.0);
    }

    #[test]
    fn bbox_serializes_as_array() {
        let json = serde_json::to_string(&BBox::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BBox = serde_json::from_str("[1,2,3,4]").unwrap();
        assert_eq!(back, BBox::new(1.0, 2.0, 3.0, 4.0));
    }
}
