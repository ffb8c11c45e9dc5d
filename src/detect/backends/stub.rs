use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BBox, RawDetection};

/// Labels the stub can emit. A slice of the COCO vocabulary weighted toward
/// vehicle classes so synthetic runs exercise the remap table.
const STUB_LABELS: [&str; 8] = [
    "car", "truck", "airplane", "boat", "train", "person", "bicycle", "bird",
];

/// Stub backend for demos and tests.
///
/// Derives detections from a SHA-256 digest of the frame, so identical pixel
/// content always yields identical detections and no model file is needed.
pub struct StubBackend {
    loaded: bool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { loaded: false }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn load_model(&mut self, on_progress: &mut dyn FnMut(u8)) -> Result<()> {
        // Nothing to fetch; report the same coarse milestones a real load has.
        on_progress(30);
        self.loaded = true;
        on_progress(100);
        Ok(())
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>> {
        if !self.loaded {
            return Err(anyhow!("stub model not loaded"));
        }

        let digest: [u8; 32] = Sha256::digest(pixels).into();

        // Low digest byte picks how busy the synthetic scene is.
        let count = match digest[0] % 8 {
            0 | 1 | 2 => 0,
            3 | 4 => 1,
            5 | 6 => 2,
            _ => 3,
        };

        let w = width as f32;
        let h = height as f32;
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let seed = &digest[i * 8..i * 8 + 8];
            let label = STUB_LABELS[seed[1] as usize % STUB_LABELS.len()];
            let score = 0.30 + (seed[2] as f32 / 255.0) * 0.69;
            let bw = (40.0 + (seed[3] as f32 / 255.0) * w * 0.6).min(w);
            let bh = (40.0 + (seed[4] as f32 / 255.0) * h * 0.6).min(h);
            let x = (seed[5] as f32 / 255.0) * (w - bw).max(0.0);
            let y = (seed[6] as f32 / 255.0) * (h - bh).max(0.0);
            out.push(RawDetection::new(label, score, BBox::new(x, y, bw, bh)));
        }
        Ok(out)
    }

    fn labels(&self) -> &[&'static str] {
        &STUB_LABELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_stub() -> StubBackend {
        let mut backend = StubBackend::new();
        backend.load_model(&mut |_| {}).unwrap();
        backend
    }

    #[test]
    fn detect_before_load_fails() {
        let mut backend = StubBackend::new();
        assert!(backend.detect(&[0u8; 12], 2, 2).is_err());
    }

    #[test]
    fn identical_frames_yield_identical_detections() {
        let mut backend = loaded_stub();
        let pixels = vec![7u8; 640 * 480 * 3];
        let a = backend.detect(&pixels, 640, 480).unwrap();
        let b = backend.detect(&pixels, 640, 480).unwrap();
        assert_eq!(a.len(), b.len());
        for (da, db) in a.iter().zip(&b) {
            assert_eq!(da.label, db.label);
            assert_eq!(da.score, db.score);
            assert_eq!(da.bbox, db.bbox);
        }
    }

    #[test]
    fn detections_stay_inside_the_frame() {
        let mut backend = loaded_stub();
        for fill in 0u8..32 {
            let pixels = vec![fill; 320 * 240 * 3];
            for det in backend.detect(&pixels, 320, 240).unwrap() {
                assert!(det.bbox.x >= 0.0 && det.bbox.y >= 0.0);
                assert!(det.bbox.x + det.bbox.width <= 320.0 + f32::EPSILON);
                assert!(det.bbox.y + det.bbox.height <= 240.0 + f32::EPSILON);
                assert!(det.score >= 0.30 && det.score <= 0.99);
                assert!(STUB_LABELS.contains(&det.label.as_str()));
            }
        }
    }

    #[test]
    fn load_reports_terminal_progress() {
        let mut backend = StubBackend::new();
        let mut seen = Vec::new();
        backend.load_model(&mut |pct| seen.push(pct)).unwrap();
        assert_eq!(seen, vec![30, 100]);
    }
}
