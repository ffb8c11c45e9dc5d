#![cfg(feature = "backend-tract")]

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BBox, RawDetection};

/// COCO class vocabulary, indexed by class id.
const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Score floor applied before results leave the backend. Low enough that the
/// remap stage's own thresholds stay the deciding ones.
const DEFAULT_MIN_SCORE: f32 = 0.25;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract-based backend for ONNX inference.
///
/// Expects a general-object detector exported with a `(1, N, 6)` output of
/// `[x1, y1, x2, y2, score, class]` rows in model-input pixel coordinates,
/// and a `(1, 3, H, W)` f32 input. Loads a local model file only; no network
/// I/O.
pub struct TractBackend {
    model_path: PathBuf,
    model: Option<RunnableModel>,
    width: u32,
    height: u32,
    min_score: f32,
}

impl TractBackend {
    /// Prepare a backend for a model file. The model is read during
    /// `load_model`, not here.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            model: None,
            width,
            height,
            min_score: DEFAULT_MIN_SCORE,
        }
    }

    /// Override the default score floor.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn decode_output(&self, outputs: TVec<TValue>) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let flat: Vec<f32> = rows.iter().cloned().collect();
        if flat.len() % 6 != 0 {
            return Err(anyhow!(
                "model output length {} is not a multiple of 6",
                flat.len()
            ));
        }

        let mut detections = Vec::new();
        for row in flat.chunks_exact(6) {
            let score = row[4];
            if !score.is_finite() || score < self.min_score {
                continue;
            }
            let class_id = row[5] as usize;
            let Some(label) = COCO_LABELS.get(class_id) else {
                continue;
            };
            let x1 = row[0].max(0.0);
            let y1 = row[1].max(0.0);
            let x2 = row[2].min(self.width as f32);
            let y2 = row[3].min(self.height as f32);
            if x2 <= x1 || y2 <= y1 {
                continue;
            }
            detections.push(RawDetection::new(
                *label,
                score.min(1.0),
                BBox::new(x1, y1, x2 - x1, y2 - y1),
            ));
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn load_model(&mut self, on_progress: &mut dyn FnMut(u8)) -> Result<()> {
        let parsed = tract_onnx::onnx()
            .model_for_path(&self.model_path)
            .with_context(|| {
                format!(
                    "failed to load ONNX model from {}",
                    self.model_path.display()
                )
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, self.height as usize, self.width as usize),
                ),
            )
            .context("failed to set input fact")?;
        on_progress(30);

        let model = parsed
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;
        self.model = Some(model);
        on_progress(100);
        Ok(())
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("tract model not loaded"))?;
        let input = self.build_input(pixels, width, height)?;
        let outputs = model.run(tvec!(input.into())).context("ONNX inference failed")?;
        self.decode_output(outputs)
    }

    fn labels(&self) -> &[&'static str] {
        &COCO_LABELS
    }
}
