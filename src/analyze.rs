//! Batch image analysis.
//!
//! A batch is at most ten vetted image files pushed through the same
//! detection pipeline as live frames. Images are analyzed one at a time; a
//! failure marks that image `error` and the batch continues. Accepted
//! detections are persisted with `source = image` and the originating file
//! name, and the batch verdict is the threat score over the union of every
//! image's detections.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::detect::DetectorAdapter;
use crate::ingest::image::{load_image_frame, validate_image_file};
use crate::log::{DetectionLog, DetectionRecord, DetectionSource};
use crate::remap::{remap_and_filter, MilitaryDetection};
use crate::storage::KvStore;
use crate::threat::{score_threat, ThreatLevel};

/// Upper bound on files per batch.
pub const MAX_BATCH_FILES: usize = 10;

/// Per-image lifecycle within a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// One image in a batch.
#[derive(Clone, Debug, Serialize)]
pub struct BatchImage {
    pub path: PathBuf,
    pub status: ImageStatus,
    pub detections: Vec<MilitaryDetection>,
    pub threat: ThreatLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchImage {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            status: ImageStatus::Pending,
            detections: Vec::new(),
            threat: ThreatLevel::None,
            error: None,
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Batch verdict.
#[derive(Clone, Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub analyzed: usize,
    pub errors: usize,
    pub total_detections: usize,
    /// Threat over the union of all detections in the batch.
    pub batch_threat: ThreatLevel,
    pub images: Vec<BatchImage>,
}

/// A vetted set of image files awaiting analysis.
pub struct ImageBatch {
    images: Vec<BatchImage>,
    confidence_threshold: f32,
}

impl ImageBatch {
    /// Vet `paths` up front: the batch cap, extensions, and file sizes are
    /// all enforced before any decode or inference runs.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], confidence_threshold: f32) -> Result<Self> {
        if paths.is_empty() {
            return Err(anyhow!("batch contains no image files"));
        }
        if paths.len() > MAX_BATCH_FILES {
            return Err(anyhow!(
                "batch has {} files, limit is {}",
                paths.len(),
                MAX_BATCH_FILES
            ));
        }
        for path in paths {
            validate_image_file(path.as_ref())?;
        }
        Ok(Self {
            images: paths
                .iter()
                .map(|path| BatchImage::new(path.as_ref().to_path_buf()))
                .collect(),
            confidence_threshold,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Run the batch. Per-image failures are recorded, not propagated; the
    /// returned summary covers every file.
    pub fn analyze(
        mut self,
        adapter: &mut DetectorAdapter,
        detection_log: &mut DetectionLog,
        store: &mut dyn KvStore,
    ) -> BatchSummary {
        let mut union: Vec<MilitaryDetection> = Vec::new();

        for image in &mut self.images {
            image.status = ImageStatus::Processing;
            match analyze_one(adapter, &image.path, self.confidence_threshold) {
                Ok(detections) => {
                    image.threat = score_threat(&detections);
                    for detection in &detections {
                        detection_log.append(
                            store,
                            DetectionRecord::new(
                                detection.vehicle_type,
                                detection.score,
                                Some(detection.bbox),
                                image.threat,
                                DetectionSource::Image,
                            )
                            .with_image_ref(image.file_name()),
                        );
                    }
                    union.extend(detections.iter().cloned());
                    image.detections = detections;
                    image.status = ImageStatus::Completed;
                }
                Err(e) => {
                    log::warn!("image analysis failed for {}: {:#}", image.path.display(), e);
                    image.error = Some(format!("{:#}", e));
                    image.status = ImageStatus::Error;
                }
            }
        }

        let analyzed = self
            .images
            .iter()
            .filter(|image| image.status == ImageStatus::Completed)
            .count();
        let errors = self.images.len() - analyzed;
        BatchSummary {
            total: self.images.len(),
            analyzed,
            errors,
            total_detections: union.len(),
            batch_threat: score_threat(&union),
            images: self.images,
        }
    }
}

fn analyze_one(
    adapter: &mut DetectorAdapter,
    path: &Path,
    confidence_threshold: f32,
) -> Result<Vec<MilitaryDetection>> {
    let frame = load_image_frame(path)?;
    let raw = adapter.detect(&frame)?;
    Ok(remap_and_filter(&raw, confidence_threshold))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
