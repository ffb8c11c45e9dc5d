//! Pipeline error taxonomy.
//!
//! Failures that callers make policy decisions about carry a stable code so
//! the decision point does not have to parse message text. The codes travel
//! inside `anyhow::Error`; recover them with [`error_code`].

use anyhow::Error;

/// Detector model failed to load (missing file, bad network, backend fault).
/// Fatal to any detection session until the load is retried.
pub const MODEL_LOAD_ERROR: &str = "ModelLoadError";
/// `detect` called before `load` completed. Caller bug, never recovered
/// silently.
pub const MODEL_NOT_LOADED: &str = "ModelNotLoaded";
/// One inference call failed. The sampling loop skips the frame and continues.
pub const DETECTION_ERROR: &str = "DetectionError";
/// Capture device missing, busy, or refused. The session stays idle.
pub const CAMERA_ACCESS_ERROR: &str = "CameraAccessError";
/// Persistence write failed. The log keeps its in-memory copy and carries on.
pub const STORAGE_QUOTA_ERROR: &str = "StorageQuotaError";

/// Machine-readable pipeline failure.
#[derive(Clone, Debug)]
pub struct PipelineError {
    pub code: &'static str,
    pub message: String,
}

impl PipelineError {
    pub fn model_load(message: impl Into<String>) -> Self {
        Self {
            code: MODEL_LOAD_ERROR,
            message: message.into(),
        }
    }

    pub fn model_not_loaded() -> Self {
        Self {
            code: MODEL_NOT_LOADED,
            message: "detect called before model load completed".to_string(),
        }
    }

    pub fn detection(message: impl Into<String>) -> Self {
        Self {
            code: DETECTION_ERROR,
            message: message.into(),
        }
    }

    pub fn camera_access(message: impl Into<String>) -> Self {
        Self {
            code: CAMERA_ACCESS_ERROR,
            message: message.into(),
        }
    }

    pub fn storage_quota(message: impl Into<String>) -> Self {
        Self {
            code: STORAGE_QUOTA_ERROR,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PipelineError {}

/// Stable code of the `PipelineError` behind an `anyhow::Error`, if any.
pub fn error_code(err: &Error) -> Option<&'static str> {
    err.downcast_ref::<PipelineError>().map(|e| e.code)
}

/// True when the error carries the given pipeline code.
pub fn has_code(err: &Error, code: &str) -> bool {
    error_code(err) == Some(code)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
