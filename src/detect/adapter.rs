//! Detector adapter.
//!
//! Owns the model-load lifecycle around a backend handle: `load` is
//! idempotent and reports a clamped, monotonically non-decreasing progress
//! ramp ending at exactly 100; `detect` refuses to run before `load` has
//! completed. The adapter holds no detection state between calls.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::registry::BackendRegistry;
use crate::detect::result::RawDetection;
use crate::errors::PipelineError;
use crate::frame::Frame;

pub struct DetectorAdapter {
    backend: Arc<Mutex<dyn DetectorBackend>>,
    loaded: bool,
}

impl DetectorAdapter {
    pub fn new(backend: Arc<Mutex<dyn DetectorBackend>>) -> Self {
        Self {
            backend,
            loaded: false,
        }
    }

    /// Adapter over a registry backend: the named one, or the default.
    pub fn from_registry(registry: &BackendRegistry, name: Option<&str>) -> Result<Self> {
        let backend = match name {
            Some(name) => registry
                .get(name)
                .ok_or_else(|| anyhow!("backend '{}' not registered", name))?,
            None => registry
                .default_backend()
                .ok_or_else(|| anyhow!("no detector backend registered"))?,
        };
        Ok(Self::new(backend))
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn backend_name(&self) -> Result<&'static str> {
        let guard = self
            .backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        Ok(guard.name())
    }

    /// Load the model.
    ///
    /// Idempotent: a second call while loaded reports 100 immediately and
    /// returns. Backend progress is clamped to `[0, 100]` and forced
    /// monotone; 100 is always the final report on success. Failures carry
    /// the `ModelLoadError` code.
    pub fn load(&mut self, on_progress: &mut dyn FnMut(u8)) -> Result<()> {
        if self.loaded {
            on_progress(100);
            return Ok(());
        }

        let mut last = 0u8;
        {
            let mut guard = self
                .backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            let name = guard.name();
            guard
                .load_model(&mut |pct| {
                    let pct = pct.min(100).max(last);
                    if pct > last {
                        last = pct;
                        on_progress(pct);
                    }
                })
                .map_err(|e| {
                    PipelineError::model_load(format!("backend '{}': {:#}", name, e))
                })?;
        }
        if last < 100 {
            on_progress(100);
        }

        self.loaded = true;
        Ok(())
    }

    /// Run one inference on a frame.
    ///
    /// Fails with `ModelNotLoaded` before `load` completes and with
    /// `DetectionError` when the backend inference call itself fails. An
    /// empty vector means no detections, not failure.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        if !self.loaded {
            return Err(PipelineError::model_not_loaded().into());
        }

        let mut guard = self
            .backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard
            .detect(&frame.pixels, frame.width, frame.height)
            .map_err(|e| PipelineError::detection(format!("{:#}", e)).into())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
