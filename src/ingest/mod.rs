//! Frame ingestion sources.
//!
//! Sources produce owned RGB `Frame`s for the detection session:
//! - `stub://` synthetic camera (always available, deterministic-ish scenes)
//! - local V4L2 devices (feature: ingest-v4l2)
//! - image files for batch analysis (feature: image-analysis)
//!
//! A live source is exclusively owned by one session and must be released on
//! every exit path so the underlying capture device is never leaked.

pub mod camera;
#[cfg(feature = "image-analysis")]
pub mod image;

pub use camera::{enumerate_devices, CameraConfig, CameraSource};

use anyhow::Result;

use crate::frame::Frame;

/// Live frame-source capability consumed by the detection session.
pub trait FrameSource: Send {
    /// Acquire the underlying device. Fails with `CameraAccessError` when
    /// the device is missing, busy, or refused.
    fn connect(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Release the underlying device. Idempotent.
    fn release(&mut self);

    fn is_healthy(&self) -> bool {
        true
    }
}
