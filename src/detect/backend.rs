use anyhow::Result;

use crate::detect::result::RawDetection;

/// Detector backend trait.
///
/// A backend wraps one pretrained general-object detector. Implementations
/// own the model artifact and its runtime; the adapter owns lifecycle
/// ordering and refuses `detect` before `load_model` has completed, so
/// backends may assume the model is resident when `detect` runs.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Load the model, reporting coarse progress in `[0, 100]`.
    ///
    /// Backends report whatever milestones they have; the adapter clamps the
    /// stream to a monotone ramp ending at 100.
    fn load_model(&mut self, on_progress: &mut dyn FnMut(u8)) -> Result<()>;

    /// Run detection on a tightly packed RGB frame.
    ///
    /// Returns an empty vector when nothing is detected; `Err` means the
    /// inference call itself failed. Implementations must treat the pixel
    /// slice as read-only and ephemeral.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>>;

    /// Label vocabulary of the model, for diagnostics.
    fn labels(&self) -> &[&'static str] {
        &[]
    }
}
