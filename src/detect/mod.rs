mod adapter;
mod backend;
mod backends;
mod registry;
mod result;

pub use adapter::DetectorAdapter;
pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::BackendRegistry;
pub use result::{BBox, RawDetection};
