//! Frame buffers, colour conversion, delta+LZ4 encoding, and the capture
//! source abstraction for the host-side mirroring pipeline.

pub mod buffers;
pub mod delta;
pub mod error;
pub mod greyscale;
pub mod source;

pub use buffers::FrameBuffers;
pub use error::CaptureError;
pub use greyscale::bgra_to_greyscale;
pub use source::{CaptureSession, CaptureSource, CapturedBgraFrame, DisplayId, DisplayProvider, ScriptedCaptureSource};
