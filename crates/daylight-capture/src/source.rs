//! Capture source abstraction (spec §4.6, §9).
//!
//! Platform capture is expressed as a trait with a single frame-delivery
//! channel rather than a delegate/callback object, so the core pipeline is
//! testable against [`ScriptedCaptureSource`] without any platform capture
//! API in the loop.

use std::sync::mpsc::Receiver;
use std::time::Instant;

use crate::error::CaptureError;

/// One BGRA frame as delivered by a capture source: top-left origin, row
/// stride that may exceed `width * 4` because of per-row padding.
#[derive(Debug, Clone)]
pub struct CapturedBgraFrame {
    pub data: Vec<u8>,
    pub stride: u32,
    pub timestamp: Instant,
}

/// A running capture. Owns the underlying platform capture handle.
///
/// `stop` is synchronous and idempotent: calling it twice, or dropping the
/// session after calling it once, has no additional effect.
pub struct CaptureSession {
    stop_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl CaptureSession {
    #[must_use]
    pub fn new(stop_fn: impl FnOnce() + Send + 'static) -> Self {
        Self { stop_fn: Some(Box::new(stop_fn)) }
    }

    pub fn stop(&mut self) {
        if let Some(f) = self.stop_fn.take() {
            f();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession").field("running", &self.stop_fn.is_some()).finish()
    }
}

/// Adapter over a platform capture API. Implementations deliver frames on
/// a dedicated thread at approximately `fps` Hz via the returned channel,
/// dropping frames rather than buffering them when the consumer is slow
/// (spec §4.6: keep the queue depth small, 2 is a reasonable default).
pub trait CaptureSource: Send {
    /// Start capturing at `width`×`height`, targeting `fps`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::StartFailed`] if the underlying capture API
    /// could not be initialized; this is a fatal session-lifecycle error.
    fn start(
        self: Box<Self>,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<(CaptureSession, Receiver<CapturedBgraFrame>), CaptureError>;
}

/// Opaque handle to the platform's chosen mirrored display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayId(pub u64);

/// Produces the display identifier the capture source should mirror. The
/// actual virtual-display creation mechanism is platform-specific and
/// outside the core (spec §1); this trait is the seam the core depends on.
pub trait DisplayProvider: Send {
    /// # Errors
    ///
    /// Returns [`CaptureError::StartFailed`] if no suitable display target
    /// could be located.
    fn target_display_id(&self) -> Result<DisplayId, CaptureError>;
}

/// A capture source that replays a fixed, in-memory sequence of BGRA
/// frames at roughly the requested cadence. Used by tests and by the
/// daemon's `--static-display`-style fallback / scripted demos instead of
/// a real platform capture API.
pub struct ScriptedCaptureSource {
    frames: Vec<CapturedBgraFrame>,
}

impl ScriptedCaptureSource {
    #[must_use]
    pub fn new(frames: Vec<CapturedBgraFrame>) -> Self {
        Self { frames }
    }
}

impl CaptureSource for ScriptedCaptureSource {
    fn start(
        self: Box<Self>,
        _width: u32,
        _height: u32,
        fps: u32,
    ) -> Result<(CaptureSession, Receiver<CapturedBgraFrame>), CaptureError> {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::mpsc::sync_channel;
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let (tx, rx) = sync_channel(2);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker_flag = Arc::clone(&stop_flag);
        let frames = self.frames;
        let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));

        let handle = thread::spawn(move || {
            for frame in frames {
                if worker_flag.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(frame).is_err() {
                    break;
                }
                thread::sleep(period);
            }
        });

        let session = CaptureSession::new(move || {
            stop_flag.store(true, Ordering::Relaxed);
            let _ = handle.join();
        });

        Ok((session, rx))
    }
}
