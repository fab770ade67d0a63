/// Errors surfaced by frame buffer management, conversion, and capture.
///
/// Per-frame failures (e.g. `Compress`) are recovered by the caller (the
/// Pipeline Coordinator drops the frame and forces the next keyframe);
/// `StartFailed` is a session-lifecycle error that ends the session.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture source failed to start: {0}")]
    StartFailed(String),

    #[error("lz4 compression failed for frame {seq}: {source}")]
    Compress { seq: u32, #[source] source: lz4_flex::block::CompressError },
}
