use std::time::Instant;

use bytes::Bytes;
use daylight_capture::source::CapturedBgraFrame;
use daylight_capture::{bgra_to_greyscale, CaptureError, FrameBuffers};
use daylight_control::StatsCollector;
use daylight_net::{ClientTableSnapshot, FanoutServer};
use daylight_proto::{FramePacket, KEYFRAME_FLAG};

use crate::config::SessionConfig;

/// Tunables the Pipeline Coordinator needs, lifted out of
/// [`SessionConfig`] so the coordinator doesn't need the whole config
/// (port and send-queue sizing belong to the net/session wiring, not the
/// per-frame algorithm).
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    pub keyframe_interval: u32,
    pub skip_streak_threshold: u32,
}

impl From<&SessionConfig> for PipelineConfig {
    fn from(session: &SessionConfig) -> Self {
        Self {
            width: session.width,
            height: session.height,
            keyframe_interval: session.keyframe_interval.max(1),
            skip_streak_threshold: session.skip_streak_threshold,
        }
    }
}

/// Glues frame buffers, the greyscale converter, delta+compress, and the
/// fanout broadcast into the per-frame algorithm of spec §4.7. Owns all
/// state that must be serialized onto a single thread: the frame planes,
/// the sequence counter, and the forced-keyframe/skip-streak bookkeeping.
pub struct Pipeline {
    config: PipelineConfig,
    buffers: FrameBuffers,
    seq: u32,
    forced_keyframe: bool,
    skip_streak: u32,
}

/// Outcome of processing one captured frame, reported back to the caller
/// for logging/testing; the pipeline itself only needs the emitted flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Emitted { seq: u32, is_keyframe: bool },
    Dropped,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            buffers: FrameBuffers::new(config.width, config.height),
            config,
            seq: 0,
            forced_keyframe: false,
            skip_streak: 0,
        }
    }

    /// `inflight_max = max(2, min(6, floor(120 / max(rtt_avg_ms, 1))))`
    /// (spec §4.7 step 1). `rtt_avg_ms` of `None` (no clients, or no ACKs
    /// yet) is treated as 1ms — the fastest possible round trip — which
    /// yields the maximum allowance.
    #[must_use]
    pub fn inflight_max(rtt_avg_ms: Option<f64>) -> u32 {
        let rtt = rtt_avg_ms.unwrap_or(1.0).max(1.0);
        let computed = (120.0 / rtt).floor() as u32;
        computed.clamp(2, 6)
    }

    /// Process one captured BGRA frame against the current server state.
    /// Returns what happened so the caller can log or assert on it.
    pub fn process_frame(
        &mut self,
        frame: &CapturedBgraFrame,
        snapshot: &ClientTableSnapshot,
        rtt_avg_ms: Option<f64>,
        server: &FanoutServer,
        stats: &mut StatsCollector,
        now: Instant,
    ) -> FrameOutcome {
        let is_keyframe = self.seq % self.config.keyframe_interval == 0 || self.forced_keyframe;
        let inflight_max = Self::inflight_max(rtt_avg_ms);

        if !is_keyframe && snapshot.min_inflight() >= inflight_max {
            stats.record_skip();
            self.skip_streak += 1;
            if self.skip_streak > self.config.skip_streak_threshold {
                self.forced_keyframe = true;
            }
            return FrameOutcome::Dropped;
        }

        let greyscale_start = Instant::now();
        bgra_to_greyscale(
            &frame.data,
            frame.stride as usize,
            self.config.width,
            self.config.height,
            self.buffers.current_mut(),
        );
        stats.record_greyscale_ms(now, greyscale_start.elapsed().as_secs_f64() * 1000.0);

        let compress_start = Instant::now();
        let seq = self.seq;
        let encoded = self.buffers.encode_frame(seq, is_keyframe);
        match encoded {
            Ok(payload) => {
                stats.record_compress_ms(now, compress_start.elapsed().as_secs_f64() * 1000.0);
                let flags = if is_keyframe { KEYFRAME_FLAG } else { 0 };
                let packet = FramePacket::encode(seq, flags, payload);
                server.broadcast(packet, seq, is_keyframe);
                stats.record_frame_emitted(now);

                self.buffers.swap_current_previous();
                self.seq = self.seq.wrapping_add(1);
                self.forced_keyframe = false;
                self.skip_streak = 0;
                FrameOutcome::Emitted { seq, is_keyframe }
            }
            Err(CaptureError::Compress { seq, source }) => {
                tracing::warn!(seq, "compression failed, forcing keyframe next frame: {source}");
                self.forced_keyframe = true;
                FrameOutcome::Dropped
            }
            Err(e) => {
                tracing::warn!("unexpected capture error in pipeline: {e}");
                self.forced_keyframe = true;
                FrameOutcome::Dropped
            }
        }
    }

    #[must_use]
    pub fn current_seq(&self) -> u32 {
        self.seq
    }
}
