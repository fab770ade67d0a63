use std::collections::VecDeque;
use std::net::SocketAddr;
use std::time::Instant;

/// Compare two sequence numbers with unsigned wraparound semantics: `new`
/// is treated as newer than or equal to `old` unless it lags by more than
/// half the `u32` space. Mirrors TCP's PAWS-style sequence comparison
/// (spec §4.5: "replaces only if it is not older than the stored value
/// modulo 2^32").
#[must_use]
pub fn seq_is_newer_or_equal(new: u32, old: u32) -> bool {
    new.wrapping_sub(old) < (1u32 << 31)
}

/// Opaque per-connection identifier, distinct from the peer's socket
/// address so that reconnects from the same address never alias an old
/// client's table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Ring buffer of outstanding send timestamps, keyed by `seq % 128`
/// (spec §4.5: "the send timestamp table is a small ring sized to 128").
/// A slot is overwritten by whichever frame last claimed it; this is
/// correct because at most one frame with a given `seq % 128` can be in
/// flight at a time under the backpressure bounds in §4.7.
pub struct SendTimeRing {
    slots: Box<[Option<(u32, Instant)>]>,
}

const RING_LEN: usize = 128;

impl SendTimeRing {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: vec![None; RING_LEN].into_boxed_slice() }
    }

    pub fn record(&mut self, seq: u32, at: Instant) {
        self.slots[seq as usize % RING_LEN] = Some((seq, at));
    }

    /// Consume the recorded send time for `seq`, if the slot still holds
    /// that exact sequence number (it may have been overwritten by a
    /// later frame reusing the same ring slot).
    pub fn take(&mut self, seq: u32) -> Option<Instant> {
        let slot = &mut self.slots[seq as usize % RING_LEN];
        match slot {
            Some((s, at)) if *s == seq => {
                let at = *at;
                *slot = None;
                Some(at)
            }
            _ => None,
        }
    }
}

impl Default for SendTimeRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Sliding window of the most recent RTT samples for one client (spec §3:
/// "a recent RTT sample (EMA or sliding window of the last <=32 ACKs)").
pub struct RttWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RttWindow {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push_ms(&mut self, rtt_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(rtt_ms);
    }

    #[must_use]
    pub fn average_ms(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    #[must_use]
    pub fn samples(&self) -> &VecDeque<f64> {
        &self.samples
    }
}

/// Plain-value snapshot of one client's liveness, for stats aggregation
/// and external observers.
#[derive(Debug, Clone)]
pub struct ClientStats {
    pub id: ClientId,
    pub peer_addr: SocketAddr,
    pub last_acked_seq: Option<u32>,
    pub inflight: u32,
    pub rtt_avg_ms: Option<f64>,
    pub skip_count: u64,
}
