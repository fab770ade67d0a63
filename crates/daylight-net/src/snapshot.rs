use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Lock-free view of the client table for the Pipeline thread (spec §5:
/// "the Pipeline thread reads a snapshot (atomic count and latest
/// `min_inflight`) via a lock-free cell updated by I/O"). The I/O side
/// updates this after every broadcast and every ACK; the Pipeline side
/// only ever reads it.
#[derive(Default)]
pub struct ClientTableSnapshot {
    client_count: AtomicUsize,
    min_inflight: AtomicU32,
}

impl ClientTableSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self { client_count: AtomicUsize::new(0), min_inflight: AtomicU32::new(0) }
    }

    pub fn publish(&self, client_count: usize, min_inflight: u32) {
        self.client_count.store(client_count, Ordering::Relaxed);
        self.min_inflight.store(min_inflight, Ordering::Relaxed);
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Relaxed)
    }

    /// The smallest inflight count across currently connected clients, or
    /// 0 if there are none (matching the RTT-average fallback rule: "1 if
    /// no clients" applies to RTT, not inflight, in spec §4.7).
    #[must_use]
    pub fn min_inflight(&self) -> u32 {
        self.min_inflight.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let snap = ClientTableSnapshot::new();
        assert_eq!(snap.client_count(), 0);
        assert_eq!(snap.min_inflight(), 0);
    }

    #[test]
    fn publish_is_visible_to_readers() {
        let snap = ClientTableSnapshot::new();
        snap.publish(3, 7);
        assert_eq!(snap.client_count(), 3);
        assert_eq!(snap.min_inflight(), 7);
    }
}
