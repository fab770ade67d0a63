use std::net::SocketAddr;

use crate::display::DisplayState;
use crate::stats::StatsSnapshot;
use crate::status::Status;

/// Typed session events, replacing the teacher's per-field D-Bus signal
/// methods with a single broadcast enum (design note in spec §9):
/// subscribers receive every kind of update through one channel instead
/// of wiring up a signal per field.
#[derive(Debug, Clone)]
pub enum DaylightEvent {
    StatusChanged(Status),
    ClientConnected(SocketAddr),
    ClientDisconnected(SocketAddr),
    DisplayStateChanged(DisplayState),
    Stats(StatsSnapshot),
}

/// Capacity for the broadcast channel backing the event bus. Lagging
/// subscribers miss old events rather than stalling publishers — the
/// right tradeoff for a live status feed.
pub const EVENT_BUS_CAPACITY: usize = 64;

#[must_use]
pub fn event_bus() -> (tokio::sync::broadcast::Sender<DaylightEvent>, tokio::sync::broadcast::Receiver<DaylightEvent>) {
    tokio::sync::broadcast::channel(EVENT_BUS_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let (tx, mut rx) = event_bus();
        tx.send(DaylightEvent::StatusChanged(Status::Running)).unwrap();
        match rx.recv().await.unwrap() {
            DaylightEvent::StatusChanged(Status::Running) => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
