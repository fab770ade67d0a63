//! TCP fan-out server: client table, per-client bounded send queues,
//! ACK/RTT tracking, and the cached-keyframe handoff for new clients.

pub mod client;
pub mod error;
pub mod server;
pub mod snapshot;

pub use client::{ClientId, ClientStats};
pub use error::FanoutError;
pub use server::{ClientEvent, FanoutConfig, FanoutServer};
pub use snapshot::ClientTableSnapshot;
