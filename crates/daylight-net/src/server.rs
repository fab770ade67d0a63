use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;
use daylight_proto::{CommandPacket, DecodedPacket, Decoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};

use crate::client::{seq_is_newer_or_equal, ClientId, ClientStats, RttWindow, SendTimeRing};
use crate::error::FanoutError;
use crate::snapshot::ClientTableSnapshot;

/// Tunable bounds for one server instance, sized from `SessionConfig`.
#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    /// Bounded per-client send queue depth (spec §4.5 recommends 4).
    pub send_queue_depth: usize,
    /// RTT sliding window length per client (spec §3 recommends <=32).
    pub rtt_history_len: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self { send_queue_depth: 4, rtt_history_len: 32 }
    }
}

/// Connection and disconnection notifications for external observers
/// (the event bus in the daemon binary re-publishes these as
/// `DaylightEvent`s; this crate stays ignorant of that type).
#[derive(Debug, Clone, Copy)]
pub enum ClientEvent {
    Connected(SocketAddr),
    Disconnected(SocketAddr),
}

struct ClientRow {
    peer_addr: SocketAddr,
    sender: mpsc::Sender<Bytes>,
    last_acked_seq: Option<u32>,
    send_times: SendTimeRing,
    rtt: RttWindow,
    skip_count: u64,
}

struct Inner {
    table: RwLock<HashMap<ClientId, ClientRow>>,
    next_id: AtomicU64,
    cached_keyframe: Mutex<Option<Bytes>>,
    last_emitted_seq: AtomicU32,
    snapshot: Arc<ClientTableSnapshot>,
    config: FanoutConfig,
    events: broadcast::Sender<ClientEvent>,
    commands: mpsc::UnboundedSender<(SocketAddr, CommandPacket)>,
}

/// Single-listener multi-client TCP fan-out (spec §4.5). Cheap to clone:
/// every clone shares the same client table and cached keyframe.
#[derive(Clone)]
pub struct FanoutServer {
    inner: Arc<Inner>,
}

impl FanoutServer {
    /// Build a server. Returns the server handle, a receiver for
    /// connect/disconnect notifications, and a receiver for command
    /// packets decoded from any connected client.
    #[must_use]
    pub fn new(
        config: FanoutConfig,
        snapshot: Arc<ClientTableSnapshot>,
    ) -> (Self, broadcast::Receiver<ClientEvent>, mpsc::UnboundedReceiver<(SocketAddr, CommandPacket)>) {
        let (events_tx, events_rx) = broadcast::channel(32);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let server = Self {
            inner: Arc::new(Inner {
                table: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                cached_keyframe: Mutex::new(None),
                last_emitted_seq: AtomicU32::new(0),
                snapshot,
                config,
                events: events_tx,
                commands: commands_tx,
            }),
        };
        (server, events_rx, commands_rx)
    }

    /// Bind and run the accept loop until the listener fails. Each
    /// accepted connection is handled on its own spawned task, matching
    /// the accept-loop-plus-`tokio::spawn` shape used for connection
    /// fan-out elsewhere in this codebase.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::Bind`] if the port cannot be bound. Once
    /// listening, per-connection failures never propagate out of this
    /// function.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), FanoutError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| FanoutError::Bind { addr, source })?;

        tracing::info!(%addr, "fanout server listening");
        self.serve_listener(listener).await;
        Ok(())
    }

    /// Run the accept loop against an already-bound listener. Split out
    /// from [`Self::serve`] so tests can bind to an ephemeral port, read
    /// back the real address, and only then start accepting.
    pub async fn serve_listener(self, listener: TcpListener) {
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!("accept failed: {e}");
                    continue;
                }
            };

            let server = self.clone();
            tokio::spawn(async move {
                server.handle_connection(stream, peer_addr).await;
            });
        }
    }

    async fn handle_connection(self, mut stream: TcpStream, peer_addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(%peer_addr, "failed to set TCP_NODELAY: {e}");
        }

        let cached = self.inner.cached_keyframe.lock().unwrap().clone();
        if let Some(keyframe) = cached {
            if let Err(e) = stream.write_all(&keyframe).await {
                tracing::warn!(%peer_addr, "failed to send cached keyframe: {e}");
                return;
            }
        }

        let id = ClientId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, mut rx) = mpsc::channel::<Bytes>(self.inner.config.send_queue_depth);
        {
            let mut table = self.inner.table.write().unwrap();
            table.insert(
                id,
                ClientRow {
                    peer_addr,
                    sender: tx,
                    last_acked_seq: None,
                    send_times: SendTimeRing::new(),
                    rtt: RttWindow::new(self.inner.config.rtt_history_len),
                    skip_count: 0,
                },
            );
        }
        self.publish_snapshot();
        let _ = self.inner.events.send(ClientEvent::Connected(peer_addr));
        tracing::info!(%peer_addr, "client connected");

        let (mut read_half, mut write_half) = stream.into_split();

        let writer = tokio::spawn(async move {
            while let Some(packet) = rx.recv().await {
                if write_half.write_all(&packet).await.is_err() {
                    break;
                }
            }
        });

        let mut decoder = Decoder::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match read_half.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            decoder.feed(&buf[..n]);
            while let Some(packet) = decoder.poll() {
                match packet {
                    DecodedPacket::Ack(ack) => self.handle_ack(id, ack.seq),
                    DecodedPacket::Command(cmd) => {
                        let _ = self.inner.commands.send((peer_addr, cmd));
                    }
                    DecodedPacket::Frame(_) | DecodedPacket::Garbage(_) => {}
                }
            }
        }

        writer.abort();
        self.remove_client(id, peer_addr);
    }

    fn handle_ack(&self, id: ClientId, seq: u32) {
        let mut table = self.inner.table.write().unwrap();
        if let Some(row) = table.get_mut(&id) {
            let accept = row.last_acked_seq.is_none_or(|old| seq_is_newer_or_equal(seq, old));
            if accept {
                row.last_acked_seq = Some(seq);
            }
            if let Some(sent_at) = row.send_times.take(seq) {
                row.rtt.push_ms(sent_at.elapsed().as_secs_f64() * 1000.0);
            }
        }
        drop(table);
        self.publish_snapshot();
    }

    fn remove_client(&self, id: ClientId, peer_addr: SocketAddr) {
        self.inner.table.write().unwrap().remove(&id);
        self.publish_snapshot();
        let _ = self.inner.events.send(ClientEvent::Disconnected(peer_addr));
        tracing::info!(%peer_addr, "client disconnected");
    }

    /// Enqueue `packet` for every connected client. A keyframe payload is
    /// adopted as the new cached keyframe before enqueuing (spec §4.5);
    /// the mutex is never held across a socket write (§5).
    pub fn broadcast(&self, packet: Bytes, seq: u32, is_keyframe: bool) {
        if is_keyframe {
            *self.inner.cached_keyframe.lock().unwrap() = Some(packet.clone());
        }
        self.inner.last_emitted_seq.store(seq, Ordering::Relaxed);

        let now = std::time::Instant::now();
        let mut table = self.inner.table.write().unwrap();
        for row in table.values_mut() {
            row.send_times.record(seq, now);
            match row.sender.try_send(packet.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    row.skip_count += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // The reader loop will observe EOF/error and remove
                    // this row; nothing to do here.
                }
            }
        }
        drop(table);
        self.publish_snapshot();
    }

    /// Enqueue a command packet (display control) for every connected
    /// client. Unlike [`Self::broadcast`] this does not touch the cached
    /// keyframe or the per-seq send-time ring: commands are not part of
    /// the frame sequence. A full queue drops the command for that
    /// client without disconnecting it, same as a dropped frame.
    pub fn broadcast_command(&self, packet: Bytes) {
        let table = self.inner.table.read().unwrap();
        for row in table.values() {
            if let Err(e) = row.sender.try_send(packet.clone()) {
                tracing::debug!("dropped command for a client: {e}");
            }
        }
    }

    fn publish_snapshot(&self) {
        let table = self.inner.table.read().unwrap();
        let emitted = self.inner.last_emitted_seq.load(Ordering::Relaxed);
        let min_inflight = table
            .values()
            .map(|row| emitted.wrapping_sub(row.last_acked_seq.unwrap_or(emitted)))
            .min()
            .unwrap_or(0);
        self.inner.snapshot.publish(table.len(), min_inflight);
    }

    /// RTT average across all currently connected clients, or `None` if
    /// there are no clients or no client has an RTT sample yet (spec
    /// §4.7 treats "no clients" as a 1-client-equivalent fallback at the
    /// call site, not here).
    #[must_use]
    pub fn rtt_avg_ms(&self) -> Option<f64> {
        let table = self.inner.table.read().unwrap();
        let samples: Vec<f64> = table.values().filter_map(|row| row.rtt.average_ms()).collect();
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    #[must_use]
    pub fn client_stats(&self) -> Vec<ClientStats> {
        let table = self.inner.table.read().unwrap();
        let emitted = self.inner.last_emitted_seq.load(Ordering::Relaxed);
        table
            .iter()
            .map(|(id, row)| ClientStats {
                id: *id,
                peer_addr: row.peer_addr,
                last_acked_seq: row.last_acked_seq,
                inflight: emitted.wrapping_sub(row.last_acked_seq.unwrap_or(emitted)),
                rtt_avg_ms: row.rtt.average_ms(),
                skip_count: row.skip_count,
            })
            .collect()
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.table.read().unwrap().len()
    }
}
