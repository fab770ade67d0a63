//! Host-side daemon: captures the display, converts to greyscale, delta
//! encodes and LZ4-compresses each frame, and fans it out over TCP to
//! every connected tablet. See `daylight-capture`, `daylight-proto`,
//! `daylight-net`, and `daylight-control` for the pieces this binary
//! wires together.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use daylight_capture::source::{CaptureSource, CapturedBgraFrame};
use daylight_capture::ScriptedCaptureSource;
use daylight_control::{event_bus, DaylightEvent, DisplayControl, DisplayState, StatsCollector, Status};
use daylight_mirrord::config;
use daylight_mirrord::pipeline::{Pipeline, PipelineConfig};
use daylight_net::{ClientEvent, ClientTableSnapshot, FanoutConfig, FanoutServer};

/// Mirrors this host's display to a low-power tablet over TCP.
#[derive(Parser, Debug)]
#[command(name = "daylight-mirrord", version, about)]
struct Cli {
    /// Path to a TOML session configuration file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the TCP port from the config file.
    #[arg(long)]
    port: Option<u16>,

    /// Override the mirrored frame width.
    #[arg(long)]
    width: Option<u32>,

    /// Override the mirrored frame height.
    #[arg(long)]
    height: Option<u32>,

    /// Override the target capture rate.
    #[arg(long)]
    fps: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut session = config::load(cli.config.as_deref()).context("failed to load session config")?;
    if let Some(port) = cli.port {
        session.port = port;
    }
    if let Some(width) = cli.width {
        session.width = width;
    }
    if let Some(height) = cli.height {
        session.height = height;
    }
    if let Some(fps) = cli.fps {
        session.fps = fps;
    }

    let (events_tx, _events_rx) = event_bus();
    let _ = events_tx.send(DaylightEvent::StatusChanged(Status::Starting));

    let snapshot = Arc::new(ClientTableSnapshot::new());
    let fanout_config =
        FanoutConfig { send_queue_depth: session.send_queue_depth, rtt_history_len: session.rtt_history_len };
    let (server, mut client_events, mut command_rx) = FanoutServer::new(fanout_config, snapshot.clone());

    let bind_addr: SocketAddr =
        format!("0.0.0.0:{}", session.port).parse().context("invalid bind address")?;
    let serve_server = server.clone();
    let serve_handle = tokio::spawn(async move {
        if let Err(e) = serve_server.serve(bind_addr).await {
            tracing::error!("fanout server exited: {e}");
        }
    });

    let (command_bytes_tx, mut command_bytes_rx) = tokio::sync::mpsc::unbounded_channel::<bytes::Bytes>();
    let display = Arc::new(DisplayControl::new(DisplayState::default(), command_bytes_tx, events_tx.clone()));
    let _display = display; // kept alive; a future control surface (GUI/CLI) would hold this handle

    let forward_server = server.clone();
    tokio::spawn(async move {
        while let Some(packet) = command_bytes_rx.recv().await {
            forward_server.broadcast_command(packet);
        }
    });

    tokio::spawn(async move {
        while let Some((peer, cmd)) = command_rx.recv().await {
            tracing::debug!(%peer, cmd = cmd.cmd, value = cmd.value, "received command from client");
        }
    });

    let events_for_clients = events_tx.clone();
    tokio::spawn(async move {
        while let Ok(event) = client_events.recv().await {
            let mapped = match event {
                ClientEvent::Connected(addr) => DaylightEvent::ClientConnected(addr),
                ClientEvent::Disconnected(addr) => DaylightEvent::ClientDisconnected(addr),
            };
            let _ = events_for_clients.send(mapped);
        }
    });

    tracing::info!(
        port = session.port,
        width = session.width,
        height = session.height,
        fps = session.fps,
        "daylight-mirrord starting"
    );
    let _ = events_tx.send(DaylightEvent::StatusChanged(Status::Running));

    run_capture_loop(&session, server, snapshot).await;

    let _ = events_tx.send(DaylightEvent::StatusChanged(Status::Stopping));
    serve_handle.abort();
    let _ = events_tx.send(DaylightEvent::StatusChanged(Status::Idle));
    Ok(())
}

/// Drive a scripted test-pattern capture through one `Pipeline` instance
/// until it runs dry or the process receives a shutdown signal. A real
/// platform capture backend plugs in here in place of
/// [`ScriptedCaptureSource`] (spec §1: the platform-specific capture
/// mechanism is external to this crate).
async fn run_capture_loop(session: &config::SessionConfig, server: FanoutServer, snapshot: Arc<ClientTableSnapshot>) {
    let frames = demo_pattern_frames(session.width, session.height, session.fps * 30);
    let source = Box::new(ScriptedCaptureSource::new(frames));
    let (mut capture_session, rx) = match source.start(session.width, session.height, session.fps) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("failed to start capture: {e}");
            return;
        }
    };

    let pipeline_config = PipelineConfig::from(session);
    let worker_server = server.clone();
    let worker = std::thread::spawn(move || {
        let mut pipeline = Pipeline::new(pipeline_config);
        let mut stats = StatsCollector::new();
        for frame in rx {
            let rtt_avg_ms = worker_server.rtt_avg_ms();
            let now = Instant::now();
            let outcome = pipeline.process_frame(&frame, &snapshot, rtt_avg_ms, &worker_server, &mut stats, now);
            tracing::trace!(?outcome, "processed frame");
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, stopping capture");
            capture_session.stop();
        }
        () = wait_for_thread(&worker) => {
            tracing::info!("capture source exhausted");
        }
    }

    let _ = worker.join();
}

async fn wait_for_thread(handle: &std::thread::JoinHandle<()>) {
    while !handle.is_finished() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// A simple animated test pattern: each frame is a solid grey level that
/// ramps and wraps, giving the delta codec a nontrivial (but not
/// adversarial) workload. Stands in for real capture until a platform
/// backend is wired in.
fn demo_pattern_frames(width: u32, height: u32, count: u32) -> Vec<CapturedBgraFrame> {
    let stride = width * 4;
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_possible_truncation)]
            let level = ((i * 4) % 256) as u8;
            let mut data = vec![0u8; (stride * height) as usize];
            for px in data.chunks_exact_mut(4) {
                px[0] = level;
                px[1] = level;
                px[2] = level;
                px[3] = 0xFF;
            }
            CapturedBgraFrame { data, stride, timestamp: Instant::now() }
        })
        .collect()
}
