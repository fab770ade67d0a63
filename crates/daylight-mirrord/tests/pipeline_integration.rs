use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use daylight_capture::source::CapturedBgraFrame;
use daylight_control::{DisplayControl, DisplayState, StatsCollector};
use daylight_mirrord::pipeline::{FrameOutcome, Pipeline, PipelineConfig};
use daylight_net::{ClientTableSnapshot, FanoutConfig, FanoutServer};
use daylight_proto::{CommandId, CommandPacket};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

fn solid_frame(width: u32, height: u32, value: u8) -> CapturedBgraFrame {
    let stride = width * 4;
    let mut data = vec![0u8; (stride * height) as usize];
    for px in data.chunks_exact_mut(4) {
        px[0] = value;
        px[1] = value;
        px[2] = value;
        px[3] = 0xFF;
    }
    CapturedBgraFrame { data, stride, timestamp: Instant::now() }
}

async fn connected_fanout(config: FanoutConfig) -> (FanoutServer, TcpStream) {
    let snapshot = Arc::new(ClientTableSnapshot::new());
    let (server, _events, _commands) = FanoutServer::new(config, snapshot);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.clone().serve_listener(listener));
    let stream = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    (server, stream)
}

#[tokio::test]
async fn keyframe_first_frame_matches_literal_wire_bytes() {
    let width = 1280;
    let height = 960;
    let (server, mut stream) = connected_fanout(FanoutConfig::default()).await;

    let snapshot = Arc::new(ClientTableSnapshot::new());
    let mut pipeline = Pipeline::new(PipelineConfig { width, height, keyframe_interval: 30, skip_streak_threshold: 4 });
    let mut stats = StatsCollector::new();
    let frame = solid_frame(width, height, 0x80);

    let outcome = pipeline.process_frame(&frame, &snapshot, None, &server, &mut stats, Instant::now());
    assert_eq!(outcome, FrameOutcome::Emitted { seq: 0, is_keyframe: true });

    let mut header = [0u8; 11];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(&header[0..2], &[0xDA, 0x7E]);
    assert_eq!(header[2], 0x01, "flags bit 0 must be set for a keyframe");
    assert_eq!(&header[3..7], &0u32.to_le_bytes(), "first frame has seq=0");

    let len = u32::from_le_bytes(header[7..11].try_into().unwrap()) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();

    let mut decompressed = vec![0u8; (width * height) as usize];
    let n = lz4_flex::block::decompress_into(&payload, &mut decompressed).unwrap();
    assert!(decompressed[..n].iter().all(|&b| b == 0x80));
}

#[tokio::test]
async fn unchanged_frame_produces_a_tiny_delta_packet() {
    let width = 1280;
    let height = 960;
    let (server, mut stream) = connected_fanout(FanoutConfig::default()).await;

    let snapshot = Arc::new(ClientTableSnapshot::new());
    let mut pipeline = Pipeline::new(PipelineConfig { width, height, keyframe_interval: 30, skip_streak_threshold: 4 });
    let mut stats = StatsCollector::new();
    let frame = solid_frame(width, height, 0x80);

    pipeline.process_frame(&frame, &snapshot, None, &server, &mut stats, Instant::now());
    let mut keyframe_header = [0u8; 11];
    stream.read_exact(&mut keyframe_header).await.unwrap();
    let keyframe_len = u32::from_le_bytes(keyframe_header[7..11].try_into().unwrap()) as usize;
    let mut keyframe_payload = vec![0u8; keyframe_len];
    stream.read_exact(&mut keyframe_payload).await.unwrap();

    let outcome = pipeline.process_frame(&frame, &snapshot, None, &server, &mut stats, Instant::now());
    assert_eq!(outcome, FrameOutcome::Emitted { seq: 1, is_keyframe: false });

    let mut header = [0u8; 11];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(&header[0..2], &[0xDA, 0x7E]);
    assert_eq!(header[2], 0x00, "identical frame must not set the keyframe flag");
    assert_eq!(&header[3..7], &1u32.to_le_bytes());

    let len = u32::from_le_bytes(header[7..11].try_into().unwrap()) as usize;
    assert!(len <= 200, "an all-zero XOR delta must compress to a tiny payload, got {len} bytes");
}

#[tokio::test]
async fn new_client_mid_stream_receives_the_cached_keyframe_first() {
    let width = 8;
    let height = 8;
    let config = FanoutConfig::default();
    let snapshot = Arc::new(ClientTableSnapshot::new());
    let (server, _events, _commands) = FanoutServer::new(config, snapshot.clone());

    let mut pipeline = Pipeline::new(PipelineConfig { width, height, keyframe_interval: 30, skip_streak_threshold: 4 });
    let mut stats = StatsCollector::new();

    // Drive the pipeline through seq 0..=47: seq 30 is the next keyframe
    // boundary since K=30 and there is no client backpressure.
    let mut last_keyframe_seq: Option<u32> = None;
    for i in 0..48u32 {
        let frame = solid_frame(width, height, (i % 255) as u8);
        let outcome = pipeline.process_frame(&frame, &snapshot, None, &server, &mut stats, Instant::now());
        if let FrameOutcome::Emitted { seq, is_keyframe: true } = outcome {
            last_keyframe_seq = Some(seq);
        }
    }
    assert_eq!(last_keyframe_seq, Some(30), "keyframe_interval=30 with no backpressure emits seq 0 and seq 30 as keyframes");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.clone().serve_listener(listener));
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let mut header = [0u8; 11];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[2] & 0x01, 0x01, "new client's first bytes must be a keyframe");
    assert_eq!(&header[3..7], &30u32.to_le_bytes(), "cached keyframe must be the seq=30 one");
}

#[tokio::test]
async fn toggle_backlight_round_trip_emits_literal_command_bytes() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Bytes>();
    let (events_tx, _events_rx) = tokio::sync::broadcast::channel(8);
    let initial =
        DisplayState { current_brightness: 128, warmth: 0, backlight_on: true, saved_brightness: 128, resolution: daylight_control::ResolutionPreset::Balanced };
    let control = DisplayControl::new(initial, tx, events_tx);

    let off = control.toggle_backlight();
    assert_eq!(off.current_brightness, 0);
    assert!(!off.backlight_on);
    assert_eq!(off.saved_brightness, 128);
    let packet = rx.recv().await.unwrap();
    assert_eq!(&packet[..], &[0xDA, 0x7F, CommandId::Brightness.as_u8(), 0x00]);

    let on = control.toggle_backlight();
    assert_eq!(on.current_brightness, 128);
    assert!(on.backlight_on);
    let packet = rx.recv().await.unwrap();
    assert_eq!(&packet[..], &[0xDA, 0x7F, CommandId::Brightness.as_u8(), 0x80]);

    // Cross-check against the raw encoder, matching the literal bytes
    // from the end-to-end scenario.
    assert_eq!(&CommandPacket::encode(CommandId::Brightness, 0x00)[..], &[0xDA, 0x7F, 0x01, 0x00]);
    assert_eq!(&CommandPacket::encode(CommandId::Brightness, 0x80)[..], &[0xDA, 0x7F, 0x01, 0x80]);
}
