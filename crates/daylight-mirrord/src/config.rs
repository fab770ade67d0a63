use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Immutable per-session configuration (spec §9: "pass an immutable
/// `SessionConfig` struct into the coordinator at construction; no
/// process-wide mutable state"). Constructed once at startup from a TOML
/// file layered under CLI overrides, then never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Mirrored frame width in pixels.
    pub width: u32,
    /// Mirrored frame height in pixels.
    pub height: u32,
    /// Target capture rate in frames per second.
    pub fps: u32,
    /// Emit a keyframe every `keyframe_interval` frames (`seq % K == 0`).
    pub keyframe_interval: u32,
    /// TCP port the fanout server listens on.
    pub port: u16,
    /// Consecutive drops before forcing the next frame to be a keyframe.
    pub skip_streak_threshold: u32,
    /// Bounded per-client send queue depth.
    pub send_queue_depth: usize,
    /// Per-client RTT sliding window length.
    pub rtt_history_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 960,
            fps: 30,
            keyframe_interval: 30,
            port: 8888,
            skip_streak_threshold: 4,
            send_queue_depth: 4,
            rtt_history_len: 32,
        }
    }
}

/// Load session configuration from a TOML file, falling back to
/// defaults when no path is given or the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        tracing::debug!("no config file given, using defaults");
        return Ok(SessionConfig::default());
    };
    let path: PathBuf = path.to_path_buf();

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(SessionConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read session config: {}", path.display()))?;

    let config: SessionConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse session config: {}", path.display()))?;

    tracing::info!(?path, "session configuration loaded");
    Ok(config)
}
