use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(5);

/// Plain-value result of a stats query (spec §4.9), merged over the
/// rolling 5-second window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub fps: f64,
    pub jitter_ms: f64,
    pub skip_count: u64,
    pub greyscale_ms_mean: f64,
    pub compress_ms_mean: f64,
    pub rtt_avg_ms: f64,
    pub rtt_p95_ms: f64,
    pub client_count: usize,
}

struct Window<T> {
    entries: VecDeque<(Instant, T)>,
}

impl<T: Copy> Window<T> {
    fn new() -> Self {
        Self { entries: VecDeque::new() }
    }

    fn push(&mut self, now: Instant, value: T) {
        self.entries.push_back((now, value));
        self.evict(now);
    }

    fn evict(&mut self, now: Instant) {
        while let Some((at, _)) = self.entries.front() {
            if now.duration_since(*at) > WINDOW {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    fn values(&self) -> impl Iterator<Item = T> + '_ {
        self.entries.iter().map(|(_, v)| *v)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Accumulates emitted-frame timestamps, per-stage timings, and skip
/// events over a rolling 5-second window, and turns them into a
/// [`StatsSnapshot`] on demand. Cumulative counters (total skips) persist
/// across snapshots; windowed ones (FPS, jitter, stage timings) do not.
pub struct StatsCollector {
    frame_times: Window<()>,
    greyscale_ms: Window<f64>,
    compress_ms: Window<f64>,
    total_skips: u64,
}

impl StatsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame_times: Window::new(),
            greyscale_ms: Window::new(),
            compress_ms: Window::new(),
            total_skips: 0,
        }
    }

    pub fn record_frame_emitted(&mut self, now: Instant) {
        self.frame_times.push(now, ());
    }

    pub fn record_greyscale_ms(&mut self, now: Instant, ms: f64) {
        self.greyscale_ms.push(now, ms);
    }

    pub fn record_compress_ms(&mut self, now: Instant, ms: f64) {
        self.compress_ms.push(now, ms);
    }

    pub fn record_skip(&mut self) {
        self.total_skips += 1;
    }

    /// Build a snapshot. `rtt_samples_ms` is the merged set of per-client
    /// RTT samples for the same window (owned by `daylight-net`'s client
    /// table, so it's passed in rather than tracked here).
    #[must_use]
    pub fn snapshot(&self, now: Instant, rtt_samples_ms: &[f64], client_count: usize) -> StatsSnapshot {
        let fps = self.frame_times.len() as f64 / WINDOW.as_secs_f64();

        let intervals: Vec<f64> = self
            .frame_times
            .entries
            .iter()
            .zip(self.frame_times.entries.iter().skip(1))
            .map(|((a, ()), (b, ()))| b.duration_since(*a).as_secs_f64() * 1000.0)
            .collect();
        let jitter_ms = stddev(&intervals);

        let greyscale_ms_mean = mean(&self.greyscale_ms.values().collect::<Vec<_>>());
        let compress_ms_mean = mean(&self.compress_ms.values().collect::<Vec<_>>());

        let rtt_avg_ms = mean(rtt_samples_ms);
        let rtt_p95_ms = percentile(rtt_samples_ms, 0.95);

        let _ = now;
        StatsSnapshot {
            fps,
            jitter_ms,
            skip_count: self.total_skips,
            greyscale_ms_mean,
            compress_ms_mean,
            rtt_avg_ms,
            rtt_p95_ms,
            client_count,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = ((sorted.len() as f64) * p).ceil() as usize;
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[idx]
}
