use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum number of characters a single tick may release.
const MIN_BURST: usize = 200;
/// Burst cap as a multiple of the chunk size.
const BURST_CHUNKS: usize = 50;

/// Pace at which buffered text is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevealRate {
    /// Characters released per second of real time.
    #[serde(default = "default_chars_per_second")]
    pub chars_per_second: f64,
    /// Nominal characters per tick; scales the burst cap.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chars_per_second() -> f64 {
    100.0
}

fn default_chunk_size() -> usize {
    1
}

impl Default for RevealRate {
    fn default() -> Self {
        Self {
            chars_per_second: default_chars_per_second(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl RevealRate {
    /// A rate of `chars_per_second`, with `chunk_size` scaling the burst cap.
    pub fn new(chars_per_second: f64, chunk_size: usize) -> Self {
        Self {
            chars_per_second,
            chunk_size,
        }
    }

    /// Time between ticks: one second divided by the rate (at least 1 cps).
    pub fn tick_interval(&self) -> Duration {
        let micros = (1_000_000.0 / self.chars_per_second.max(1.0)).round();
        Duration::from_micros(micros as u64)
    }

    /// Most characters a single tick may release, however much time elapsed.
    pub fn max_burst(&self) -> usize {
        (self.chunk_size.max(1) * BURST_CHUNKS).max(MIN_BURST)
    }
}
