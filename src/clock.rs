//! Monotonic, process-wide clock used by time-paced sinks.
//!
//! Ticks at a fixed rate (90 000 Hz by default, matching common media
//! timestamp bases) from an explicit epoch rather than from an
//! implicitly-created `Instant::now()` singleton, so a consumer can
//! reason about "ticks since this clock was created" without caring
//! when the process started.

use std::time::Instant;

/// Ticks per second used when a media timestamp base isn't specified.
pub const DEFAULT_RATE_HZ: u64 = 90_000;

/// A monotonic source of 64-bit ticks at a fixed rate.
#[derive(Debug, Clone)]
pub struct Clock {
    epoch: Instant,
    rate_hz: u64,
}

impl Clock {
    /// Creates a clock ticking at `rate_hz`, with its epoch set to now.
    pub fn new(rate_hz: u64) -> Self {
        assert!(rate_hz > 0, "clock rate must be positive");
        Self {
            epoch: Instant::now(),
            rate_hz,
        }
    }

    /// Ticks per second this clock reports.
    pub fn rate_hz(&self) -> u64 {
        self.rate_hz
    }

    /// Current time since the clock's epoch, in ticks.
    pub fn now(&self) -> u64 {
        let elapsed = self.epoch.elapsed();
        (elapsed.as_secs_f64() * self.rate_hz as f64) as u64
    }

    /// Blocks the calling thread until `target` (in ticks since epoch)
    /// is reached. Used by rate-limited sinks, e.g. DASH live mode
    /// sleeping until `start + segmentDurationMs * n`.
    pub fn sleep_until(&self, target_ticks: u64) {
        let now = self.now();
        if target_ticks <= now {
            return;
        }
        let remaining_ticks = target_ticks - now;
        let secs = remaining_ticks as f64 / self.rate_hz as f64;
        std::thread::sleep(std::time::Duration::from_secs_f64(secs));
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_HZ)
    }
}
