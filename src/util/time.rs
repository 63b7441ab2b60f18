//! Time utilities for match scheduling

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(std::time::Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Maps the tokio clock onto unix milliseconds.
///
/// Window timestamps are published as unix time, but deadlines are armed on
/// tokio's monotonic clock. Anchoring both at one instant keeps the two views
/// consistent, including under a paused test clock.
#[derive(Debug, Clone, Copy)]
pub struct MatchClock {
    origin: Instant,
    origin_ms: u64,
}

impl MatchClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
            origin_ms: unix_millis(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.origin_ms + self.origin.elapsed().as_millis() as u64
    }

    /// Tokio instant corresponding to a unix timestamp from this clock
    pub fn instant_at(&self, ts_ms: u64) -> Instant {
        self.origin + Duration::from_millis(ts_ms.saturating_sub(self.origin_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_clock_follows_tokio_time() {
        let clock = MatchClock::start();
        let t0 = clock.now_ms();
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(clock.now_ms(), t0 + 1500);
        assert_eq!(clock.instant_at(t0 + 1500), Instant::now());
    }
}
