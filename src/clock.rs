//! Monotonic harness clock.
//!
//! Every timestamp in the system (request issue times, log entry start/finish
//! times, sampling windows) is a `u64` count of microseconds since the harness
//! started. Using one shared base keeps all components on the same timeline
//! and matches the wire contract, whose `issue_timestamp` field carries the
//! same value.

use tokio::time::Instant;

/// Microsecond clock anchored at harness start.
///
/// Built on the tokio clock rather than `std::time::Instant` so that tests
/// running under `tokio::time::pause` observe deterministic time.
#[derive(Debug, Clone, Copy)]
pub struct HarnessClock {
    base: Instant,
}

impl HarnessClock {
    /// Anchor a new clock at the current instant.
    pub fn start() -> Self {
        Self {
            base: Instant::now(),
        }
    }

    /// Microseconds elapsed since the clock was anchored.
    pub fn now_us(&self) -> u64 {
        self.base.elapsed().as_micros() as u64
    }
}

impl Default for HarnessClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn clock_advances_with_tokio_time() {
        let clock = HarnessClock::start();
        assert_eq!(clock.now_us(), 0);

        tokio::time::advance(Duration::from_millis(250)).await;
        assert_eq!(clock.now_us(), 250_000);

        tokio::time::advance(Duration::from_micros(17)).await;
        assert_eq!(clock.now_us(), 250_017);
    }
}
