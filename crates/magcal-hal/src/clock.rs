//! Time source for event timestamps and rate limiting

use nix::time::{ClockId, clock_gettime};

/// Monotonic nanosecond clock
pub trait Clock: Send {
    fn now_ns(&self) -> u64;
}

/// `CLOCK_MONOTONIC`, the time base sensor consumers expect
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        match clock_gettime(ClockId::CLOCK_MONOTONIC) {
            Ok(ts) => ts.tv_sec() as u64 * 1_000_000_000 + ts.tv_nsec() as u64,
            Err(e) => {
                tracing::warn!("clock_gettime(CLOCK_MONOTONIC) failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock;
        let before = clock.now_ns();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let after = clock.now_ns();
        assert!(after > before);
        assert!(after - before >= 2_000_000);
    }
}
