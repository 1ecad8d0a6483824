//! Clock abstraction so message timestamps are controllable in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time, in milliseconds since the UNIX epoch (UTC).
pub trait Clock: Send + Sync + 'static {
    fn now_unix_ms(&self) -> u64;
}

/// Real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH")
            .as_millis() as u64
    }
}

/// Manually-advanced clock for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    time_ms: Arc<AtomicU64>,
}

impl FixedClock {
    pub fn at(time_ms: u64) -> Self {
        FixedClock {
            time_ms: Arc::new(AtomicU64::new(time_ms)),
        }
    }

    pub fn set(&self, time_ms: u64) {
        self.time_ms.store(time_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.time_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances_only_when_told() {
        let clock = FixedClock::at(1_000);
        assert_eq!(clock.now_unix_ms(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now_unix_ms(), 1_500);
        clock.set(10);
        assert_eq!(clock.now_unix_ms(), 10);
    }

    #[test]
    fn test_system_clock_is_past_2020() {
        // 2020-01-01 in unix millis
        assert!(SystemClock.now_unix_ms() > 1_577_836_800_000);
    }
}
