//! Time source seam. The engine never reads the wall clock directly.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of timestamps, in milliseconds since the unix epoch.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time from the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Fixed timestamp source for deterministic tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}
