//! Wall-clock source used for every elapsed-time decision.
//!
//! Services never call [`lightkeeper_domain::time::now`] directly so that the
//! time they reason about and the time the registry sleeps on can be driven
//! by the same (possibly paused) tokio clock in tests.

use chrono::TimeDelta;
use lightkeeper_domain::time::{Timestamp, now};

/// Source of the current UTC time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// Wall time derived from a fixed anchor plus the tokio monotonic clock.
///
/// Under `tokio::time::pause` this clock advances exactly as far as the
/// runtime does, which keeps timestamps and scheduled sleeps in step.
#[derive(Debug, Clone, Copy)]
pub struct AnchoredClock {
    anchor: Timestamp,
    started: tokio::time::Instant,
}

impl AnchoredClock {
    #[must_use]
    pub fn new(anchor: Timestamp) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for AnchoredClock {
    fn now(&self) -> Timestamp {
        TimeDelta::from_std(self.started.elapsed())
            .ok()
            .and_then(|elapsed| self.anchor.checked_add_signed(elapsed))
            .unwrap_or(self.anchor)
    }
}
