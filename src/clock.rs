use chrono::{DateTime, Utc};

/// Source of the current time for tracker operations.
///
/// Injected into the [`Tracker`](crate::Tracker) so tests can control
/// timestamps deterministically. Each mutating operation reads the clock
/// once, so a location record closed by a move carries the same departure
/// time as the new record's arrival time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
