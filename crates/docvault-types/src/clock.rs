use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// Wall-clock timestamp used for every document and revision field.
pub type Timestamp = DateTime<Utc>;

/// Injectable time source.
///
/// The store asks the clock for `now` exactly once per operation so all
/// fields written by one mutation share the same instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The real system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to. Every call to [`Clock::now`]
/// advances it by a fixed step so successive operations get distinct times.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
    step_ms: i64,
}

impl ManualClock {
    /// Start at `start_ms` milliseconds since the UNIX epoch, advancing one
    /// millisecond per reading.
    pub fn new(start_ms: i64) -> Self {
        Self::with_step(start_ms, 1)
    }

    pub fn with_step(start_ms: i64, step_ms: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_ms),
            step_ms,
        }
    }

    /// Jump forward by `ms` milliseconds.
    pub fn advance(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// Current reading without advancing.
    pub fn peek(&self) -> Timestamp {
        to_timestamp(self.millis.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z
        Self::new(1_704_067_200_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let ms = self.millis.fetch_add(self.step_ms, Ordering::SeqCst);
        to_timestamp(ms)
    }
}

fn to_timestamp(ms: i64) -> Timestamp {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}
