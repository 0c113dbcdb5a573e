//! Millisecond timestamps and the clocks that produce them.
//!
//! Audit columns and `last_ping` are stored as milliseconds since the Unix
//! epoch. Clocks hand out strictly increasing values so two writes in the same
//! millisecond still order correctly.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

/// Milliseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Reads the wall clock. Not monotonic; prefer a [`Clock`].
    #[must_use]
    pub fn wall() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Returns milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Converts to a chrono UTC datetime.
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Returns the timestamp shifted by `millis` (may be negative).
    #[must_use]
    pub const fn offset_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Source of timestamps for audit fields and pings.
pub trait Clock: Send + Sync {
    /// Returns the current time. Successive calls never go backwards.
    fn now(&self) -> Timestamp;
}

/// Wall clock that never repeats or regresses.
///
/// If the system clock has not advanced since the previous call (or stepped
/// backwards) the last value plus one millisecond is returned instead.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Mutex<i64>,
}

impl SystemClock {
    /// Creates a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp::wall().as_millis();
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = if wall > *last { wall } else { last.saturating_add(1) };
        *last = next;
        Timestamp(next)
    }
}

/// Manually driven clock for tests and replay.
///
/// Each call to [`Clock::now`] returns the current value and then advances it
/// by the configured step, so it also never repeats.
#[derive(Debug)]
pub struct ManualClock {
    current: AtomicI64,
    step: i64,
}

impl ManualClock {
    /// Creates a clock starting at `start` that advances one second per read.
    #[must_use]
    pub fn starting_at(start: Timestamp) -> Self {
        Self::with_step(start, 1_000)
    }

    /// Creates a clock starting at `start` that advances `step_millis` per read.
    #[must_use]
    pub fn with_step(start: Timestamp, step_millis: i64) -> Self {
        Self {
            current: AtomicI64::new(start.as_millis()),
            step: step_millis.max(1),
        }
    }

    /// Moves the clock forward without reading it.
    pub fn advance(&self, millis: i64) {
        self.current.fetch_add(millis.max(0), Ordering::SeqCst);
    }

    /// Returns the value the next read will produce.
    #[must_use]
    pub fn peek(&self) -> Timestamp {
        Timestamp(self.current.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.current.fetch_add(self.step, Ordering::SeqCst))
    }
}
