use chrono::{DateTime, Duration, Utc};

/// Clock behind presentation start times and manual-action wall stamps.
///
/// A default clock reads the system time; a pinned clock stands still until
/// advanced, so tests measure elapsed review time without sleeping.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    pinned: Option<DateTime<Utc>>,
}

impl Clock {
    /// Returns a clock pinned at the given instant.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self { pinned: Some(at) }
    }

    /// The current instant according to this clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.pinned.unwrap_or_else(Utc::now)
    }

    /// Moves a pinned clock forward. A system clock is left alone.
    pub fn advance(&mut self, delta: Duration) {
        if let Some(at) = &mut self.pinned {
            *at += delta;
        }
    }

    /// Fractional seconds between `earlier` and this clock's now.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds_since(&self, earlier: DateTime<Utc>) -> f64 {
        (self.now() - earlier).num_milliseconds() as f64 / 1000.0
    }
}

/// Instant the deterministic test clock starts at (2025-06-15T15:06:40Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_750_000_000;

/// The deterministic instant used by tests and doc examples.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + Duration::seconds(FIXED_TEST_TIMESTAMP)
}

/// A clock pinned at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
