//! Wall-clock timestamps in epoch milliseconds.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A point in time as milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Signed milliseconds elapsed since `earlier`. Negative on clock regression.
    pub const fn signed_millis_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    pub fn millis_since(self, earlier: Self) -> u64 {
        u64::try_from(self.signed_millis_since(earlier)).unwrap_or(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of "now" for the tracker.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_since_clamps_regression() {
        let start = Timestamp::from_millis(1_000);
        assert_eq!(Timestamp::from_millis(1_500).millis_since(start), 500);
        assert_eq!(Timestamp::from_millis(950).millis_since(start), 0);
        assert_eq!(Timestamp::from_millis(950).signed_millis_since(start), -50);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now().as_millis() > 1_577_836_800_000);
    }
}
