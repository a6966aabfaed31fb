//! Clock port for obtaining the current time.

use chrono::{DateTime, Utc};

/// Provides the current time.
///
/// Call durations are measured through this trait so that timing
/// comparisons can run against a manual clock in tests.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Whole milliseconds elapsed since `started`, zero if the clock went backwards.
    fn millis_since(&self, started: DateTime<Utc>) -> u64 {
        u64::try_from(self.now().signed_duration_since(started).num_milliseconds()).unwrap_or(0)
    }
}
