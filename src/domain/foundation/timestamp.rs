//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a timestamp from Unix seconds.
    pub fn from_unix_secs(secs: u64) -> Self {
        Self(Utc.timestamp_opt(secs as i64, 0).unwrap())
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp() as u64
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0 + Duration::seconds(secs as i64))
    }

    /// Creates a new timestamp by subtracting the specified number of seconds.
    pub fn minus_secs(&self, secs: u64) -> Self {
        Self(self.0 - Duration::seconds(secs as i64))
    }

    /// Seconds elapsed since this timestamp, clamped at zero.
    pub fn age_secs(&self) -> u64 {
        let delta = Utc::now().signed_duration_since(self.0).num_seconds();
        delta.max(0) as u64
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let ts = Timestamp::now();
        let after = Utc::now();

        assert!(ts.as_datetime() >= &before);
        assert!(ts.as_datetime() <= &after);
    }

    #[test]
    fn unix_secs_round_trip() {
        let ts = Timestamp::from_unix_secs(1_700_000_000);
        assert_eq!(ts.as_unix_secs(), 1_700_000_000);
    }

    #[test]
    fn plus_and_minus_secs_shift_the_instant() {
        let ts = Timestamp::from_unix_secs(1_000);
        assert_eq!(ts.plus_secs(60).as_unix_secs(), 1_060);
        assert_eq!(ts.minus_secs(500).as_unix_secs(), 500);
    }

    #[test]
    fn ordering_helpers_agree_with_ord() {
        let earlier = Timestamp::from_unix_secs(100);
        let later = Timestamp::from_unix_secs(200);

        assert!(earlier.is_before(&later));
        assert!(later.is_after(&earlier));
        assert!(!earlier.is_after(&later));
    }

    #[test]
    fn age_of_past_timestamp_is_positive() {
        let old = Timestamp::now().minus_secs(120);
        assert!(old.age_secs() >= 120);
    }

    #[test]
    fn age_of_future_timestamp_clamps_to_zero() {
        let future = Timestamp::now().plus_secs(3600);
        assert_eq!(future.age_secs(), 0);
    }
}
