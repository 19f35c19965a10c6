//! Timestamp value object for immutable points in time.
//!
//! Ledger timestamps are persisted as integer milliseconds since the Unix
//! epoch, so the serialized form is a plain number.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Immutable point in time, always UTC, millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(#[serde(with = "chrono::serde::ts_milliseconds")] DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp from a DateTime<Utc>, truncated to milliseconds.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::from_millis(dt.timestamp_millis())
    }

    /// Creates a timestamp from milliseconds since the epoch.
    ///
    /// Out-of-range values saturate to the epoch.
    pub fn from_millis(millis: i64) -> Self {
        let dt = Utc
            .timestamp_millis_opt(millis)
            .single()
            .unwrap_or_default();
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
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

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    pub fn minus_days(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }

    /// Creates a new timestamp by adding hours.
    pub fn add_hours(&self, hours: i64) -> Self {
        Self(self.0 + Duration::hours(hours))
    }

    /// Whole days from `self` until `later`, rounded up. Zero if `later` has passed.
    pub fn days_until_ceil(&self, later: &Timestamp) -> i64 {
        let diff = later.as_millis() - self.as_millis();
        if diff <= 0 {
            return 0;
        }
        (diff + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }

    /// `dd/mm` rendering used in ledger replies.
    pub fn day_month(&self) -> String {
        self.0.format("%d/%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_round_trip() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        assert_eq!(ts.as_millis(), 1_700_000_000_123);
    }

    #[test]
    fn from_datetime_truncates_to_millis() {
        let dt = DateTime::parse_from_rfc3339("2024-01-15T10:30:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let ts = Timestamp::from_datetime(dt);
        assert_eq!(ts.as_millis() % 1000, 123);
        assert_eq!(ts, Timestamp::from_millis(dt.timestamp_millis()));
    }

    #[test]
    fn serializes_as_integer_millis() {
        let ts = Timestamp::from_millis(86_400_000);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "86400000");
        let back: Timestamp = serde_json::from_str("86400000").unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn add_and_minus_days_are_inverse() {
        let ts = Timestamp::from_millis(1_000_000_000_000);
        assert_eq!(ts.add_days(3).minus_days(3), ts);
        assert_eq!(ts.add_days(1).as_millis() - ts.as_millis(), MILLIS_PER_DAY);
    }

    #[test]
    fn ordering_helpers() {
        let a = Timestamp::from_millis(1);
        let b = Timestamp::from_millis(2);
        assert!(a.is_before(&b));
        assert!(b.is_after(&a));
        assert_eq!(b.duration_since(&a).num_milliseconds(), 1);
    }

    #[test]
    fn days_until_ceil_rounds_up() {
        let now = Timestamp::from_millis(0);
        assert_eq!(now.days_until_ceil(&now.add_hours(1)), 1);
        assert_eq!(now.days_until_ceil(&now.add_days(2)), 2);
        assert_eq!(now.days_until_ceil(&now.add_hours(49)), 3);
        assert_eq!(now.add_days(1).days_until_ceil(&now), 0);
    }

    #[test]
    fn day_month_formats() {
        let dt = DateTime::parse_from_rfc3339("2024-03-05T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Timestamp::from_datetime(dt).day_month(), "05/03");
    }
}
