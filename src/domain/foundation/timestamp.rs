//! UTC instants used to order backend observations.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Point in time at which a request was issued, always UTC.
///
/// Ordering is total, so two snapshots can always be compared for recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Out-of-range values clamp to the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> Self {
        Self(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }

    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0 + Duration::milliseconds(millis))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_issue_orders_after() {
        let issued = Timestamp::from_unix_millis(1_705_276_800_000);
        let later = issued.plus_millis(1);

        assert!(issued.is_before(&later));
        assert!(!later.is_before(&issued));
        assert!(!issued.is_before(&issued));
        assert_eq!(later.as_unix_millis(), 1_705_276_800_001);
    }

    #[test]
    fn now_is_not_before_earlier_now() {
        let first = Timestamp::now();
        let second = Timestamp::now();
        assert!(!second.is_before(&first));
    }

    #[test]
    fn out_of_range_millis_clamp_to_epoch() {
        assert_eq!(Timestamp::from_unix_millis(i64::MAX).as_unix_millis(), 0);
    }

    #[test]
    fn round_trips_as_rfc3339_string() {
        let ts: Timestamp = serde_json::from_str("\"2024-01-15T10:30:00Z\"").unwrap();
        assert_eq!(ts.to_string(), "2024-01-15T10:30:00+00:00");
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2024-01-15T10:30:00Z\"");
    }
}
