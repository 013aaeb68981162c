//! UTC timestamps for session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point in time, stored as RFC 3339 in session JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// `YYYY-MM-DD HH:MM:SS`, as shown in hand-off posts.
    pub fn to_display_string(&self) -> String {
        self.0.format("%Y-%m-%d %H:%M:%S").to_string()
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
    use chrono::TimeZone;

    fn fixed() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
    }

    #[test]
    fn stored_as_rfc3339_string() {
        let json = serde_json::to_string(&fixed()).unwrap();
        assert_eq!(json, "\"2024-01-15T10:30:00Z\"");

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fixed());
    }

    #[test]
    fn later_timestamps_order_after_earlier_ones() {
        let earlier = fixed();
        let later = Timestamp::from_datetime(*earlier.as_datetime() + chrono::Duration::seconds(1));
        assert!(earlier < later);
    }

    #[test]
    fn display_string_uses_handoff_layout() {
        assert_eq!(fixed().to_display_string(), "2024-01-15 10:30:00");
    }
}
