use chrono::{DateTime, TimeZone, Utc};

/// Fixed instant for deterministic tests.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}
