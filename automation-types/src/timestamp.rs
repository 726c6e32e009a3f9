//! Timestamp precision and the on-disk `LastModified` format.
//!
//! Local documents store timestamps as a sortable universal string
//! (`2024-03-01 12:30:45Z`), which carries no sub-second precision. Sync
//! status is therefore compared on whole seconds, otherwise an instant that
//! went through the file would never equal its in-memory original.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

/// `strftime` pattern for the universal sortable format.
pub const LAST_MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Drops precision below one millisecond.
pub fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

/// Drops all sub-second precision. Used for sync-status comparison.
pub fn quantize(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

/// Current time at millisecond precision.
pub fn now() -> DateTime<Utc> {
    truncate_millis(Utc::now())
}

pub fn format_last_modified(ts: DateTime<Utc>) -> String {
    ts.format(LAST_MODIFIED_FORMAT).to_string()
}

/// Parses the universal sortable format, falling back to RFC 3339 for
/// documents written by other tools.
pub fn parse_last_modified(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match NaiveDateTime::parse_from_str(raw, LAST_MODIFIED_FORMAT) {
        Ok(naive) => Ok(naive.and_utc()),
        Err(e) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| truncate_millis(dt.with_timezone(&Utc)))
            .map_err(|_| e),
    }
}

/// Serde adapter for `LastModified` fields.
pub mod last_modified {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_last_modified(*ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_last_modified(&raw).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_universal_sortable() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        assert_eq!(format_last_modified(ts), "2024-03-01 12:30:45Z");
    }

    #[test]
    fn parse_accepts_both_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        assert_eq!(parse_last_modified("2024-03-01 12:30:45Z").unwrap(), expected);
        assert_eq!(parse_last_modified("2024-03-01T12:30:45+00:00").unwrap(), expected);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_last_modified("yesterday").is_err());
    }

    #[test]
    fn quantize_drops_subseconds() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 12).unwrap();
        let late = base + chrono::Duration::milliseconds(900);
        assert_eq!(quantize(late), base);
    }
}
