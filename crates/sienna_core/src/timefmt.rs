//! Lenient timestamp codec for record files.
//!
//! The bot writes naive local ISO-8601 (`2025-03-01T18:22:10.512`). Files
//! touched by the dashboard may carry an RFC 3339 offset or drop the
//! fractional seconds, so reads accept all of those.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serializer};

const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const READ_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Current local wall-clock time without offset, the unit every record timestamp uses.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format(ts: &NaiveDateTime) -> String {
    ts.format(WRITE_FORMAT).to_string()
}

pub fn parse(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in READ_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(ts))
}

/// `null` reads as the current time; the dashboard writes it for a user it
/// has not stamped yet.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {raw}"))),
        None => Ok(now_local()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_parse_python_isoformat() {
        let ts = parse("2025-03-01T18:22:10.512345").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(ts.hour(), 18);
    }

    #[test]
    fn test_parse_without_fraction_and_with_space() {
        assert!(parse("2025-03-01T18:22:10").is_some());
        assert!(parse("2025-03-01 18:22:10").is_some());
    }

    #[test]
    fn test_parse_rfc3339() {
        assert!(parse("2025-03-01T18:22:10+02:00").is_some());
        assert!(parse("2025-03-01T18:22:10Z").is_some());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse("yesterday").is_none());
        assert!(parse("").is_none());
    }

    #[derive(Debug, serde::Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        at: NaiveDateTime,
    }

    #[test]
    fn test_null_reads_as_now() {
        let before = now_local();
        let stamped: Stamped = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(stamped.at >= before);
        assert!(serde_json::from_str::<Stamped>(r#"{"at": "soon"}"#).is_err());
    }

    #[test]
    fn test_format_parses_back() {
        let ts = now_local();
        assert_eq!(parse(&format(&ts)), Some(ts));
    }
}
