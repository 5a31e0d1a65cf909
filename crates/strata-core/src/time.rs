//! Conversions between the time representations used across the pipeline.
//!
//! Internally every record carries time as decimal epoch seconds (`f64`,
//! millisecond resolution). The wire formats use two string encodings:
//! ISO8601 (`YYYY-MM-DDTHH:MM:SS.sssZ`) and the compact "DateTime" form
//! (`YYYYMMDDHHMMSS.sss`) used by the global pick and correlation formats.

use chrono::{DateTime, NaiveDate, Utc};

/// Formats decimal epoch seconds as `YYYY-MM-DDTHH:MM:SS.sssZ`.
///
/// Rounds to the nearest millisecond, so `1451338344.9999997` formats as
/// `2015-12-28T21:32:25.000Z`.
pub fn epoch_to_iso8601(epoch: f64) -> String {
    let millis = (epoch * 1000.0).round() as i64;
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        None => {
            log::error!("epoch_to_iso8601: epoch time {epoch} out of range");
            String::new()
        }
    }
}

/// Parses an ISO8601 time string into decimal epoch seconds.
///
/// Returns `None` (after logging) for empty, truncated, or malformed input.
pub fn iso8601_to_epoch(time_string: &str) -> Option<f64> {
    if time_string.is_empty() {
        log::error!("iso8601_to_epoch: time string is empty");
        return None;
    }
    // YYYY-MM-DDTHH:MM:SS.SSSZ
    if time_string.len() < 24 {
        log::error!("iso8601_to_epoch: time string {time_string} is too short");
        return None;
    }

    match DateTime::parse_from_rfc3339(time_string) {
        Ok(dt) => Some(dt.timestamp_millis() as f64 / 1000.0),
        Err(e) => {
            log::warn!("iso8601_to_epoch: problem converting time string {time_string}: {e}");
            None
        }
    }
}

/// Parses a compact `YYYYMMDDHHMMSS.sss` string into decimal epoch seconds.
pub fn date_time_to_epoch(time_string: &str) -> Option<f64> {
    if time_string.is_empty() {
        log::error!("date_time_to_epoch: time string is empty");
        return None;
    }
    // YYYYMMDDHHMMSS.SSS
    if time_string.len() < 18 {
        log::error!("date_time_to_epoch: time string {time_string} is too short");
        return None;
    }

    let parsed = (|| -> Option<f64> {
        let year: i32 = time_string.get(0..4)?.parse().ok()?;
        let month: u32 = time_string.get(4..6)?.parse().ok()?;
        let day: u32 = time_string.get(6..8)?.parse().ok()?;
        let hour: u32 = time_string.get(8..10)?.parse().ok()?;
        let minute: u32 = time_string.get(10..12)?.parse().ok()?;
        let seconds: f64 = time_string.get(12..18)?.parse().ok()?;

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        let base = date.and_hms_opt(hour, minute, 0)?;
        Some(base.and_utc().timestamp() as f64 + seconds)
    })();

    if parsed.is_none() {
        log::warn!("date_time_to_epoch: problem converting time string {time_string}");
    }
    parsed
}

/// Converts a compact `YYYYMMDDHHMMSS.sss` string to ISO8601.
pub fn date_time_to_iso8601(time_string: &str) -> Option<String> {
    date_time_to_epoch(time_string).map(epoch_to_iso8601)
}

/// Current wall-clock time as decimal epoch seconds.
pub fn now_epoch() -> f64 {
    match std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Serde adapter serializing epoch seconds as ISO8601 strings on the wire.
pub mod iso8601_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(epoch: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::epoch_to_iso8601(*epoch))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::iso8601_to_epoch(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid ISO8601 time: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISO8601_TIME: &str = "2015-12-28T21:32:24.017Z";
    const DATE_TIME: &str = "20151228213224.017";
    const EPOCH_TIME: f64 = 1451338344.017;

    #[test]
    fn epoch_to_iso8601_conversion() {
        assert_eq!(epoch_to_iso8601(EPOCH_TIME), ISO8601_TIME);
        assert_eq!(epoch_to_iso8601(1451338344.5), "2015-12-28T21:32:24.500Z");
        // rounds up across the second boundary
        assert_eq!(epoch_to_iso8601(1451338344.9999997), "2015-12-28T21:32:25.000Z");
    }

    #[test]
    fn iso8601_to_epoch_conversion() {
        assert_eq!(iso8601_to_epoch(ISO8601_TIME), Some(EPOCH_TIME));
    }

    #[test]
    fn date_time_to_epoch_conversion() {
        assert_eq!(date_time_to_epoch(DATE_TIME), Some(EPOCH_TIME));
    }

    #[test]
    fn date_time_to_iso8601_conversion() {
        assert_eq!(date_time_to_iso8601(DATE_TIME).as_deref(), Some(ISO8601_TIME));
    }

    #[test]
    fn round_trip_is_identity_to_one_millisecond() {
        for &epoch in &[0.001, 1451338344.017, 2147483646.999] {
            let round = iso8601_to_epoch(&epoch_to_iso8601(epoch)).unwrap();
            assert!((round - epoch).abs() < 0.001, "epoch {epoch} round-tripped to {round}");
        }
    }

    #[test]
    fn rejects_bad_strings() {
        assert_eq!(iso8601_to_epoch(""), None);
        assert_eq!(iso8601_to_epoch("12345678901234567890"), None);
        assert_eq!(iso8601_to_epoch("AAAAAAAAAAAAAAAAAAAAAAAA"), None);
        assert_eq!(date_time_to_epoch(""), None);
        assert_eq!(date_time_to_epoch("1234567890123456"), None);
        assert_eq!(date_time_to_epoch("AAAAAAAAAAAAAAAAAAAAAAAA"), None);
    }
}
