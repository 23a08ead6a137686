//! Lenient timestamp parsing for backend payloads.
//!
//! The backend serialises `LocalDateTime` values without an offset
//! (`2024-05-01T08:30:00`), plain dates for voucher windows (`2024-05-01`)
//! and occasionally RFC 3339 strings. All of them end up as a
//! [`NaiveDateTime`] in shop-local time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serializer};

/// Parse any of the accepted timestamp shapes.
#[must_use]
pub fn parse_flexible(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// `#[serde(with = "flexible")]` for required timestamps.
pub mod flexible {
    use super::{Deserialize, Deserializer, NaiveDateTime, Serializer, parse_flexible};

    /// # Errors
    ///
    /// Fails if the value is not a string in one of the accepted formats.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_flexible(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}

/// `#[serde(default, with = "flexible_option")]` for optional timestamps.
pub mod flexible_option {
    use super::{Deserialize, Deserializer, NaiveDateTime, Serializer, parse_flexible};

    /// # Errors
    ///
    /// Fails if a present value is not in one of the accepted formats.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_flexible(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => super::flexible::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flexible_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_flexible("2024-05-01T08:30:00"), Some(expected));
        assert_eq!(parse_flexible("2024-05-01T08:30:00.123").map(|d| d.date()), Some(expected.date()));
        assert_eq!(parse_flexible("2024-05-01 08:30:00"), Some(expected));
        assert_eq!(parse_flexible("2024-05-01T08:30:00+07:00"), Some(expected));
        assert_eq!(
            parse_flexible("2024-05-01"),
            Some(expected.date().and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_flexible("yesterday"), None);
    }

    #[test]
    fn test_flexible_option_accepts_null_and_blank() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, with = "flexible_option")]
            at: Option<NaiveDateTime>,
        }

        let row: Row = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(row.at.is_none());
        let row: Row = serde_json::from_str(r#"{"at": ""}"#).unwrap();
        assert!(row.at.is_none());
        let row: Row = serde_json::from_str("{}").unwrap();
        assert!(row.at.is_none());
        let row: Row = serde_json::from_str(r#"{"at": "2024-01-02"}"#).unwrap();
        assert!(row.at.is_some());
    }
}
