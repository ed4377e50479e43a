use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq)]
pub enum DateError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Malformed(String),
    #[error("cannot read {0} value as a date")]
    UnsupportedType(&'static str),
}

/// Calendar date of an application. Time of day is always dropped; an unset
/// date persists as NULL and serializes as JSON `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppliedDate(Option<NaiveDate>);

impl AppliedDate {
    pub fn unset() -> Self {
        Self(None)
    }

    pub fn today() -> Self {
        Self(Some(Local::now().date_naive()))
    }

    pub fn from_datetime<Tz: TimeZone>(at: &DateTime<Tz>) -> Self {
        Self(Some(at.naive_utc().date()))
    }

    pub fn is_unset(&self) -> bool {
        self.0.is_none()
    }

    /// Parses `YYYY-MM-DD`, or a full timestamp which is truncated to its day.
    pub fn parse(text: &str) -> Result<Self, DateError> {
        let text = text.trim();
        if let Ok(d) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
            return Ok(Self(Some(d)));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self::from_datetime(&dt));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
                return Ok(Self(Some(dt.date())));
            }
        }
        Err(DateError::Malformed(text.to_string()))
    }
}

#[cfg(test)]
impl AppliedDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(|d| Self(Some(d)))
    }
}

impl fmt::Display for AppliedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => f.pad(&d.format(DATE_FORMAT).to_string()),
            None => f.pad(""),
        }
    }
}

impl From<NaiveDate> for AppliedDate {
    fn from(value: NaiveDate) -> Self {
        Self(Some(value))
    }
}

// --- JSON ---

impl Serialize for AppliedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(d) => serializer.collect_str(&d.format(DATE_FORMAT)),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for AppliedDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = AppliedDate;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a YYYY-MM-DD string or null")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(AppliedDate::unset())
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(AppliedDate::unset())
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                d.deserialize_any(self)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                NaiveDate::parse_from_str(v, DATE_FORMAT)
                    .map(AppliedDate::from)
                    .map_err(|_| E::custom(DateError::Malformed(v.to_string())))
            }
        }

        deserializer.deserialize_option(DateVisitor)
    }
}

// --- SQLite ---

impl ToSql for AppliedDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.0 {
            Some(d) => Ok(ToSqlOutput::from(d.format(DATE_FORMAT).to_string())),
            None => Ok(ToSqlOutput::from(rusqlite::types::Null)),
        }
    }
}

impl FromSql for AppliedDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::unset()),
            ValueRef::Text(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|e| FromSqlError::Other(Box::new(e)))?;
                Self::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
            ValueRef::Integer(_) => Err(FromSqlError::Other(Box::new(DateError::UnsupportedType("integer")))),
            ValueRef::Real(_) => Err(FromSqlError::Other(Box::new(DateError::UnsupportedType("real")))),
            ValueRef::Blob(_) => Err(FromSqlError::Other(Box::new(DateError::UnsupportedType("blob")))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};
    use rusqlite::Connection;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        date: AppliedDate,
        name: String,
    }

    fn read_back(conn: &Connection, sql: &str) -> rusqlite::Result<AppliedDate> {
        conn.query_row(sql, [], |row| row.get(0))
    }

    #[test]
    fn test_parse_plain_date() {
        let d = AppliedDate::parse("2025-09-10").unwrap();
        assert_eq!(d, AppliedDate::from_ymd(2025, 9, 10).unwrap());
    }

    #[test]
    fn test_parse_truncates_timestamps() {
        let expected = AppliedDate::from_ymd(2025, 9, 10).unwrap();
        assert_eq!(AppliedDate::parse("2025-09-10 15:30:45").unwrap(), expected);
        assert_eq!(AppliedDate::parse("2025-09-10T15:30:45Z").unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(
            AppliedDate::parse("invalid-date"),
            Err(DateError::Malformed("invalid-date".to_string()))
        );
    }

    #[test]
    fn test_from_datetime_keeps_utc_day() {
        let dt = Utc.with_ymd_and_hms(2025, 12, 25, 15, 30, 45).unwrap();
        let d = AppliedDate::from_datetime(&dt);
        assert_eq!(d, AppliedDate::from_ymd(2025, 12, 25).unwrap());
        assert_eq!(d.to_string(), "2025-12-25");

        // 23:30 at UTC-5 is already the next day in UTC.
        let late = FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 12, 25, 23, 30, 0)
            .unwrap();
        assert_eq!(AppliedDate::from_datetime(&late).to_string(), "2025-12-26");
        assert_eq!(AppliedDate::parse("2025-12-25T23:30:00-05:00").unwrap().to_string(), "2025-12-26");
    }

    #[test]
    fn test_json_round_trip() {
        let original = Wrapper {
            date: AppliedDate::from_ymd(2025, 9, 10).unwrap(),
            name: "test".to_string(),
        };
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(json, r#"{"date":"2025-09-10","name":"test"}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.date, original.date);
        assert_eq!(back.name, "test");
    }

    #[test]
    fn test_json_null_round_trip() {
        let original = Wrapper {
            date: AppliedDate::unset(),
            name: "test".to_string(),
        };
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(json, r#"{"date":null,"name":"test"}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert!(back.date.is_unset());
    }

    #[test]
    fn test_json_rejects_malformed_date() {
        let result = serde_json::from_str::<Wrapper>(r#"{"date":"2025-13-45","name":"x"}"#);
        assert!(result.is_err());
        let result = serde_json::from_str::<Wrapper>(r#"{"date":"invalid-date","name":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_sql_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        let d = AppliedDate::from_ymd(2025, 9, 10).unwrap();
        let back: AppliedDate = conn.query_row("SELECT ?1", [d], |row| row.get(0)).unwrap();
        assert_eq!(back, d);

        let unset: AppliedDate = conn
            .query_row("SELECT ?1", [AppliedDate::unset()], |row| row.get(0))
            .unwrap();
        assert!(unset.is_unset());
    }

    #[test]
    fn test_sql_read_errors_are_typed() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(read_back(&conn, "SELECT 'invalid-date'").is_err());
        assert!(read_back(&conn, "SELECT 123").is_err());
        assert_eq!(
            read_back(&conn, "SELECT '2025-09-10 08:00:00'").unwrap(),
            AppliedDate::from_ymd(2025, 9, 10).unwrap()
        );
    }
}
