use chrono::{DateTime, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use thiserror::Error;

/// Timestamp layout used both in source files and in filter operands.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical storage form of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
}

/// Value handed back to callers, after the attribute's display function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Text(String),
    Integer(i64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("not an integer: '{0}'")]
    InvalidInteger(String),

    #[error("not a timestamp in YYYY-MM-DD HH:MM:SS format: '{0}'")]
    InvalidDate(String),
}

impl ToSql for AttributeValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            AttributeValue::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            AttributeValue::Integer(i) => Ok(ToSqlOutput::Borrowed(ValueRef::Integer(*i))),
        }
    }
}

impl FromSql for AttributeValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => Ok(AttributeValue::Integer(i)),
            ValueRef::Text(bytes) => Ok(AttributeValue::Text(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
            // Dates written by older builds could have been stored as floats.
            ValueRef::Real(f) => Ok(AttributeValue::Integer(f as i64)),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

pub fn parse_integer(raw: &str) -> Result<i64, ValueError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| ValueError::InvalidInteger(trimmed.to_string()))
}

/// Parses a `YYYY-MM-DD HH:MM:SS` timestamp, interpreted as UTC, into epoch seconds.
pub fn parse_date(raw: &str) -> Result<i64, ValueError> {
    let trimmed = raw.trim();
    NaiveDateTime::parse_from_str(trimmed, DATE_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| ValueError::InvalidDate(trimmed.to_string()))
}

pub fn format_date(epoch_seconds: i64) -> String {
    match DateTime::from_timestamp(epoch_seconds, 0) {
        Some(dt) => dt.format(DATE_FORMAT).to_string(),
        None => epoch_seconds.to_string(),
    }
}

/// Turns free text into a `LIKE` pattern: `foo bar` matches `%foo%bar%`.
pub fn wildcard_pattern(raw: &str) -> String {
    format!("%{}%", raw.trim().replace(' ', "%"))
}
