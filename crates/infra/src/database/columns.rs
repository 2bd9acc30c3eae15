//! Column codecs shared by the SQLite repositories.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use serde::de::DeserializeOwned;

pub(crate) fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(idx: usize, value: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, "timestamp out of range".into())
    })
}

pub(crate) fn from_opt_millis(
    idx: usize,
    value: Option<i64>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| from_millis(idx, v)).transpose()
}

/// Decode a JSON text column.
pub(crate) fn from_json<T: DeserializeOwned>(idx: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn from_opt_json<T: DeserializeOwned>(
    idx: usize,
    text: Option<String>,
) -> rusqlite::Result<Option<T>> {
    text.map(|t| from_json(idx, &t)).transpose()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> integrahub_domain::Result<String> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn to_opt_json<T: serde::Serialize>(
    value: Option<&T>,
) -> integrahub_domain::Result<Option<String>> {
    value.map(to_json).transpose()
}
