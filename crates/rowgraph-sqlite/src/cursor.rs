//! Cursor over a running SQLite statement.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Value as SqlValue;
use rusqlite::Rows;
use rowgraph_core::{Cursor, CursorError, ScalarType, Value};
use tracing::trace;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Label-addressed cursor over SQLite rows.
///
/// Each row is copied out of the statement on [`Cursor::advance`], so reads
/// never touch SQLite.
///
/// Temporal text is read in several layouts, but filters compare text, so
/// only values stored as `YYYY-MM-DD HH:MM:SS[.fff]` match filter literals
/// built from values read back.
pub struct SqliteCursor<'stmt> {
    rows: Option<Rows<'stmt>>,
    labels: HashMap<String, usize>,
    width: usize,
    current: Option<Vec<SqlValue>>,
}

impl<'stmt> SqliteCursor<'stmt> {
    /// Wrap running `rows` whose columns are named by `labels`.
    pub fn new(rows: Rows<'stmt>, labels: Vec<String>) -> Self {
        let width = labels.len();
        let labels = labels
            .into_iter()
            .enumerate()
            .map(|(index, label)| (label, index))
            .collect();
        Self {
            rows: Some(rows),
            labels,
            width,
            current: None,
        }
    }
}

impl Cursor for SqliteCursor<'_> {
    fn advance(&mut self) -> Result<bool, CursorError> {
        let rows = self.rows.as_mut().ok_or(CursorError::Closed)?;
        match rows.next().map_err(CursorError::backend)? {
            Some(row) => {
                let mut values = Vec::with_capacity(self.width);
                for index in 0..self.width {
                    values.push(row.get::<_, SqlValue>(index).map_err(CursorError::backend)?);
                }
                self.current = Some(values);
                Ok(true)
            }
            None => {
                self.current = None;
                Ok(false)
            }
        }
    }

    fn read(&mut self, label: &str, scalar: ScalarType) -> Result<Option<Value>, CursorError> {
        if self.rows.is_none() {
            return Err(CursorError::Closed);
        }
        let index = *self
            .labels
            .get(label)
            .ok_or_else(|| CursorError::UnknownColumn(label.to_string()))?;
        let row = self.current.as_ref().ok_or(CursorError::NoCurrentRow)?;
        let value = row.get(index).unwrap_or(&SqlValue::Null);
        convert(value, scalar).map_err(|reason| CursorError::Conversion {
            label: label.to_string(),
            expected: scalar,
            reason,
        })
    }

    fn close(&mut self) -> Result<(), CursorError> {
        if self.rows.take().is_some() {
            trace!("Released SQLite statement");
        }
        self.current = None;
        Ok(())
    }
}

/// Convert a stored SQLite value to the requested scalar type.
pub fn convert(value: &SqlValue, scalar: ScalarType) -> Result<Option<Value>, String> {
    let converted = match (value, scalar) {
        (SqlValue::Null, _) => return Ok(None),
        (SqlValue::Integer(i), ScalarType::Bool) => Value::Bool(*i != 0),
        (SqlValue::Integer(i), ScalarType::Int32) => {
            Value::Int32(i32::try_from(*i).map_err(|e| e.to_string())?)
        }
        (SqlValue::Integer(i), ScalarType::Int64) => Value::Int64(*i),
        (SqlValue::Integer(i), ScalarType::Float64) => Value::Float64(*i as f64),
        (SqlValue::Real(f), ScalarType::Float64) => Value::Float64(*f),
        (SqlValue::Text(s), ScalarType::String) => Value::String(s.clone()),
        (SqlValue::Blob(b), ScalarType::Bytes) => Value::Bytes(b.clone()),
        (SqlValue::Text(s), ScalarType::Bytes) => Value::Bytes(s.as_bytes().to_vec()),
        (SqlValue::Text(s), ScalarType::Date) => Value::Date(parse_date(s)?),
        (SqlValue::Text(s), ScalarType::Time) => Value::Time(parse_time(s)?),
        (SqlValue::Text(s), ScalarType::DateTime) => Value::DateTime(parse_datetime(s)?),
        (SqlValue::Integer(secs), ScalarType::DateTime) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| Value::DateTime(dt.naive_utc()))
            .ok_or_else(|| format!("timestamp {secs} out of range"))?,
        (other, _) => return Err(format!("unexpected {} value", storage_class(other))),
    };
    Ok(Some(converted))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| parse_datetime(s).map(|dt| dt.date()))
        .map_err(|_| format!("`{s}` is not a date"))
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("`{s}` is not a time"))
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("`{s}` is not a timestamp"))
}

fn storage_class(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Null => "NULL",
        SqlValue::Integer(_) => "INTEGER",
        SqlValue::Real(_) => "REAL",
        SqlValue::Text(_) => "TEXT",
        SqlValue::Blob(_) => "BLOB",
    }
}
