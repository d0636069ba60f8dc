//! In-memory cursor over label-addressed rows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::cursor::Cursor;
use crate::catalog::{ScalarType, Value};
use crate::error::CursorError;

/// Shared view of how often a [`MemoryCursor`] was closed.
#[derive(Debug, Clone, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    /// Number of `close` calls so far.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A cursor over rows held in memory.
///
/// Useful for mapping pre-fetched data and for exercising mappers without a
/// database. Integer values are widened or narrowed to the requested type;
/// other values are returned as stored.
#[derive(Debug, Default)]
pub struct MemoryCursor {
    rows: Vec<HashMap<String, Value>>,
    position: Option<usize>,
    fail_at: Option<usize>,
    closed: bool,
    closes: CloseCounter,
}

impl MemoryCursor {
    /// Create an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of `(label, value)` pairs.
    pub fn with_row<I, L>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (L, Value)>,
        L: Into<String>,
    {
        self.push_row(row);
        self
    }

    /// Make advancing onto row `index` (zero-based) fail.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Append a row of `(label, value)` pairs.
    pub fn push_row<I, L>(&mut self, row: I)
    where
        I: IntoIterator<Item = (L, Value)>,
        L: Into<String>,
    {
        self.rows
            .push(row.into_iter().map(|(l, v)| (l.into(), v)).collect());
    }

    /// Handle observing `close` calls, valid after the cursor is moved.
    pub fn close_counter(&self) -> CloseCounter {
        self.closes.clone()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Cursor for MemoryCursor {
    fn advance(&mut self) -> Result<bool, CursorError> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        let next = self.position.map_or(0, |p| p + 1);
        if self.fail_at == Some(next) {
            return Err(CursorError::backend(std::io::Error::other(
                "injected advance failure",
            )));
        }
        self.position = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn read(&mut self, label: &str, scalar: ScalarType) -> Result<Option<Value>, CursorError> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or(CursorError::NoCurrentRow)?;
        let value = row
            .get(label)
            .ok_or_else(|| CursorError::UnknownColumn(label.to_string()))?;

        let value = match (value, scalar) {
            (Value::Null, _) => return Ok(None),
            (Value::Int32(i), ScalarType::Int64) => Value::Int64(i64::from(*i)),
            (Value::Int64(i), ScalarType::Int32) => {
                let narrowed = i32::try_from(*i).map_err(|e| CursorError::Conversion {
                    label: label.to_string(),
                    expected: scalar,
                    reason: e.to_string(),
                })?;
                Value::Int32(narrowed)
            }
            (other, _) => other.clone(),
        };
        Ok(Some(value))
    }

    fn close(&mut self) -> Result<(), CursorError> {
        self.closed = true;
        self.closes.increment();
        Ok(())
    }
}
