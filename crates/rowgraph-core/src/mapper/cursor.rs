//! Cursor and executor contracts.

use tracing::{trace, warn};

use crate::catalog::{ScalarType, Value};
use crate::error::{CursorError, Result};

/// Forward-only access to a tabular result addressed by column label.
pub trait Cursor {
    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> std::result::Result<bool, CursorError>;

    /// Read the labeled column of the current row as `scalar`.
    ///
    /// Database null is returned as `None`.
    fn read(
        &mut self,
        label: &str,
        scalar: ScalarType,
    ) -> std::result::Result<Option<Value>, CursorError>;

    /// Release the underlying resource.
    fn close(&mut self) -> std::result::Result<(), CursorError>;
}

impl<C: Cursor + ?Sized> Cursor for &mut C {
    fn advance(&mut self) -> std::result::Result<bool, CursorError> {
        (**self).advance()
    }

    fn read(
        &mut self,
        label: &str,
        scalar: ScalarType,
    ) -> std::result::Result<Option<Value>, CursorError> {
        (**self).read(label, scalar)
    }

    fn close(&mut self) -> std::result::Result<(), CursorError> {
        (**self).close()
    }
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    fn advance(&mut self) -> std::result::Result<bool, CursorError> {
        (**self).advance()
    }

    fn read(
        &mut self,
        label: &str,
        scalar: ScalarType,
    ) -> std::result::Result<Option<Value>, CursorError> {
        (**self).read(label, scalar)
    }

    fn close(&mut self) -> std::result::Result<(), CursorError> {
        (**self).close()
    }
}

/// Runs a statement and hands its cursor to a callback.
///
/// The cursor lives only for the duration of the callback.
pub trait Executor {
    /// Execute `sql` and pass the resulting cursor to `f`.
    fn query<R, F>(&self, sql: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn Cursor) -> Result<R>;
}

/// Owns a cursor and closes it exactly once.
///
/// Closing happens on [`ScopedCursor::close`], on [`ScopedCursor::release`],
/// or when the guard is dropped, whichever comes first.
#[derive(Debug)]
pub struct ScopedCursor<C: Cursor> {
    inner: C,
    closed: bool,
}

impl<C: Cursor> ScopedCursor<C> {
    /// Take ownership of `inner`.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Check if the cursor has been released.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the cursor, reporting a failed close.
    pub fn close(&mut self) -> std::result::Result<(), CursorError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        trace!("Closing cursor");
        self.inner.close()
    }

    /// Close the cursor, logging a failed close.
    pub fn release(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close cursor");
        }
    }
}

impl<C: Cursor> Cursor for ScopedCursor<C> {
    fn advance(&mut self) -> std::result::Result<bool, CursorError> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        self.inner.advance()
    }

    fn read(
        &mut self,
        label: &str,
        scalar: ScalarType,
    ) -> std::result::Result<Option<Value>, CursorError> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        self.inner.read(label, scalar)
    }

    fn close(&mut self) -> std::result::Result<(), CursorError> {
        ScopedCursor::close(self)
    }
}

impl<C: Cursor> Drop for ScopedCursor<C> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::MemoryCursor;

    #[test]
    fn test_scoped_cursor_closes_once() {
        let cursor = MemoryCursor::new();
        let closes = cursor.close_counter();

        let mut scoped = ScopedCursor::new(cursor);
        scoped.close().unwrap();
        scoped.close().unwrap();
        drop(scoped);

        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_scoped_cursor_closes_on_drop() {
        let cursor = MemoryCursor::new().with_row([("a", Value::Int64(1))]);
        let closes = cursor.close_counter();
        {
            let mut scoped = ScopedCursor::new(cursor);
            assert!(scoped.advance().unwrap());
        }
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_closed_cursor_rejects_reads() {
        let mut scoped = ScopedCursor::new(MemoryCursor::new());
        scoped.release();
        assert!(scoped.is_closed());
        assert!(matches!(scoped.advance(), Err(CursorError::Closed)));
        assert!(matches!(
            scoped.read("a", ScalarType::Int64),
            Err(CursorError::Closed)
        ));
    }
}
