//! Result mapping from labeled cursors into entity graphs.

mod cursor;
mod entity;
mod memory;

pub use cursor::{Cursor, Executor, ScopedCursor};
pub use entity::{EntityMapper, EntityRows};
pub use memory::{CloseCounter, MemoryCursor};

pub(crate) use entity::materialize_boxed;
