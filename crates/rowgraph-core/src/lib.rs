//! rowgraph core - entity metadata, join graph construction, and result mapping.
//!
//! Entities declare their fields statically through [`Entity`]. A [`Query`]
//! resolves the declaration, walks foreign keys into a [`JoinGraph`] with
//! query-scoped aliases, renders one SELECT statement, and maps the
//! `<alias>_<column>` labeled rows back into nested entities.

pub mod catalog;
pub mod config;
pub mod error;
pub mod mapper;
pub mod query;

#[cfg(test)]
mod testing;

pub use catalog::{
    Catalog, ColumnDescriptor, Entity, EntityDescriptor, FieldDef, FieldDescriptor, FieldKind,
    FieldValue, ForeignKeyDescriptor, FromValue, IdentifiableEnum, JoinKind, ReferenceTarget,
    ScalarType, Value,
};
pub use config::{CyclePolicy, QueryConfig};
pub use error::{ConfigError, CursorError, Error, Result, ValueError};
pub use mapper::{CloseCounter, Cursor, EntityMapper, EntityRows, Executor, MemoryCursor, ScopedCursor};
pub use query::{
    AliasAllocator, ColumnReference, FilterExpr, JoinClause, JoinGraph, JoinGraphBuilder,
    JoinNode, OrderDirection, OrderTerm, PredicateTranslator, PreparedQuery, Query, QueryPlan,
    SqlTranslator,
};
