//! Query construction: aliases, join graphs, filters, and SQL assembly.

mod alias;
mod assembler;
mod builder;
mod column;
mod filter;
mod join;

pub use alias::AliasAllocator;
pub use assembler::{OrderDirection, OrderTerm, QueryPlan};
pub use builder::{PreparedQuery, Query};
pub use column::{projection_label, quote_identifier, ColumnReference};
pub use filter::{literal, qualify, FilterExpr, PredicateTranslator, SqlTranslator};
pub use join::{JoinClause, JoinGraph, JoinGraphBuilder, JoinNode};
