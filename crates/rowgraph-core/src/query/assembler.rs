//! SQL statement assembly.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::column::{quote_identifier, ColumnReference};
use super::filter::qualify;
use super::join::{JoinClause, JoinGraph};

/// Offset without a limit still needs a LIMIT clause.
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
    /// Column name, optionally `alias.column`.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderTerm {
    /// Create an ascending term.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending term.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Everything needed to render one SELECT statement.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Root table.
    pub table: String,
    /// Alias the root table is read through.
    pub alias: String,
    /// Projected columns.
    pub projection: Vec<ColumnReference>,
    /// Join clauses.
    pub joins: Vec<JoinClause>,
    /// WHERE fragment, always present.
    pub where_sql: String,
    /// ORDER BY terms, applied in order.
    pub order: Vec<OrderTerm>,
    /// Maximum rows.
    pub limit: Option<u64>,
    /// Rows to skip.
    pub offset: Option<u64>,
}

impl QueryPlan {
    /// Plan selecting every column of `graph`.
    pub fn from_graph(graph: &JoinGraph, where_sql: impl Into<String>) -> Self {
        let root = graph.root();
        Self {
            table: root.entity().table_name.clone(),
            alias: root.alias().to_string(),
            projection: graph.columns().into_iter().cloned().collect(),
            joins: graph.joins().to_vec(),
            where_sql: where_sql.into(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Set the ORDER BY terms.
    pub fn with_order(mut self, order: Vec<OrderTerm>) -> Self {
        self.order = order;
        self
    }

    /// Set the row limit.
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Set the row offset.
    pub fn with_offset(mut self, offset: Option<u64>) -> Self {
        self.offset = offset;
        self
    }

    /// Render the SELECT statement.
    pub fn assemble(&self) -> String {
        let projection = if self.projection.is_empty() {
            "1".to_string()
        } else {
            self.projection
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} {}", projection, self.body());
        if !self.order.is_empty() {
            let terms: Vec<_> = self
                .order
                .iter()
                .map(|t| format!("{} {}", qualify(&t.field, &self.alias), t.direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => {
                sql.push_str(&format!(" LIMIT {UNBOUNDED_LIMIT} OFFSET {offset}"))
            }
            (None, None) => {}
        }
        sql
    }

    /// Render a statement counting matching rows into the `count` label.
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) AS `count` {}", self.body())
    }

    /// Render a statement yielding 1 in the `exists` label when any row matches.
    pub fn exists_sql(&self) -> String {
        format!("SELECT EXISTS(SELECT 1 {}) AS `exists`", self.body())
    }

    /// Render a statement returning one row when `field` has a repeated value.
    pub fn duplicates_sql(&self, field: &str) -> String {
        let column = qualify(field, &self.alias);
        format!(
            "SELECT {column} AS `value` {} GROUP BY {column} HAVING COUNT(*) > 1 LIMIT 1",
            self.body()
        )
    }

    fn body(&self) -> String {
        let mut sql = format!("FROM {}", quote_identifier(&self.table));
        if self.alias != self.table {
            sql.push_str(" AS ");
            sql.push_str(&quote_identifier(&self.alias));
        }
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(&join.to_string());
        }
        sql.push_str(" WHERE ");
        sql.push_str(&self.where_sql);
        sql
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.assemble())
    }
}
