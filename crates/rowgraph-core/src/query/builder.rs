//! Builder-style query object.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use super::assembler::{OrderDirection, OrderTerm, QueryPlan};
use super::filter::{FilterExpr, PredicateTranslator, SqlTranslator};
use super::join::{JoinGraph, JoinGraphBuilder};
use crate::catalog::{Catalog, Entity, ScalarType, Value};
use crate::config::QueryConfig;
use crate::error::{Error, Result, ValueError};
use crate::mapper::{Cursor, EntityMapper, EntityRows, Executor, ScopedCursor};

/// A built join graph and the plan rendered from it.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    /// Join tree used to map the results.
    pub graph: JoinGraph,
    /// Statement plan.
    pub plan: QueryPlan,
}

impl PreparedQuery {
    /// Rendered SELECT statement.
    pub fn sql(&self) -> String {
        self.plan.assemble()
    }
}

/// Query against entities of type `E`.
///
/// Every statement built from a query carries the entity's registered
/// constraints in its WHERE clause, in addition to any caller filter.
///
/// ```ignore
/// let posts = Query::<Post>::new()
///     .filter(FilterExpr::eq("status_id", 2i64))
///     .order_by("created_at", OrderDirection::Desc)
///     .limit(10)
///     .all(&executor)?;
/// ```
pub struct Query<'c, E> {
    catalog: &'c Catalog,
    config: QueryConfig,
    translator: Arc<dyn PredicateTranslator>,
    filter: Option<FilterExpr>,
    order: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: Option<u64>,
    alias: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Query<'static, E> {
    /// Query resolved through the global catalog.
    pub fn new() -> Self {
        Self::with_catalog(Catalog::global())
    }
}

impl<E: Entity> Default for Query<'static, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Query<'_, E> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog,
            config: self.config.clone(),
            translator: Arc::clone(&self.translator),
            filter: self.filter.clone(),
            order: self.order.clone(),
            limit: self.limit,
            offset: self.offset,
            alias: self.alias.clone(),
            _entity: PhantomData,
        }
    }
}

impl<'c, E: Entity> Query<'c, E> {
    /// Query resolved through `catalog`.
    pub fn with_catalog(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            config: QueryConfig::default(),
            translator: Arc::new(SqlTranslator::new()),
            filter: None,
            order: Vec::new(),
            limit: None,
            offset: None,
            alias: None,
            _entity: PhantomData,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the predicate translator.
    pub fn with_translator(mut self, translator: Arc<dyn PredicateTranslator>) -> Self {
        self.translator = translator;
        self
    }

    /// Add a filter. Repeated calls are conjoined.
    pub fn filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Append an ORDER BY term. Later terms break ties of earlier ones.
    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order.push(OrderTerm {
            field: field.into(),
            direction,
        });
        self
    }

    /// Limit the number of rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip rows.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Read the root entity through `alias` instead of its table name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Caller filter conjoined with every registered constraint.
    pub fn effective_filter(&self) -> FilterExpr {
        let caller = self.filter.clone().unwrap_or(FilterExpr::True);
        match self.catalog.constraint_for::<E>() {
            Some(constraint) => caller.and(constraint),
            None => caller,
        }
    }

    /// Build the join graph and statement plan.
    pub fn prepare(&self) -> Result<PreparedQuery> {
        let graph = JoinGraphBuilder::new(self.catalog, &self.config)
            .build_for::<E>(self.alias.as_deref())?;
        let where_sql = self
            .translator
            .to_sql(&self.effective_filter(), graph.root().alias())?;
        let plan = QueryPlan::from_graph(&graph, where_sql)
            .with_order(self.order.clone())
            .with_limit(self.limit)
            .with_offset(self.offset);
        Ok(PreparedQuery { graph, plan })
    }

    /// Rendered SELECT statement.
    pub fn to_sql(&self) -> Result<String> {
        Ok(self.prepare()?.sql())
    }

    /// First matching entity.
    pub fn first<X: Executor>(&self, executor: &X) -> Result<Option<E>> {
        let mut prepared = self.prepare()?;
        prepared.plan.limit = Some(self.limit.map_or(1, |limit| limit.min(1)));
        let sql = prepared.sql();
        self.log(&sql);
        executor.query(&sql, |cursor| {
            EntityMapper::<E>::new(&prepared.graph).map_one(cursor)
        })
    }

    /// Every matching entity.
    pub fn all<X: Executor>(&self, executor: &X) -> Result<Vec<E>> {
        self.scan(executor, |rows| rows.collect())
    }

    /// Stream matching entities through `f`.
    ///
    /// The cursor stays open only while `f` runs and is closed whether or
    /// not `f` consumes every row.
    pub fn scan<X, R, F>(&self, executor: &X, f: F) -> Result<R>
    where
        X: Executor,
        F: FnOnce(EntityRows<'_, E, &mut dyn Cursor>) -> Result<R>,
    {
        let prepared = self.prepare()?;
        let sql = prepared.sql();
        self.log(&sql);
        executor.query(&sql, |cursor| {
            f(EntityMapper::<E>::new(&prepared.graph).map_all(cursor))
        })
    }

    /// Number of matching rows.
    pub fn count<X: Executor>(&self, executor: &X) -> Result<u64> {
        let sql = self.prepare()?.plan.count_sql();
        self.log(&sql);
        let value = executor.query(&sql, |cursor| single_value(cursor, "count", ScalarType::Int64))?;
        let count = value.as_ref().and_then(Value::as_i64).unwrap_or(0);
        u64::try_from(count).map_err(|_| Error::Mapping {
            entity: std::any::type_name::<E>(),
            field: "count".to_string(),
            source: ValueError::TypeMismatch {
                expected: "non-negative count",
                found: "negative integer",
            },
        })
    }

    /// Check if any row matches.
    pub fn exists<X: Executor>(&self, executor: &X) -> Result<bool> {
        let sql = self.prepare()?.plan.exists_sql();
        self.log(&sql);
        let value = executor.query(&sql, |cursor| single_value(cursor, "exists", ScalarType::Bool))?;
        Ok(match value {
            Some(Value::Bool(b)) => b,
            Some(other) => other.as_i64().is_some_and(|i| i != 0),
            None => false,
        })
    }

    /// Check if any value of `field` occurs in more than one matching row.
    pub fn has_duplicates<X: Executor>(&self, executor: &X, field: &str) -> Result<bool> {
        let sql = self.prepare()?.plan.duplicates_sql(field);
        self.log(&sql);
        executor.query(&sql, |cursor| {
            let mut cursor = ScopedCursor::new(cursor);
            let found = cursor.advance();
            match found {
                Ok(found) => {
                    cursor.close()?;
                    Ok(found)
                }
                Err(e) => {
                    cursor.release();
                    Err(e.into())
                }
            }
        })
    }

    fn log(&self, sql: &str) {
        if self.config.log_statements {
            debug!(entity = std::any::type_name::<E>(), sql, "Executing statement");
        }
    }
}

/// Read one labeled value from the first row, closing the cursor.
fn single_value(cursor: &mut dyn Cursor, label: &str, scalar: ScalarType) -> Result<Option<Value>> {
    let mut cursor = ScopedCursor::new(cursor);
    let value = match cursor.advance() {
        Ok(true) => cursor.read(label, scalar),
        Ok(false) => Ok(None),
        Err(e) => Err(e),
    };
    match value {
        Ok(value) => {
            cursor.close()?;
            Ok(value)
        }
        Err(e) => {
            cursor.release();
            Err(e.into())
        }
    }
}
