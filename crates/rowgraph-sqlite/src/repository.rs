//! Common entity lookups over a [`SqliteExecutor`].

use std::marker::PhantomData;

use rowgraph_core::{Catalog, Entity, FilterExpr, OrderTerm, Query, Result, Value};

use crate::executor::SqliteExecutor;

/// Entity-level lookups: by id, all rows, counts, and duplicate checks.
///
/// Every lookup goes through [`Query`], so registered entity constraints
/// apply here too.
pub struct Repository<'a, E> {
    executor: &'a SqliteExecutor,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity> Repository<'a, E> {
    /// Create a repository over `executor`.
    pub fn new(executor: &'a SqliteExecutor) -> Self {
        Self {
            executor,
            _entity: PhantomData,
        }
    }

    /// Start a custom query.
    pub fn query(&self) -> Query<'static, E> {
        self.executor.select::<E>()
    }

    /// Entity whose identity column equals `id`.
    pub fn get_by_id(&self, id: impl Into<Value>) -> Result<Option<E>> {
        let identity = Catalog::global().resolve::<E>()?.identity_column.clone();
        self.query()
            .filter(FilterExpr::eq(identity, id))
            .first(self.executor)
    }

    /// Every entity.
    pub fn get_all(&self) -> Result<Vec<E>> {
        self.query().all(self.executor)
    }

    /// Every entity, sorted by `order`.
    pub fn get_all_ordered(&self, order: &[OrderTerm]) -> Result<Vec<E>> {
        order
            .iter()
            .fold(self.query(), |query, term| {
                query.order_by(term.field.clone(), term.direction)
            })
            .all(self.executor)
    }

    /// Entities matching `filter`.
    pub fn get_where(&self, filter: FilterExpr) -> Result<Vec<E>> {
        self.query().filter(filter).all(self.executor)
    }

    /// Number of entities.
    pub fn count(&self) -> Result<u64> {
        self.query().count(self.executor)
    }

    /// Number of entities matching `filter`.
    pub fn count_where(&self, filter: FilterExpr) -> Result<u64> {
        self.query().filter(filter).count(self.executor)
    }

    /// Check if any entity exists.
    pub fn any(&self) -> Result<bool> {
        self.query().exists(self.executor)
    }

    /// Check if any entity matches `filter`.
    pub fn any_where(&self, filter: FilterExpr) -> Result<bool> {
        self.query().filter(filter).exists(self.executor)
    }

    /// Check if two entities share a value in `column`.
    pub fn has_duplicates(&self, column: &str) -> Result<bool> {
        self.query().has_duplicates(self.executor, column)
    }
}
