//! Process-wide descriptor cache and constraint registry.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::entity::{Entity, EntityDescriptor};
use crate::error::Result;
use crate::query::FilterExpr;

/// Resolved entity metadata and centrally registered constraints.
///
/// Descriptors are computed once per entity type and shared for the lifetime
/// of the catalog. Most callers use [`Catalog::global`].
#[derive(Debug, Default)]
pub struct Catalog {
    descriptors: DashMap<TypeId, Arc<EntityDescriptor>>,
    constraints: RwLock<HashMap<TypeId, Vec<FilterExpr>>>,
}

static GLOBAL: OnceLock<Catalog> = OnceLock::new();

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide catalog.
    pub fn global() -> &'static Catalog {
        GLOBAL.get_or_init(Catalog::new)
    }

    /// Get the descriptor for `E`, resolving it on first access.
    pub fn resolve<E: Entity>(&self) -> Result<Arc<EntityDescriptor>> {
        let type_id = TypeId::of::<E>();
        if let Some(descriptor) = self.descriptors.get(&type_id) {
            return Ok(Arc::clone(descriptor.value()));
        }

        // Resolution never touches the map, so holding the shard lock is safe.
        let entry = self.descriptors.entry(type_id).or_try_insert_with(|| {
            let descriptor = EntityDescriptor::resolve::<E>()?;
            debug!(
                entity = descriptor.type_name,
                table = %descriptor.table_name,
                "Cached entity descriptor"
            );
            Ok::<_, crate::error::Error>(Arc::new(descriptor))
        })?;
        Ok(Arc::clone(entry.value()))
    }

    /// Register a filter applied to every query against `E`.
    pub fn register_constraint<E: Entity>(&self, filter: FilterExpr) {
        debug!(entity = std::any::type_name::<E>(), "Registered entity constraint");
        self.constraints
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(filter);
    }

    /// Every constraint that applies to `E`, conjoined.
    ///
    /// Combines [`Entity::constraint`] with the filters registered here.
    pub fn constraint_for<E: Entity>(&self) -> Option<FilterExpr> {
        let registered = self
            .constraints
            .read()
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();

        E::constraint()
            .into_iter()
            .chain(registered)
            .reduce(FilterExpr::and)
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if no descriptor has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
