//! Field declarations for entities.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use super::catalog::Catalog;
use super::entity::{Entity, EntityDescriptor, IdentifiableEnum};
use super::types::ScalarType;
use crate::error::Result;
use crate::mapper::{materialize_boxed, Cursor};
use crate::query::JoinNode;

/// How a referenced entity is joined in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinKind {
    /// Rows without a match are dropped.
    #[default]
    Inner,
    /// Rows without a match are kept with null columns.
    Left,
}

impl JoinKind {
    /// SQL keyword for this join.
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// One declared field of an entity.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Column name override.
    pub column: Option<String>,
    /// What the field holds.
    pub kind: FieldKind,
}

/// Classification of a declared field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Plain column.
    Scalar(ScalarType),
    /// Foreign key to another entity, materialized through a join.
    Reference {
        /// Local scalar field storing the foreign id.
        via: String,
        /// Referenced entity.
        target: EntityRef,
        /// Join used to reach the target table.
        join: JoinKind,
    },
    /// Foreign key to an enumeration, resolved from the stored id.
    Enumeration {
        /// Local scalar field storing the id.
        via: String,
        /// Referenced enumeration.
        target: EnumRef,
    },
}

impl FieldDef {
    /// Create a scalar field.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind: FieldKind::Scalar(scalar),
        }
    }

    /// Create a required reference to `T`, stored in the local field `via`.
    pub fn reference<T: Entity>(name: impl Into<String>, via: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind: FieldKind::Reference {
                via: via.into(),
                target: EntityRef::of::<T>(),
                join: JoinKind::Inner,
            },
        }
    }

    /// Create a nullable reference to `T`, joined with `LEFT JOIN`.
    pub fn optional_reference<T: Entity>(
        name: impl Into<String>,
        via: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind: FieldKind::Reference {
                via: via.into(),
                target: EntityRef::of::<T>(),
                join: JoinKind::Left,
            },
        }
    }

    /// Create a reference to the enumeration `T`, stored in the local field `via`.
    pub fn enumeration<T: IdentifiableEnum>(
        name: impl Into<String>,
        via: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind: FieldKind::Enumeration {
                via: via.into(),
                target: EnumRef::of::<T>(),
            },
        }
    }

    /// Override the column name.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Resolved column name.
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

type ResolveFn = fn(&Catalog) -> Result<Arc<EntityDescriptor>>;
type MaterializeFn = fn(&mut dyn Cursor, &JoinNode) -> Result<Box<dyn Any + Send>>;

/// Type-erased handle to a referenced entity type.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_id: TypeId,
    type_name: &'static str,
    resolve: ResolveFn,
    materialize: MaterializeFn,
}

impl EntityRef {
    /// Handle for `T`.
    pub fn of<T: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            resolve: Catalog::resolve::<T>,
            materialize: materialize_boxed::<T>,
        }
    }

    /// Type id of the referenced entity.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name of the referenced entity.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolve the referenced entity's descriptor.
    pub fn descriptor(&self, catalog: &Catalog) -> Result<Arc<EntityDescriptor>> {
        (self.resolve)(catalog)
    }

    /// Materialize the referenced entity from the cursor's current row.
    pub(crate) fn materialize(
        &self,
        cursor: &mut dyn Cursor,
        node: &JoinNode,
    ) -> Result<Box<dyn Any + Send>> {
        (self.materialize)(cursor, node)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.type_name).finish()
    }
}

/// Type-erased handle to an identifiable enumeration.
#[derive(Clone, Copy)]
pub struct EnumRef {
    type_name: &'static str,
    ids: fn() -> Vec<i64>,
    resolve: fn(i64) -> Option<Box<dyn Any + Send>>,
}

impl EnumRef {
    /// Handle for `T`.
    pub fn of<T: IdentifiableEnum>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            ids: enum_ids::<T>,
            resolve: enum_resolve::<T>,
        }
    }

    /// Rust type name of the enumeration.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Identifiers of every constant, in declaration order.
    pub fn ids(&self) -> Vec<i64> {
        (self.ids)()
    }

    /// Constant with the given identifier, if any.
    pub fn resolve(&self, id: i64) -> Option<Box<dyn Any + Send>> {
        (self.resolve)(id)
    }
}

impl fmt::Debug for EnumRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumRef").field(&self.type_name).finish()
    }
}

fn enum_ids<T: IdentifiableEnum>() -> Vec<i64> {
    T::variants().iter().map(IdentifiableEnum::id).collect()
}

fn enum_resolve<T: IdentifiableEnum>(id: i64) -> Option<Box<dyn Any + Send>> {
    T::from_id(id).map(|constant| Box::new(constant) as Box<dyn Any + Send>)
}
