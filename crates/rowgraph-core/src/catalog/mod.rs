//! Entity metadata: declarations, descriptors, and the descriptor cache.

mod catalog;
mod entity;
mod field;
mod types;

pub use catalog::Catalog;
pub use entity::{
    default_table_name, ColumnDescriptor, Entity, EntityDescriptor, FieldDescriptor,
    ForeignKeyDescriptor, IdentifiableEnum, ReferenceTarget,
};
pub use field::{EntityRef, EnumRef, FieldDef, FieldKind, JoinKind};
pub use types::{FieldValue, FromValue, ScalarType, Value};
