//! Entity declarations and resolved descriptors.

use std::any::TypeId;
use std::collections::HashSet;

use tracing::trace;

use super::field::{EntityRef, EnumRef, FieldDef, FieldKind, JoinKind};
use super::types::{FieldValue, ScalarType};
use crate::error::{ConfigError, ValueError};
use crate::query::FilterExpr;

/// A typed record stored in one table.
///
/// Implementations declare their shape statically through [`Entity::fields`];
/// the catalog resolves the declaration once per type.
pub trait Entity: Default + Send + 'static {
    /// Declared fields, in declaration order.
    fn fields() -> Vec<FieldDef>;

    /// Table name override. Defaults to the snake_case type name.
    fn table_name() -> Option<&'static str> {
        None
    }

    /// Field holding the primary key that foreign keys point at.
    fn identity_field() -> &'static str {
        "id"
    }

    /// Filter conjoined with every query against this entity.
    fn constraint() -> Option<FilterExpr> {
        None
    }

    /// Assign a mapped value to the named field.
    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError>;
}

/// An enumeration referenced by a stable numeric identifier.
pub trait IdentifiableEnum: Clone + Send + 'static {
    /// Every constant of the enumeration.
    fn variants() -> &'static [Self];

    /// Identifier stored in the database.
    fn id(&self) -> i64;

    /// Find the constant with the given identifier.
    fn from_id(id: i64) -> Option<Self> {
        Self::variants().iter().find(|v| v.id() == id).cloned()
    }
}

/// A resolved scalar column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Declaring field name.
    pub field: String,
    /// Column name.
    pub column: String,
    /// Semantic type.
    pub scalar: ScalarType,
}

/// Target of a foreign key.
#[derive(Debug, Clone, Copy)]
pub enum ReferenceTarget {
    /// Another entity, reached through a join.
    Entity {
        target: EntityRef,
        join: JoinKind,
    },
    /// An enumeration, resolved from the stored id.
    Enumeration(EnumRef),
}

/// A resolved foreign-key field.
#[derive(Debug, Clone)]
pub struct ForeignKeyDescriptor {
    /// Field holding the reference.
    pub field: String,
    /// Local field storing the foreign id.
    pub via: String,
    /// Column storing the foreign id.
    pub column: String,
    /// Type of the stored id.
    pub id_type: ScalarType,
    /// What the key points at.
    pub target: ReferenceTarget,
}

/// A resolved field, in declaration order.
#[derive(Debug, Clone)]
pub enum FieldDescriptor {
    Column(ColumnDescriptor),
    ForeignKey(ForeignKeyDescriptor),
}

impl FieldDescriptor {
    /// Declaring field name.
    pub fn name(&self) -> &str {
        match self {
            FieldDescriptor::Column(c) => &c.field,
            FieldDescriptor::ForeignKey(fk) => &fk.field,
        }
    }
}

/// Table and column metadata for one entity type.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    /// Type id of the entity.
    pub type_id: TypeId,
    /// Rust type name of the entity.
    pub type_name: &'static str,
    /// Table name.
    pub table_name: String,
    /// Column referenced by foreign keys pointing at this entity.
    pub identity_column: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    /// Derive the descriptor for `E`, validating the declaration.
    pub fn resolve<E: Entity>() -> Result<Self, ConfigError> {
        let type_name = std::any::type_name::<E>();
        let table_name = match E::table_name() {
            Some("") => return Err(ConfigError::EmptyTableName { entity: type_name }),
            Some(name) => name.to_string(),
            None => default_table_name(type_name),
        };

        let defs = E::fields();
        let mut names = HashSet::new();
        let mut columns = HashSet::new();
        for def in &defs {
            if !names.insert(def.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    entity: type_name,
                    field: def.name.clone(),
                });
            }
            if matches!(def.kind, FieldKind::Scalar(_)) && !columns.insert(def.column_name()) {
                return Err(ConfigError::DuplicateColumn {
                    entity: type_name,
                    column: def.column_name().to_string(),
                });
            }
        }

        let scalar = |via: &str| {
            defs.iter().find_map(|d| match d.kind {
                FieldKind::Scalar(ty) if d.name == via => Some((d.column_name().to_string(), ty)),
                _ => None,
            })
        };

        let mut fields = Vec::with_capacity(defs.len());
        for def in &defs {
            let descriptor = match &def.kind {
                FieldKind::Scalar(ty) => FieldDescriptor::Column(ColumnDescriptor {
                    field: def.name.clone(),
                    column: def.column_name().to_string(),
                    scalar: *ty,
                }),
                FieldKind::Reference { via, target, join } => {
                    let (column, id_type) =
                        scalar(via).ok_or_else(|| ConfigError::UnknownForeignKeyField {
                            entity: type_name,
                            field: def.name.clone(),
                            via: via.clone(),
                        })?;
                    FieldDescriptor::ForeignKey(ForeignKeyDescriptor {
                        field: def.name.clone(),
                        via: via.clone(),
                        column,
                        id_type,
                        target: ReferenceTarget::Entity {
                            target: *target,
                            join: *join,
                        },
                    })
                }
                FieldKind::Enumeration { via, target } => {
                    let (column, id_type) =
                        scalar(via).ok_or_else(|| ConfigError::UnknownForeignKeyField {
                            entity: type_name,
                            field: def.name.clone(),
                            via: via.clone(),
                        })?;
                    validate_enumeration(type_name, &def.name, target)?;
                    FieldDescriptor::ForeignKey(ForeignKeyDescriptor {
                        field: def.name.clone(),
                        via: via.clone(),
                        column,
                        id_type,
                        target: ReferenceTarget::Enumeration(*target),
                    })
                }
            };
            fields.push(descriptor);
        }

        let identity = E::identity_field();
        let identity_column = defs
            .iter()
            .find(|d| d.name == identity)
            .map(|d| d.column_name().to_string())
            .unwrap_or_else(|| identity.to_string());

        trace!(entity = type_name, table = %table_name, fields = fields.len(), "Resolved entity");

        Ok(Self {
            type_id: TypeId::of::<E>(),
            type_name,
            table_name,
            identity_column,
            fields,
        })
    }

    /// Scalar columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.fields.iter().filter_map(|f| match f {
            FieldDescriptor::Column(c) => Some(c),
            FieldDescriptor::ForeignKey(_) => None,
        })
    }

    /// Foreign keys in declaration order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKeyDescriptor> {
        self.fields.iter().filter_map(|f| match f {
            FieldDescriptor::ForeignKey(fk) => Some(fk),
            FieldDescriptor::Column(_) => None,
        })
    }

    /// Look up a scalar column by field name.
    pub fn column(&self, field: &str) -> Option<&ColumnDescriptor> {
        self.columns().find(|c| c.field == field)
    }
}

fn validate_enumeration(
    entity: &'static str,
    field: &str,
    target: &EnumRef,
) -> Result<(), ConfigError> {
    let ids = target.ids();
    if ids.is_empty() {
        return Err(ConfigError::EmptyEnumeration {
            entity,
            field: field.to_string(),
            enumeration: target.type_name(),
        });
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateEnumId {
                enumeration: target.type_name(),
                id,
            });
        }
    }
    Ok(())
}

/// Snake_case table name from a Rust type path, e.g. `app::BlogPost` -> `blog_post`.
pub fn default_table_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let base = base.rsplit("::").next().unwrap_or(base);

    let chars: Vec<char> = base.chars().collect();
    let mut out = String::with_capacity(base.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct BlogPost {
        id: i64,
        status_id: i64,
    }

    impl Entity for BlogPost {
        fn fields() -> Vec<FieldDef> {
            vec![
                FieldDef::scalar("id", ScalarType::Int64),
                FieldDef::scalar("status_id", ScalarType::Int64).with_column("statusId"),
                FieldDef::enumeration::<Color>("status", "status_id"),
            ]
        }

        fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), ValueError> {
            match field {
                "id" => self.id = value.into_scalar()?,
                "status_id" => self.status_id = value.into_scalar()?,
                "status" => {}
                _ => return Err(ValueError::UnknownField),
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Color {
        Red,
        Green,
    }

    impl IdentifiableEnum for Color {
        fn variants() -> &'static [Self] {
            &[Color::Red, Color::Green]
        }

        fn id(&self) -> i64 {
            *self as i64
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Clashing {
        A,
        B,
    }

    impl IdentifiableEnum for Clashing {
        fn variants() -> &'static [Self] {
            &[Clashing::A, Clashing::B]
        }

        fn id(&self) -> i64 {
            1
        }
    }

    #[derive(Debug, Default)]
    struct Broken;

    impl Entity for Broken {
        fn fields() -> Vec<FieldDef> {
            vec![
                FieldDef::scalar("id", ScalarType::Int64),
                FieldDef::reference::<BlogPost>("post", "post_id"),
            ]
        }

        fn assign(&mut self, _field: &str, _value: FieldValue) -> Result<(), ValueError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct BadEnum;

    impl Entity for BadEnum {
        fn table_name() -> Option<&'static str> {
            Some("bad")
        }

        fn fields() -> Vec<FieldDef> {
            vec![
                FieldDef::scalar("kind_id", ScalarType::Int64),
                FieldDef::enumeration::<Clashing>("kind", "kind_id"),
            ]
        }

        fn assign(&mut self, _field: &str, _value: FieldValue) -> Result<(), ValueError> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Unset {}

    impl IdentifiableEnum for Unset {
        fn variants() -> &'static [Self] {
            &[]
        }

        fn id(&self) -> i64 {
            match *self {}
        }
    }

    #[derive(Debug, Default)]
    struct NoVariants;

    impl Entity for NoVariants {
        fn fields() -> Vec<FieldDef> {
            vec![
                FieldDef::scalar("state_id", ScalarType::Int64),
                FieldDef::enumeration::<Unset>("state", "state_id"),
            ]
        }

        fn assign(&mut self, _field: &str, _value: FieldValue) -> Result<(), ValueError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Unnamed;

    impl Entity for Unnamed {
        fn table_name() -> Option<&'static str> {
            Some("")
        }

        fn fields() -> Vec<FieldDef> {
            vec![FieldDef::scalar("id", ScalarType::Int64)]
        }

        fn assign(&mut self, _field: &str, _value: FieldValue) -> Result<(), ValueError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct SharedColumn;

    impl Entity for SharedColumn {
        fn fields() -> Vec<FieldDef> {
            vec![
                FieldDef::scalar("name", ScalarType::String),
                FieldDef::scalar("title", ScalarType::String).with_column("name"),
            ]
        }

        fn assign(&mut self, _field: &str, _value: FieldValue) -> Result<(), ValueError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("app::model::BlogPost"), "blog_post");
        assert_eq!(default_table_name("User"), "user");
        assert_eq!(default_table_name("HTTPRequest"), "http_request");
        assert_eq!(default_table_name("app::Page<app::User>"), "page");
    }

    #[test]
    fn test_resolve_descriptor() {
        let descriptor = EntityDescriptor::resolve::<BlogPost>().unwrap();
        assert_eq!(descriptor.table_name, "blog_post");
        assert_eq!(descriptor.identity_column, "id");
        assert_eq!(descriptor.columns().count(), 2);

        let fk = descriptor.foreign_keys().next().unwrap();
        assert_eq!(fk.field, "status");
        assert_eq!(fk.column, "statusId");
        assert!(matches!(fk.target, ReferenceTarget::Enumeration(_)));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let a = EntityDescriptor::resolve::<BlogPost>().unwrap();
        let b = EntityDescriptor::resolve::<BlogPost>().unwrap();
        let names = |d: &EntityDescriptor| {
            d.fields.iter().map(|f| f.name().to_string()).collect::<Vec<_>>()
        };
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.table_name, b.table_name);
    }

    #[test]
    fn test_unknown_foreign_key_field() {
        let err = EntityDescriptor::resolve::<Broken>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownForeignKeyField { ref field, ref via, .. }
                if field == "post" && via == "post_id"
        ));
    }

    #[test]
    fn test_duplicate_enum_id() {
        let err = EntityDescriptor::resolve::<BadEnum>().unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEnumId { id: 1, .. }));
    }

    #[test]
    fn test_empty_table_name() {
        let err = EntityDescriptor::resolve::<Unnamed>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyTableName { entity } if entity.ends_with("Unnamed")
        ));
    }

    #[test]
    fn test_duplicate_column() {
        let err = EntityDescriptor::resolve::<SharedColumn>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateColumn { entity, ref column }
                if entity.ends_with("SharedColumn") && column == "name"
        ));
    }

    #[test]
    fn test_empty_enumeration() {
        let err = EntityDescriptor::resolve::<NoVariants>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EmptyEnumeration { entity, ref field, enumeration }
                if entity.ends_with("NoVariants") && field == "state" && enumeration.ends_with("Unset")
        ));
    }
}
