//! Core error types.

use thiserror::Error;

use crate::catalog::ScalarType;

/// Errors raised while building queries or mapping results.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid entity declaration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A foreign-key chain loops back onto a field already on the current path.
    #[error("reference cycle through `{entity}.{field}`")]
    ReferenceCycle {
        /// Declaring entity type.
        entity: &'static str,
        /// Field closing the cycle.
        field: String,
    },

    /// The join graph is deeper than the configured bound.
    #[error("join depth exceeds maximum of {max} at `{path}`")]
    DepthExceeded {
        /// Configured maximum depth.
        max: usize,
        /// Dotted field path that crossed the bound.
        path: String,
    },

    /// A read value could not be assigned to its field.
    #[error("failed to map `{entity}.{field}`: {source}")]
    Mapping {
        /// Declaring entity type.
        entity: &'static str,
        /// Field being assigned.
        field: String,
        /// Underlying conversion failure.
        #[source]
        source: ValueError,
    },

    /// Cursor provider failure.
    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),

    /// Filter could not be rendered as SQL.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

/// Entity declaration errors.
///
/// These are programming mistakes in an `Entity` implementation and are
/// reported the first time the entity is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two fields share a name.
    #[error("`{entity}` declares field `{field}` more than once")]
    DuplicateField { entity: &'static str, field: String },

    /// Two fields resolve to the same column.
    #[error("`{entity}` maps more than one field to column `{column}`")]
    DuplicateColumn { entity: &'static str, column: String },

    /// A foreign key names a local id field that is not a declared scalar.
    #[error("`{entity}.{field}` stores its id in `{via}`, which is not a declared scalar field")]
    UnknownForeignKeyField {
        entity: &'static str,
        field: String,
        via: String,
    },

    /// Explicit table name override is empty.
    #[error("`{entity}` declares an empty table name")]
    EmptyTableName { entity: &'static str },

    /// Enumeration exposes no constants.
    #[error("enumeration `{enumeration}` used by `{entity}.{field}` has no variants")]
    EmptyEnumeration {
        entity: &'static str,
        field: String,
        enumeration: &'static str,
    },

    /// Two enumeration constants share an identifier.
    #[error("enumeration `{enumeration}` has duplicate id {id}")]
    DuplicateEnumId { enumeration: &'static str, id: i64 },

    /// Two projected columns would carry the same label.
    #[error("projection label `{label}` is ambiguous")]
    AmbiguousLabel { label: String },
}

/// Conversion failure between a stored value and a field type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The value has the wrong type for the field.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The stored value could not be read as the field's type.
    #[error("cannot read {expected}: {reason}")]
    Unreadable {
        expected: &'static str,
        reason: String,
    },

    /// The entity has no field with this name.
    #[error("unknown field")]
    UnknownField,
}

/// Failure reported by a cursor provider.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The result set has no column with this label.
    #[error("no column labeled `{0}`")]
    UnknownColumn(String),

    /// A stored value could not be read as the requested type.
    #[error("column `{label}` cannot be read as {expected:?}: {reason}")]
    Conversion {
        label: String,
        expected: ScalarType,
        reason: String,
    },

    /// Read attempted without a current row.
    #[error("cursor is not positioned on a row")]
    NoCurrentRow,

    /// Read or advance attempted after close.
    #[error("cursor is closed")]
    Closed,

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CursorError {
    /// Wrap a backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CursorError::Backend(Box::new(err))
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::Mapping {
            entity: "app::Post",
            field: "title".to_string(),
            source: ValueError::TypeMismatch {
                expected: "string",
                found: "int64",
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to map `app::Post.title`: expected string, found int64"
        );

        let err: Error = ConfigError::DuplicateEnumId {
            enumeration: "Status",
            id: 2,
        }
        .into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("duplicate id 2"));
    }

    #[test]
    fn test_cursor_error_conversion() {
        let err: Error = CursorError::UnknownColumn("post_title".into()).into();
        assert_eq!(err.to_string(), "cursor error: no column labeled `post_title`");
    }
}
