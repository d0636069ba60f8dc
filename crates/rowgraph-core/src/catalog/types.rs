//! Scalar types and runtime values.

use std::any::Any;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Semantic type of a stored column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Calendar date without time zone.
    Date,
    /// Time of day without time zone.
    Time,
    /// Date and time without time zone.
    DateTime,
}

impl ScalarType {
    /// Lowercase name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float64 => "float64",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::Date => "date",
            ScalarType::Time => "time",
            ScalarType::DateTime => "datetime",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value read from or written to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Database null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the contained type, `"null"` for null.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Try to get as i64, widening 32-bit integers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(i) => Some(*i),
            Value::Int32(i) => Some(i64::from(*i)),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a typed Rust value.
    pub fn into_typed<T: FromValue>(self) -> Result<T, ValueError> {
        T::from_value(self)
    }
}

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    /// Convert the value, failing on a type mismatch.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn mismatch(expected: &'static str, value: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: value.type_name(),
    }
}

macro_rules! impl_value_conversions {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(mismatch($name, &other)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_value_conversions!(bool, Bool, "bool");
impl_value_conversions!(i32, Int32, "int32");
impl_value_conversions!(f64, Float64, "float64");
impl_value_conversions!(String, String, "string");
impl_value_conversions!(Vec<u8>, Bytes, "bytes");
impl_value_conversions!(NaiveDate, Date, "date");
impl_value_conversions!(NaiveTime, Time, "time");
impl_value_conversions!(NaiveDateTime, DateTime, "datetime");

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        value.as_i64().ok_or_else(|| mismatch("int64", &value))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A value handed to [`Entity::assign`](super::Entity::assign).
pub enum FieldValue {
    /// Scalar column value, never null.
    Scalar(Value),
    /// Materialized nested entity.
    Entity(Box<dyn Any + Send>),
    /// Resolved enumeration constant.
    Enum(Box<dyn Any + Send>),
}

impl FieldValue {
    /// Extract a scalar as `T`.
    pub fn into_scalar<T: FromValue>(self) -> Result<T, ValueError> {
        match self {
            FieldValue::Scalar(value) => T::from_value(value),
            FieldValue::Entity(_) => Err(ValueError::TypeMismatch {
                expected: "scalar",
                found: "entity",
            }),
            FieldValue::Enum(_) => Err(ValueError::TypeMismatch {
                expected: "scalar",
                found: "enumeration",
            }),
        }
    }

    /// Extract a nested entity of type `T`.
    pub fn into_entity<T: 'static>(self) -> Result<T, ValueError> {
        match self {
            FieldValue::Entity(boxed) => downcast(boxed),
            other => Err(ValueError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: other.kind(),
            }),
        }
    }

    /// Extract an enumeration constant of type `T`.
    pub fn into_enum<T: 'static>(self) -> Result<T, ValueError> {
        match self {
            FieldValue::Enum(boxed) => downcast(boxed),
            other => Err(ValueError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: other.kind(),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Scalar(value) => value.type_name(),
            FieldValue::Entity(_) => "entity",
            FieldValue::Enum(_) => "enumeration",
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            FieldValue::Entity(_) => f.write_str("Entity(..)"),
            FieldValue::Enum(_) => f.write_str("Enum(..)"),
        }
    }
}

fn downcast<T: 'static>(boxed: Box<dyn Any + Send>) -> Result<T, ValueError> {
    boxed
        .downcast::<T>()
        .map(|b| *b)
        .map_err(|_| ValueError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found: "another type",
        })
}
