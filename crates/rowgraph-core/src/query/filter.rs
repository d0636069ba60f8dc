//! Filter expressions and their translation to SQL.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use super::column::quote_identifier;
use crate::catalog::Value;
use crate::error::{Error, Result};

/// A boolean filter over columns.
///
/// `field` names a column of the context table, or `alias.column` for a
/// column of a joined entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    /// Always true.
    True,
    /// Always false.
    False,
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field is null.
    IsNull { field: String },
    /// Field is not null.
    IsNotNull { field: String },
    /// Field matches a LIKE pattern.
    Like { field: String, pattern: String },
    /// Field does not match a LIKE pattern.
    NotLike { field: String, pattern: String },
    /// All conditions must be true.
    And(Vec<FilterExpr>),
    /// At least one condition must be true.
    Or(Vec<FilterExpr>),
    /// Negation.
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal filter.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than-or-equal filter.
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than-or-equal filter.
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN filter.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::In {
            field: field.into(),
            values,
        }
    }

    /// Create a NOT IN filter.
    pub fn not_in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::NotIn {
            field: field.into(),
            values,
        }
    }

    /// Create an IS NULL filter.
    pub fn is_null(field: impl Into<String>) -> Self {
        FilterExpr::IsNull {
            field: field.into(),
        }
    }

    /// Create an IS NOT NULL filter.
    pub fn is_not_null(field: impl Into<String>) -> Self {
        FilterExpr::IsNotNull {
            field: field.into(),
        }
    }

    /// Create a LIKE filter.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Create a NOT LIKE filter.
    pub fn not_like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::NotLike {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    /// Conjoin with another filter, flattening nested conjunctions.
    pub fn and(self, other: FilterExpr) -> Self {
        match (self, other) {
            (FilterExpr::True, other) => other,
            (this, FilterExpr::True) => this,
            (FilterExpr::And(mut left), FilterExpr::And(right)) => {
                left.extend(right);
                FilterExpr::And(left)
            }
            (FilterExpr::And(mut left), other) => {
                left.push(other);
                FilterExpr::And(left)
            }
            (this, other) => FilterExpr::And(vec![this, other]),
        }
    }

    /// Disjoin with another filter, flattening nested disjunctions.
    pub fn or(self, other: FilterExpr) -> Self {
        match (self, other) {
            (FilterExpr::Or(mut left), FilterExpr::Or(right)) => {
                left.extend(right);
                FilterExpr::Or(left)
            }
            (FilterExpr::Or(mut left), other) => {
                left.push(other);
                FilterExpr::Or(left)
            }
            (this, other) => FilterExpr::Or(vec![this, other]),
        }
    }

    /// Negate this filter.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        FilterExpr::Not(Box::new(self))
    }
}

/// Converts a filter tree into a SQL boolean expression.
pub trait PredicateTranslator: Send + Sync {
    /// Render `filter`, qualifying unqualified columns with `context`.
    fn to_sql(&self, filter: &FilterExpr, context: &str) -> Result<String>;
}

/// Default translator rendering literals inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlTranslator;

const ALWAYS_TRUE: &str = "1 = 1";
const ALWAYS_FALSE: &str = "1 = 0";

impl SqlTranslator {
    /// Create a translator.
    pub fn new() -> Self {
        Self
    }

    fn render(&self, filter: &FilterExpr, context: &str) -> Result<String> {
        let sql = match filter {
            FilterExpr::True => ALWAYS_TRUE.to_string(),
            FilterExpr::False => ALWAYS_FALSE.to_string(),
            FilterExpr::Eq { field, value } if value.is_null() => {
                format!("{} IS NULL", qualify(field, context))
            }
            FilterExpr::Ne { field, value } if value.is_null() => {
                format!("{} IS NOT NULL", qualify(field, context))
            }
            FilterExpr::Eq { field, value } => compare(field, "=", value, context)?,
            FilterExpr::Ne { field, value } => compare(field, "<>", value, context)?,
            FilterExpr::Lt { field, value } => compare(field, "<", value, context)?,
            FilterExpr::Le { field, value } => compare(field, "<=", value, context)?,
            FilterExpr::Gt { field, value } => compare(field, ">", value, context)?,
            FilterExpr::Ge { field, value } => compare(field, ">=", value, context)?,
            FilterExpr::In { values, .. } if values.is_empty() => ALWAYS_FALSE.to_string(),
            FilterExpr::NotIn { values, .. } if values.is_empty() => ALWAYS_TRUE.to_string(),
            FilterExpr::In { field, values } => {
                format!("{} IN ({})", qualify(field, context), literal_list(values)?)
            }
            FilterExpr::NotIn { field, values } => {
                format!("{} NOT IN ({})", qualify(field, context), literal_list(values)?)
            }
            FilterExpr::IsNull { field } => format!("{} IS NULL", qualify(field, context)),
            FilterExpr::IsNotNull { field } => format!("{} IS NOT NULL", qualify(field, context)),
            FilterExpr::Like { field, pattern } => {
                format!("{} LIKE {}", qualify(field, context), quote_string(pattern))
            }
            FilterExpr::NotLike { field, pattern } => {
                format!("{} NOT LIKE {}", qualify(field, context), quote_string(pattern))
            }
            FilterExpr::And(parts) => self.join(parts, " AND ", ALWAYS_TRUE, context)?,
            FilterExpr::Or(parts) => self.join(parts, " OR ", ALWAYS_FALSE, context)?,
            FilterExpr::Not(inner) => format!("NOT ({})", self.render(inner, context)?),
        };
        Ok(sql)
    }

    fn join(
        &self,
        parts: &[FilterExpr],
        separator: &str,
        empty: &str,
        context: &str,
    ) -> Result<String> {
        match parts {
            [] => Ok(empty.to_string()),
            [single] => self.render(single, context),
            _ => {
                let rendered = parts
                    .iter()
                    .map(|p| self.render(p, context))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", rendered.join(separator)))
            }
        }
    }
}

impl PredicateTranslator for SqlTranslator {
    fn to_sql(&self, filter: &FilterExpr, context: &str) -> Result<String> {
        self.render(filter, context)
    }
}

/// Qualify a column with `context` unless it already names an alias.
pub fn qualify(field: &str, context: &str) -> String {
    match field.split_once('.') {
        Some((alias, column)) => format!("{}.{}", quote_identifier(alias), quote_identifier(column)),
        None => format!("{}.{}", quote_identifier(context), quote_identifier(field)),
    }
}

fn compare(field: &str, op: &str, value: &Value, context: &str) -> Result<String> {
    Ok(format!("{} {} {}", qualify(field, context), op, literal(value)?))
}

fn literal_list(values: &[Value]) -> Result<String> {
    let rendered = values.iter().map(literal).collect::<Result<Vec<_>>>()?;
    Ok(rendered.join(", "))
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Render a value as an inline SQL literal.
pub fn literal(value: &Value) -> Result<String> {
    let sql = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
        Value::Int32(i) => i.to_string(),
        Value::Int64(i) => i.to_string(),
        Value::Float64(f) if !f.is_finite() => {
            return Err(Error::InvalidFilter(format!("non-finite float {f}")));
        }
        Value::Float64(f) => format!("{f:?}"),
        Value::String(s) => quote_string(s),
        Value::Bytes(b) => {
            let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("X'{hex}'")
        }
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Time(t) => format!("'{}'", t.format(time_format(t.nanosecond()))),
        Value::DateTime(dt) => format!(
            "'{} {}'",
            dt.format("%Y-%m-%d"),
            dt.format(time_format(dt.nanosecond()))
        ),
    };
    Ok(sql)
}

/// Time-of-day format: whole seconds have no fraction, others carry 3, 6
/// or 9 fractional digits.
fn time_format(nanos: u32) -> &'static str {
    if nanos == 0 {
        "%H:%M:%S"
    } else {
        "%H:%M:%S%.f"
    }
}
