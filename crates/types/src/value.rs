use crate::schema::{FieldType, RecordSchema};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single cell as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int64(i64),
    Utf8(String),
}

/// One record as an ordered tuple of cells, in schema order.
pub type Row = Vec<Value>;

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// True when this cell may be stored in a column of type `ty`.
    pub fn conforms(&self, ty: FieldType) -> bool {
        match (self, ty) {
            (Value::Null, t) => t.nullable(),
            (Value::Int64(_), t) => t.is_integer(),
            (Value::Utf8(_), t) => !t.is_integer(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Utf8(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {found} cells, schema declares {expected}")]
    Arity { expected: usize, found: usize },
    #[error("cell '{field}' does not fit column type {ty}: {value:?}")]
    Type {
        field: &'static str,
        ty: FieldType,
        value: Value,
    },
}

/// Checks arity and per-cell types of `row` against `schema`.
pub fn check_row(schema: &RecordSchema, row: &[Value]) -> Result<(), RowError> {
    if row.len() != schema.len() {
        return Err(RowError::Arity {
            expected: schema.len(),
            found: row.len(),
        });
    }
    for (field, value) in schema.fields.iter().zip(row) {
        if !value.conforms(field.ty) {
            return Err(RowError::Type {
                field: field.name,
                ty: field.ty,
                value: value.clone(),
            });
        }
    }
    Ok(())
}
