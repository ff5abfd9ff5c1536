use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

/// Closed set of column types a record field may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum FieldType {
    /// Required 64-bit signed integer.
    Int64,
    /// Required UTF-8 string.
    Utf8,
    /// Nullable 64-bit signed integer.
    OptionalInt64,
    /// Nullable UTF-8 string.
    OptionalUtf8,
}

impl FieldType {
    #[inline]
    pub fn nullable(self) -> bool {
        matches!(self, FieldType::OptionalInt64 | FieldType::OptionalUtf8)
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        matches!(self, FieldType::Int64 | FieldType::OptionalInt64)
    }

    /// Column type used when the field is materialized in DuckDB.
    pub fn sql_type(self) -> &'static str {
        if self.is_integer() { "BIGINT" } else { "VARCHAR" }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldDef {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no fields")]
    Empty,
    #[error("identifier field '{0}' is not declared")]
    MissingIdField(&'static str),
    #[error("identifier field '{0}' must be a required Int64, found {1}")]
    BadIdType(&'static str, FieldType),
    #[error("field '{0}' is declared more than once")]
    DuplicateField(&'static str),
}

/// Static description of a record type: ordered fields plus the name of the
/// unique identifier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordSchema {
    pub fields: &'static [FieldDef],
    pub id_field: &'static str,
}

impl RecordSchema {
    pub const fn new(fields: &'static [FieldDef], id_field: &'static str) -> Self {
        Self { fields, id_field }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn id_index(&self) -> Option<usize> {
        self.index_of(self.id_field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Checks that the declaration is usable as an archive schema.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (i, f) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|g| g.name == f.name) {
                return Err(SchemaError::DuplicateField(f.name));
            }
        }
        let idx = self
            .id_index()
            .ok_or(SchemaError::MissingIdField(self.id_field))?;
        match self.fields[idx].ty {
            FieldType::Int64 => Ok(()),
            other => Err(SchemaError::BadIdType(self.id_field, other)),
        }
    }
}
