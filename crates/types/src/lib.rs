//! Shared record and schema types for the record archive.
//!
//! Records are declared statically: every archived type carries a fixed
//! field-to-type table (`RecordSchema`) drawn from a closed set of column
//! types. Readers hand rows back as dynamic `Value`s so callers can inspect a
//! store without knowing its record type.

pub mod keys;
pub mod record;
pub mod schema;
pub mod value;

pub use keys::store_name_from_url;
pub use record::{ArchiveRecord, StatusRecord};
pub use schema::{FieldDef, FieldType, RecordSchema, SchemaError};
pub use value::{Row, RowError, Value};
