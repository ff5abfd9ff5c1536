use crate::schema::{FieldDef, FieldType, RecordSchema};
use crate::value::{Row, RowError, Value, check_row};
use serde::{Deserialize, Serialize};

/// A record type that can be archived.
///
/// The schema is declared once as a constant; it drives both the in-memory
/// staging table and the on-disk column types. `to_row` must produce cells in
/// `SCHEMA.fields` order.
pub trait ArchiveRecord: Sized {
    const SCHEMA: RecordSchema;

    /// Unique identifier used for de-duplication.
    fn id(&self) -> i64;

    fn to_row(&self) -> Row;

    fn from_row(row: &[Value]) -> Result<Self, RowError>;
}

/// A status fetched from a social timeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: i64,
    pub created_at: String, // RFC3339 as delivered by the source
    pub account: String,
    pub url: Option<String>,
    pub content: Option<String>,
    pub replies_count: Option<i64>,
    pub reblogs_count: Option<i64>,
}

const STATUS_FIELDS: &[FieldDef] = &[
    FieldDef::new("id", FieldType::Int64),
    FieldDef::new("created_at", FieldType::Utf8),
    FieldDef::new("account", FieldType::Utf8),
    FieldDef::new("url", FieldType::OptionalUtf8),
    FieldDef::new("content", FieldType::OptionalUtf8),
    FieldDef::new("replies_count", FieldType::OptionalInt64),
    FieldDef::new("reblogs_count", FieldType::OptionalInt64),
];

impl ArchiveRecord for StatusRecord {
    const SCHEMA: RecordSchema = RecordSchema::new(STATUS_FIELDS, "id");

    fn id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> Row {
        vec![
            Value::Int64(self.id),
            Value::from(self.created_at.as_str()),
            Value::from(self.account.as_str()),
            Value::from(self.url.clone()),
            Value::from(self.content.clone()),
            Value::from(self.replies_count),
            Value::from(self.reblogs_count),
        ]
    }

    fn from_row(row: &[Value]) -> Result<Self, RowError> {
        check_row(&Self::SCHEMA, row)?;
        let text = |v: &Value| v.as_str().map(str::to_string);
        Ok(Self {
            id: row[0].as_i64().unwrap_or_default(),
            created_at: text(&row[1]).unwrap_or_default(),
            account: text(&row[2]).unwrap_or_default(),
            url: text(&row[3]),
            content: text(&row[4]),
            replies_count: row[5].as_i64(),
            reblogs_count: row[6].as_i64(),
        })
    }
}
