use crate::error::Result;
use arrow::array::{ArrayRef, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use ra_types::value::check_row;
use ra_types::{FieldType, RecordSchema, Row, Value};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub const DEFAULT_ZSTD_LEVEL: i32 = 9;

pub fn zstd_props(level: i32) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(
            ZstdLevel::try_new(level).unwrap_or_default(),
        ))
        .set_dictionary_enabled(true)
        .set_data_page_size_limit(128 * 1024)
        .build()
}

fn arrow_type(ty: FieldType) -> DataType {
    if ty.is_integer() {
        DataType::Int64
    } else {
        DataType::Utf8
    }
}

/// Arrow schema for a record declaration.
pub fn arrow_schema(schema: &RecordSchema) -> SchemaRef {
    Arc::new(Schema::new(
        schema
            .fields
            .iter()
            .map(|f| Field::new(f.name, arrow_type(f.ty), f.ty.nullable()))
            .collect::<Vec<_>>(),
    ))
}

enum ColumnBuilder {
    Int(Int64Builder),
    Str(StringBuilder),
}

impl ColumnBuilder {
    fn for_type(ty: FieldType, capacity: usize) -> Self {
        if ty.is_integer() {
            ColumnBuilder::Int(Int64Builder::with_capacity(capacity))
        } else {
            ColumnBuilder::Str(StringBuilder::with_capacity(capacity, capacity * 32))
        }
    }

    // Cells were checked against the schema before we get here.
    fn append(&mut self, v: &Value) {
        match (self, v) {
            (ColumnBuilder::Int(b), Value::Int64(x)) => b.append_value(*x),
            (ColumnBuilder::Str(b), Value::Utf8(s)) => b.append_value(s),
            (ColumnBuilder::Int(b), _) => b.append_null(),
            (ColumnBuilder::Str(b), _) => b.append_null(),
        }
    }

    fn finish(self) -> ArrayRef {
        match self {
            ColumnBuilder::Int(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Str(mut b) => Arc::new(b.finish()),
        }
    }
}

/// Build one batch from rows laid out in schema order.
pub fn rows_to_batch(schema: &RecordSchema, rows: &[Row]) -> Result<RecordBatch> {
    let mut cols: Vec<ColumnBuilder> = schema
        .fields
        .iter()
        .map(|f| ColumnBuilder::for_type(f.ty, rows.len()))
        .collect();
    for row in rows {
        check_row(schema, row)?;
        for (col, v) in cols.iter_mut().zip(row) {
            col.append(v);
        }
    }
    Ok(RecordBatch::try_new(
        arrow_schema(schema),
        cols.into_iter().map(ColumnBuilder::finish).collect(),
    )?)
}

/// Loads a whole parquet file into memory.
pub fn read_batches(path: &Path) -> Result<(SchemaRef, Vec<RecordBatch>)> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok((schema, batches))
}

/// Row count from the footer, without decoding any pages.
pub fn parquet_row_count(path: &Path) -> Result<i64> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    Ok(reader.metadata().file_metadata().num_rows())
}

/// Compares column names, types and nullability; metadata is ignored.
pub fn same_columns(a: &Schema, b: &Schema) -> bool {
    a.fields().len() == b.fields().len()
        && a.fields().iter().zip(b.fields().iter()).all(|(x, y)| {
            x.name() == y.name() && x.data_type() == y.data_type() && x.is_nullable() == y.is_nullable()
        })
}

pub fn describe_columns(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| {
            let null = if f.is_nullable() { "?" } else { "" };
            format!("{}:{}{}", f.name(), f.data_type(), null)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int64Array, StringArray};
    use ra_types::{ArchiveRecord, StatusRecord};

    fn status(id: i64) -> StatusRecord {
        StatusRecord {
            id,
            created_at: format!("2024-01-01T00:00:{:02}Z", id % 60),
            account: "bob".into(),
            url: None,
            content: Some(format!("post {id}")),
            replies_count: None,
            reblogs_count: Some(id),
        }
    }

    #[test]
    fn batch_carries_nulls_and_values() {
        let rows: Vec<Row> = (1..=3).map(|i| status(i).to_row()).collect();
        let batch = rows_to_batch(&StatusRecord::SCHEMA, &rows).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), StatusRecord::SCHEMA.len());

        let ids = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(ids.value(2), 3);
        let urls = batch.column(3).as_any().downcast_ref::<StringArray>().unwrap();
        assert!(urls.is_null(0));
        assert!(!batch.schema().field(0).is_nullable());
        assert!(batch.schema().field(3).is_nullable());
    }

    #[test]
    fn mistyped_row_is_rejected() {
        let mut row = status(1).to_row();
        row[0] = Value::Null;
        assert!(rows_to_batch(&StatusRecord::SCHEMA, &[row]).is_err());
    }

    #[test]
    fn column_comparison_ignores_nothing_but_metadata() {
        let a = arrow_schema(&StatusRecord::SCHEMA);
        let b = arrow_schema(&StatusRecord::SCHEMA);
        assert!(same_columns(&a, &b));
        let c = Schema::new(vec![Field::new("id", DataType::Int64, false)]);
        assert!(!same_columns(&a, &c));
        assert!(describe_columns(&c).contains("id:Int64"));
    }
}
