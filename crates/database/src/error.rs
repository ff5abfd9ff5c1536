use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parquet: {0}")]
    Pq(#[from] parquet::errors::ParquetError),
    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
    #[error("duckdb: {0}")]
    Duck(#[from] duckdb::Error),
    #[error("row: {0}")]
    Row(#[from] ra_types::RowError),
    #[error("schema: {0}")]
    Schema(#[from] ra_types::SchemaError),

    /// Existing partition file and incoming payload disagree on columns.
    #[error("schema mismatch at {path}: existing [{existing}] vs incoming [{incoming}]")]
    SchemaMismatch {
        path: PathBuf,
        existing: String,
        incoming: String,
    },
    /// Post-write re-read did not agree with what was written.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("writer is closed")]
    WriterClosed,
    #[error("store is locked by another writer: {path}")]
    StoreLocked { path: PathBuf },
    #[error("config: {0}")]
    Config(String),
}
