//! Record archive storage crate
//!
//! This crate archives a stream of uniquely identified records into a
//! day-partitioned Parquet store:
//! - One file per day per store, rewritten crash-safely (temp file + atomic rename) on every flush.
//! - A writer that stages records in an in-memory DuckDB table and filters out identifiers it has already seen.
//! - A reader that resolves partitions by date and scans them in place with DuckDB.
//!
//! Layout overview (see `paths`):
//! base/store.parquet/date=YYYYMMDD/file-0.parquet
//!
//! Key modules:
//! - `paths`: Authoritative path building and partition key parsing.
//! - `layout`: Partition discovery, optionally restricted to a date range.
//! - `replace`: Atomic merge-and-replace of a partition file.
//! - `writer`: De-duplicating writer for today's partition.
//! - `reader`: Schema and row queries over a store.
//! - `duck`: DuckDB staging table and parquet scan helpers.
//! - `parquet`: Arrow batch building and parquet file helpers.
//!
//! Start with `ArchiveConfig::from_env()` (or `ArchiveConfig::new`), open an
//! `ArchiveWriter`, `insert` batches, then `close` it exactly once.

pub mod config;
pub mod duck;
pub mod error;
pub mod ids;
pub mod layout;
pub mod lock;
pub mod parquet;
pub mod paths;
pub mod reader;
pub mod replace;
pub mod writer;

pub use config::ArchiveConfig;
pub use error::{ArchiveError, Result};
pub use layout::{DateRange, Partition, PartitionSelection};
pub use reader::{ArchiveReader, StoreSchema};
pub use writer::{ArchiveWriter, WriterState, WriterStats};
