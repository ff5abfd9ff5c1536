use crate::duck::{
    connect_memory, count_rows, describe, distinct_ids, duplicate_id_count, select_rows,
};
use crate::error::Result;
use crate::layout::{DateRange, Partition, PartitionSelection, resolve_partitions};
use crate::paths::store_dir;
use duckdb::Connection;
use ra_types::{ArchiveRecord, Row};
use std::path::{Path, PathBuf};

/// Ordered column name -> DuckDB type mapping of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSchema {
    pub columns: Vec<(String, String)>,
}

impl StoreSchema {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }
}

/// Read-only view over a store, optionally restricted to a date range.
///
/// The partition list is resolved once at construction; every query runs
/// against that list. A store with no matching partitions answers every query
/// with an empty result.
pub struct ArchiveReader {
    store_dir: PathBuf,
    selection: PartitionSelection,
    partitions: Vec<Partition>,
    files: Vec<PathBuf>,
    limit: Option<usize>,
    conn: Connection,
}

impl ArchiveReader {
    pub fn open(base_dir: &Path, store_name: &str, dates: Option<DateRange>) -> Result<Self> {
        Self::open_dir(&store_dir(base_dir, store_name), dates)
    }

    pub fn open_dir(store_dir: &Path, dates: Option<DateRange>) -> Result<Self> {
        let selection = PartitionSelection::from(dates);
        let partitions = resolve_partitions(store_dir, selection)?;
        let files: Vec<PathBuf> = partitions
            .iter()
            .flat_map(|p| p.files.iter().cloned())
            .collect();
        Ok(Self {
            store_dir: store_dir.to_path_buf(),
            selection,
            partitions,
            files,
            limit: None,
            conn: connect_memory()?,
        })
    }

    /// Cap the number of rows returned by [`ArchiveReader::rows`].
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn selection(&self) -> PartitionSelection {
        self.selection
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn schema(&self) -> Result<StoreSchema> {
        if self.is_empty() {
            return Ok(StoreSchema::default());
        }
        Ok(StoreSchema {
            columns: describe(&self.conn, &self.files)?,
        })
    }

    /// Union of all rows across the resolved files, in scan order.
    pub fn rows(&self) -> Result<Vec<Row>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        select_rows(&self.conn, &self.files, self.limit)
    }

    /// [`ArchiveReader::rows`] decoded as `R`.
    pub fn records<R: ArchiveRecord>(&self) -> Result<Vec<R>> {
        self.rows()?
            .iter()
            .map(|row| R::from_row(row).map_err(Into::into))
            .collect()
    }

    pub fn row_count(&self) -> Result<i64> {
        Ok(self.counts()?.0)
    }

    pub fn distinct_row_count(&self) -> Result<i64> {
        Ok(self.counts()?.1)
    }

    /// (total rows, distinct rows).
    pub fn counts(&self) -> Result<(i64, i64)> {
        if self.is_empty() {
            return Ok((0, 0));
        }
        count_rows(&self.conn, &self.files)
    }

    /// Up to `limit` distinct identifiers from `id_col`, largest first,
    /// optionally only those strictly below `below`.
    pub fn recent_ids(&self, id_col: &str, limit: usize, below: Option<i64>) -> Result<Vec<i64>> {
        if self.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        distinct_ids(&self.conn, &self.files, id_col, limit, below)
    }

    /// Number of rows sharing an identifier with an earlier row.
    pub fn duplicate_id_count(&self, id_col: &str) -> Result<i64> {
        if self.is_empty() {
            return Ok(0);
        }
        duplicate_id_count(&self.conn, &self.files, id_col)
    }
}
