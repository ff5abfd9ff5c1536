//! Archive writer: today's partition, de-duplicated.
//!
//! A writer stages accepted records in an in-memory DuckDB table and only
//! touches disk in [`ArchiveWriter::close`], which merges the staged rows
//! into the partition file through the atomic replacer and re-reads the whole
//! store as an integrity check.
use crate::config::ArchiveConfig;
use crate::duck::{connect_memory, create_staging_table, export_rows, insert_rows, table_row_count};
use crate::error::{ArchiveError, Result};
use crate::ids::RecentIds;
use crate::lock::StoreLock;
use crate::parquet::{arrow_schema, rows_to_batch};
use crate::paths::{lock_path, partition_file};
use crate::reader::ArchiveReader;
use crate::replace::stage_replace;
use chrono::{Local, NaiveDate};
use duckdb::Connection;
use ra_types::value::check_row;
use ra_types::{ArchiveRecord, Row};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const STAGING_TABLE: &str = "items";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Open,
    Closed,
}

/// Summary reported by a successful close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    /// Records accepted during this session.
    pub accepted: usize,
    /// Records filtered out as duplicates during this session.
    pub rejected: usize,
    /// Rows across the whole store after the flush (diagnostic).
    pub total_rows: i64,
    pub distinct_rows: i64,
    pub partition_date: NaiveDate,
    pub partition_file: PathBuf,
}

pub struct ArchiveWriter<R: ArchiveRecord> {
    config: ArchiveConfig,
    store_dir: PathBuf,
    date: NaiveDate,
    partition_file: PathBuf,
    conn: Option<Connection>,
    recent: RecentIds,
    accepted: usize,
    rejected: usize,
    state: WriterState,
    _record: PhantomData<R>,
}

impl<R: ArchiveRecord> ArchiveWriter<R> {
    /// Open a writer on today's partition (local calendar date).
    pub fn open(config: ArchiveConfig) -> Result<Self> {
        Self::open_for_date(config, Local::now().date_naive())
    }

    /// Open a writer pinned to the partition of `date`.
    pub fn open_for_date(config: ArchiveConfig, date: NaiveDate) -> Result<Self> {
        config.validate()?;
        R::SCHEMA.validate()?;

        let store_dir = config.store_dir();
        let partition_file = partition_file(&store_dir, date);

        let conn = connect_memory()?;
        create_staging_table(&conn, STAGING_TABLE, &R::SCHEMA)?;

        let recent = seed_recent_ids(
            &store_dir,
            R::SCHEMA.id_field,
            config.id_window,
            config.max_tracked_ids,
        )?;
        info!(
            store=%store_dir.display(),
            partition=%date,
            seeded=recent.len(),
            "archive writer open"
        );

        Ok(Self {
            config,
            store_dir,
            date,
            partition_file,
            conn: Some(conn),
            recent,
            accepted: 0,
            rejected: 0,
            state: WriterState::Open,
            _record: PhantomData,
        })
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn partition_date(&self) -> NaiveDate {
        self.date
    }

    pub fn partition_file(&self) -> &Path {
        &self.partition_file
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn recent_ids(&self) -> &RecentIds {
        &self.recent
    }

    /// Rows staged in memory and not yet flushed.
    pub fn pending_rows(&self) -> Result<i64> {
        let conn = self.conn.as_ref().ok_or(ArchiveError::WriterClosed)?;
        table_row_count(conn, STAGING_TABLE)
    }

    /// Stage every record whose identifier has not been seen; returns how
    /// many were accepted. Nothing is written to disk.
    pub fn insert(&mut self, batch: &[R]) -> Result<usize> {
        if self.state == WriterState::Closed {
            return Err(ArchiveError::WriterClosed);
        }
        let conn = self.conn.as_mut().ok_or(ArchiveError::WriterClosed)?;

        let mut batch_ids = HashSet::with_capacity(batch.len());
        let mut ids = Vec::new();
        let mut rows: Vec<Row> = Vec::new();
        for rec in batch {
            let id = rec.id();
            if self.recent.contains(id) || !batch_ids.insert(id) {
                continue;
            }
            let row = rec.to_row();
            check_row(&R::SCHEMA, &row)?;
            ids.push(id);
            rows.push(row);
        }

        insert_rows(conn, STAGING_TABLE, &R::SCHEMA, &rows)?;

        let n = rows.len();
        self.recent.extend(ids);
        self.accepted += n;
        self.rejected += batch.len() - n;
        debug!(submitted = batch.len(), accepted = n, "staged records");
        Ok(n)
    }

    /// Flush staged rows into the partition file and validate the store.
    ///
    /// The writer is closed afterwards whether or not this succeeds. Any
    /// failure up to and including the staged-file check leaves the on-disk
    /// store exactly as it was. After the rename the new rows are durable; a
    /// directory sync or store re-read failing past that point is still
    /// reported as an error.
    pub fn close(&mut self) -> Result<WriterStats> {
        if self.state == WriterState::Closed {
            return Err(ArchiveError::WriterClosed);
        }
        self.state = WriterState::Closed;
        let conn = self.conn.take().ok_or(ArchiveError::WriterClosed)?;
        let stats = self.flush(&conn);
        drop(conn);
        match &stats {
            Ok(s) => info!(
                accepted = s.accepted,
                rejected = s.rejected,
                total = s.total_rows,
                distinct = s.distinct_rows,
                file=%s.partition_file.display(),
                "archive writer closed"
            ),
            Err(e) => warn!(error=%e, "archive writer close failed"),
        }
        stats
    }

    fn flush(&self, conn: &Connection) -> Result<WriterStats> {
        let rows = export_rows(conn, STAGING_TABLE, &R::SCHEMA)?;

        let written = if rows.is_empty() {
            debug!("no staged rows, partition file left as is");
            None
        } else {
            let _lock = StoreLock::acquire(&lock_path(&self.store_dir), self.config.lock_wait)?;
            if let Some(dir) = self.partition_file.parent() {
                fs::create_dir_all(dir)?;
            }
            let batch = rows_to_batch(&R::SCHEMA, &rows)?;
            let staged = stage_replace(
                &self.partition_file,
                arrow_schema(&R::SCHEMA),
                &[batch],
                self.config.zstd_level,
            )?;
            // Dropping `staged` on error discards the temp file.
            staged.verify()?;
            Some(staged.commit()?)
        };

        let reader = ArchiveReader::open_dir(&self.store_dir, None)?;
        let (total_rows, distinct_rows) = reader.counts()?;
        if let Some(outcome) = written {
            if total_rows < outcome.total_rows as i64 {
                return Err(ArchiveError::Validation(format!(
                    "store re-read found {total_rows} rows, partition alone holds {}",
                    outcome.total_rows
                )));
            }
        }
        if distinct_rows < total_rows {
            warn!(
                total = total_rows,
                distinct = distinct_rows,
                "store holds duplicate rows"
            );
        }

        Ok(WriterStats {
            accepted: self.accepted,
            rejected: self.rejected,
            total_rows,
            distinct_rows,
            partition_date: self.date,
            partition_file: self.partition_file.clone(),
        })
    }
}

impl<R: ArchiveRecord> Drop for ArchiveWriter<R> {
    fn drop(&mut self) {
        if self.state == WriterState::Open && self.accepted > 0 {
            warn!(
                pending = self.accepted,
                file=%self.partition_file.display(),
                "archive writer dropped without close, staged rows discarded"
            );
        }
    }
}

/// Most recent identifiers across every partition of the store.
fn seed_recent_ids(
    store_dir: &Path,
    id_col: &str,
    window: usize,
    max_tracked: Option<usize>,
) -> Result<RecentIds> {
    let reader = ArchiveReader::open_dir(store_dir, None)?;
    if reader.is_empty() {
        return Ok(RecentIds::new(max_tracked));
    }
    let ids = reader.recent_ids(id_col, window, None)?;
    debug!(
        partitions = reader.partitions().len(),
        seeded = ids.len(),
        "seeded recent identifiers"
    );
    Ok(RecentIds::seeded(ids, max_tracked))
}
