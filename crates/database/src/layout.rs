//! Partition discovery.
//!
//! A store is resolved by listing its directory at call time: every
//! `date=YYYYMMDD` subdirectory is a partition and every visible `*.parquet`
//! inside it is a data file. A missing store root resolves to nothing.
use crate::error::{ArchiveError, Result};
use crate::paths::{is_data_file, parse_date_key, parse_partition_key};
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Inclusive calendar range of partition dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Build from two `YYYYMMDD` keys.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |k: &str| {
            parse_date_key(k)
                .ok_or_else(|| ArchiveError::Config(format!("invalid date key '{k}', want YYYYMMDD")))
        };
        Ok(Self::new(parse(start)?, parse(end)?))
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Which mode produced a partition list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionSelection {
    /// Every partition of the store.
    All,
    /// Only partitions inside the range; may legitimately be empty.
    Range(DateRange),
}

impl From<Option<DateRange>> for PartitionSelection {
    fn from(range: Option<DateRange>) -> Self {
        range.map_or(PartitionSelection::All, PartitionSelection::Range)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub date: NaiveDate,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Resolves the partitions of `store_dir`, ordered by date.
pub fn resolve_partitions(store_dir: &Path, selection: PartitionSelection) -> Result<Vec<Partition>> {
    let entries = match fs::read_dir(store_dir) {
        Ok(it) => it,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut out = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(date) = entry.file_name().to_str().and_then(parse_partition_key) else {
            continue;
        };
        if let PartitionSelection::Range(r) = selection {
            if !r.contains(date) {
                continue;
            }
        }
        let dir = entry.path();
        let files = list_data_files(&dir)?;
        if files.is_empty() {
            continue;
        }
        out.push(Partition { date, dir, files });
    }
    out.sort_by_key(|p| p.date);
    Ok(out)
}

/// Flattened, date-ordered data file list for a selection.
pub fn resolve_files(store_dir: &Path, selection: PartitionSelection) -> Result<Vec<PathBuf>> {
    Ok(resolve_partitions(store_dir, selection)?
        .into_iter()
        .flat_map(|p| p.files)
        .collect())
}

fn list_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_data_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
