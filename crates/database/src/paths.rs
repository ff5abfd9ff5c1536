//! Authoritative on-disk layout.
//!
//! `<base>/<store>.parquet/date=YYYYMMDD/file-0.parquet`
//!
//! One data file per day; the partition directory name is Hive-style so the
//! date key can also be recovered by query engines that understand it.
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub const STORE_EXT: &str = "parquet";
pub const PARTITION_PREFIX: &str = "date=";
pub const DATE_KEY_FMT: &str = "%Y%m%d";
pub const DATA_FILE_NAME: &str = "file-0.parquet";
pub const LOCK_FILE_NAME: &str = ".write.lock";

pub fn store_dir(base: &Path, store_name: &str) -> PathBuf {
    base.join(format!("{store_name}.{STORE_EXT}"))
}

/// `YYYYMMDD` for `date`.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FMT).to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    if key.len() != 8 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(key, DATE_KEY_FMT).ok()
}

/// Directory name of a partition, e.g. `date=20240101`.
pub fn partition_key(date: NaiveDate) -> String {
    format!("{PARTITION_PREFIX}{}", date_key(date))
}

/// Inverse of [`partition_key`]; anything else yields `None`.
pub fn parse_partition_key(name: &str) -> Option<NaiveDate> {
    name.strip_prefix(PARTITION_PREFIX).and_then(parse_date_key)
}

pub fn partition_dir(store_dir: &Path, date: NaiveDate) -> PathBuf {
    store_dir.join(partition_key(date))
}

pub fn partition_file(store_dir: &Path, date: NaiveDate) -> PathBuf {
    partition_dir(store_dir, date).join(DATA_FILE_NAME)
}

pub fn lock_path(store_dir: &Path) -> PathBuf {
    store_dir.join(LOCK_FILE_NAME)
}

/// Data files are visible `*.parquet` entries; dot-files are temp or lock files.
pub fn is_data_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && name.ends_with(&format!(".{STORE_EXT}"))
}
