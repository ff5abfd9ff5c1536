use crate::error::{ArchiveError, Result};
use crate::ids::DEFAULT_ID_WINDOW;
use crate::parquet::DEFAULT_ZSTD_LEVEL;
use crate::paths::store_dir;
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const APP_DIR: &str = ".record-archive";
pub const DEFAULT_STORE: &str = "records";
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Where a store lives and how its writer behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveConfig {
    pub base_dir: PathBuf,
    pub store_name: String,
    /// How many distinct identifiers are read back to seed de-duplication.
    pub id_window: usize,
    /// Cap on identifiers tracked while a writer is open; `None` = unbounded.
    pub max_tracked_ids: Option<usize>,
    pub zstd_level: i32,
    pub lock_wait: Duration,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            store_name: DEFAULT_STORE.to_string(),
            id_window: DEFAULT_ID_WINDOW,
            max_tracked_ids: None,
            zstd_level: DEFAULT_ZSTD_LEVEL,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }
}

/// `$HOME/.record-archive/data`, or `./.record-archive/data` without a home.
pub fn default_base_dir() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    home.join(APP_DIR).join("data")
}

/// Best-effort: load environment variables from .env.
fn load_env_best_effort() {
    let _ = dotenvy::dotenv();
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ArchiveError::Config(format!("{key}='{raw}' is not valid"))),
        Err(_) => Ok(None),
    }
}

impl ArchiveConfig {
    pub fn new(base_dir: impl Into<PathBuf>, store_name: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            store_name: store_name.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `ARCHIVE_*` environment variables (after
    /// loading `.env` if present).
    pub fn from_env() -> Result<Self> {
        load_env_best_effort();
        let mut cfg = Self::default();
        if let Some(dir) = env_parse::<PathBuf>("ARCHIVE_DATA_DIR")? {
            cfg.base_dir = dir;
        }
        if let Some(name) = env_parse::<String>("ARCHIVE_STORE")? {
            cfg.store_name = name;
        }
        if let Some(n) = env_parse::<usize>("ARCHIVE_ID_WINDOW")? {
            cfg.id_window = n;
        }
        if let Some(n) = env_parse::<usize>("ARCHIVE_MAX_TRACKED_IDS")? {
            cfg.max_tracked_ids = Some(n);
        }
        if let Some(level) = env_parse::<i32>("ARCHIVE_ZSTD_LEVEL")? {
            cfg.zstd_level = level;
        }
        if let Some(ms) = env_parse::<u64>("ARCHIVE_LOCK_WAIT_MS")? {
            cfg.lock_wait = Duration::from_millis(ms);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_id_window(mut self, n: usize) -> Self {
        self.id_window = n;
        self
    }

    pub fn with_max_tracked_ids(mut self, n: Option<usize>) -> Self {
        self.max_tracked_ids = n;
        self
    }

    pub fn with_zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_name.is_empty() {
            return Err(ArchiveError::Config("store name is empty".into()));
        }
        if self.store_name.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(ArchiveError::Config(format!(
                "store name '{}' has an empty or relative segment",
                self.store_name
            )));
        }
        if let Some(cap) = self.max_tracked_ids {
            if cap < self.id_window {
                return Err(ArchiveError::Config(format!(
                    "max tracked ids {cap} is smaller than the seed window {}",
                    self.id_window
                )));
            }
        }
        if !(1..=22).contains(&self.zstd_level) {
            return Err(ArchiveError::Config(format!(
                "zstd level {} outside 1..=22",
                self.zstd_level
            )));
        }
        Ok(())
    }

    pub fn store_dir(&self) -> PathBuf {
        store_dir(&self.base_dir, &self.store_name)
    }
}
