use crate::error::{ArchiveError, Result};
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const RETRY_EVERY: Duration = Duration::from_millis(50);

/// Exclusive per-store write lock: an OS advisory lock on `.write.lock`.
///
/// Held across the read-modify-rename of a partition file so two writers on
/// the same store serialize instead of losing each other's rows. The kernel
/// drops the lock with the file handle, so a crashed holder never wedges the
/// store. The lock file itself stays on disk between holders.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    file: File,
}

impl StoreLock {
    /// Try once; `StoreLocked` if another holder exists.
    pub fn try_acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(ArchiveError::StoreLocked {
                    path: path.to_path_buf(),
                });
            }
            Err(TryLockError::Error(e)) => return Err(e.into()),
        }
        // Owner pid is informational only.
        if let Err(e) = record_owner(&mut file) {
            tracing::warn!(lock=%path.display(), error=%e, "failed to record lock owner");
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Poll until acquired or `wait` has elapsed.
    pub fn acquire(path: &Path, wait: Duration) -> Result<Self> {
        let deadline = Instant::now() + wait;
        let mut warned = false;
        loop {
            match Self::try_acquire(path) {
                Err(ArchiveError::StoreLocked { .. }) if Instant::now() < deadline => {
                    if !warned {
                        tracing::warn!(lock=%path.display(), "store is locked, waiting");
                        warned = true;
                    }
                    thread::sleep(RETRY_EVERY);
                }
                other => return other,
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn record_owner(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(lock=%self.path.display(), error=%e, "failed to release store lock");
        }
    }
}
