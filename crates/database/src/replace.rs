//! Crash-safe replacement of a partition file.
//!
//! The existing payload (if any) and the new batches are written together into
//! a hidden sibling temp file, fsync'd, then renamed over the target. Readers
//! see either the complete old file or the complete new one. Nothing touches
//! the target until the rename, so any failure before it leaves the old file
//! byte-identical.
use crate::error::{ArchiveError, Result};
use crate::parquet::{describe_columns, parquet_row_count, read_batches, same_columns, zstd_props};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Rows carried over from the file being replaced.
    pub previous_rows: usize,
    pub appended_rows: usize,
    pub total_rows: usize,
}

/// A fully written, not yet promoted replacement.
///
/// Dropping it without [`StagedReplace::commit`] deletes the temp file and
/// leaves the target as it was.
#[derive(Debug)]
pub struct StagedReplace {
    target: PathBuf,
    tmp: NamedTempFile,
    outcome: ReplaceOutcome,
}

impl StagedReplace {
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    pub fn outcome(&self) -> ReplaceOutcome {
        self.outcome
    }

    /// Re-read the staged file's footer and check it holds exactly the
    /// previous plus appended rows. Run before [`StagedReplace::commit`].
    pub fn verify(&self) -> Result<()> {
        let staged = parquet_row_count(self.tmp.path())?;
        if staged != self.outcome.total_rows as i64 {
            return Err(ArchiveError::Validation(format!(
                "staged replacement for {} holds {staged} rows, expected {} ({} previous + {} new)",
                self.target.display(),
                self.outcome.total_rows,
                self.outcome.previous_rows,
                self.outcome.appended_rows
            )));
        }
        Ok(())
    }

    /// Atomically promote the temp file onto the target.
    ///
    /// Once the rename has happened the new file is in place even if the
    /// directory sync that follows reports an error.
    pub fn commit(self) -> Result<ReplaceOutcome> {
        let StagedReplace {
            target,
            tmp,
            outcome,
        } = self;
        tmp.persist(&target).map_err(|e| ArchiveError::Io(e.error))?;
        if let Some(dir) = target.parent() {
            sync_dir(dir)?;
        }
        tracing::debug!(target=%target.display(), rows=outcome.total_rows, "partition file replaced");
        Ok(outcome)
    }
}

/// Steps 1-4: read the existing payload, write old+new into a hidden temp
/// file in the target's directory, and flush it to disk.
pub fn stage_replace(
    path: &Path,
    schema: SchemaRef,
    new_batches: &[RecordBatch],
    zstd_level: i32,
) -> Result<StagedReplace> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ArchiveError::Config(format!("not a file path: {}", path.display())))?;

    let mut existing = Vec::new();
    if path.exists() {
        let (existing_schema, batches) = read_batches(path)?;
        if !same_columns(&existing_schema, &schema) {
            return Err(ArchiveError::SchemaMismatch {
                path: path.to_path_buf(),
                existing: describe_columns(&existing_schema),
                incoming: describe_columns(&schema),
            });
        }
        existing = batches;
    }
    for b in new_batches {
        if !same_columns(&b.schema(), &schema) {
            return Err(ArchiveError::SchemaMismatch {
                path: path.to_path_buf(),
                existing: describe_columns(&schema),
                incoming: describe_columns(&b.schema()),
            });
        }
    }

    let previous_rows: usize = existing.iter().map(RecordBatch::num_rows).sum();
    let appended_rows: usize = new_batches.iter().map(RecordBatch::num_rows).sum();

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .tempfile_in(dir)?;
    tracing::debug!(tmp=%tmp.path().display(), previous_rows, appended_rows, "staging partition file");
    {
        let mut writer =
            ArrowWriter::try_new(tmp.as_file_mut(), schema.clone(), Some(zstd_props(zstd_level)))?;
        for b in existing.iter().chain(new_batches) {
            // Re-home every batch onto the target schema so field metadata
            // from the old file cannot trip the writer.
            let b = RecordBatch::try_new(schema.clone(), b.columns().to_vec())?;
            writer.write(&b)?;
        }
        writer.close()?;
    }
    tmp.as_file().sync_all()?;

    Ok(StagedReplace {
        target: path.to_path_buf(),
        tmp,
        outcome: ReplaceOutcome {
            previous_rows,
            appended_rows,
            total_rows: previous_rows + appended_rows,
        },
    })
}

/// Merge `new_batches` into the file at `path`, creating it if absent.
pub fn replace_file(
    path: &Path,
    schema: SchemaRef,
    new_batches: &[RecordBatch],
    zstd_level: i32,
) -> Result<ReplaceOutcome> {
    stage_replace(path, schema, new_batches, zstd_level)?.commit()
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
