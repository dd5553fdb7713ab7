//! The Transfer Policy: what happens to a segment file once
//! the Reader is done with it.

use std::path::{Path, PathBuf};

use cdc_paths::{ArchiveDir, CdcDir, ErrorDir};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to move segment file")]
    Io(#[from] std::io::Error),
}

/// Two outcomes per segment, implemented by anything that
/// knows what to do with a fully-read or failed segment file. A variant
/// policy may delete on success instead of archiving; both
/// share this trait.
pub trait TransferPolicy: Send + Sync {
    fn on_success_transfer(&self, path: &Path) -> Result<(), Error>;
    fn on_error_transfer(&self, path: &Path) -> Result<(), Error>;
}

/// Moves successfully-read segments to `archives/` and failed ones to
/// `errors/`.
pub struct ArchiveTransferPolicy {
    archive_dir: ArchiveDir,
    error_dir: ErrorDir,
}

impl ArchiveTransferPolicy {
    pub fn new(archive_dir: ArchiveDir, error_dir: ErrorDir) -> Self {
        Self { archive_dir, error_dir }
    }
}

impl TransferPolicy for ArchiveTransferPolicy {
    fn on_success_transfer(&self, path: &Path) -> Result<(), Error> {
        cdc_fs_utils::move_file(path, &self.archive_dir)?;
        tracing::info!(path = %path.display(), dest = %self.archive_dir, "segment archived");
        Ok(())
    }

    fn on_error_transfer(&self, path: &Path) -> Result<(), Error> {
        cdc_fs_utils::move_file(path, &self.error_dir)?;
        tracing::warn!(path = %path.display(), dest = %self.error_dir, "segment moved to error folder");
        Ok(())
    }
}

/// A variant policy that deletes successfully-read segments instead of
/// archiving them, still moving failures to `errors/`.
pub struct DeleteOnSuccessTransferPolicy {
    error_dir: ErrorDir,
}

impl DeleteOnSuccessTransferPolicy {
    pub fn new(error_dir: ErrorDir) -> Self {
        Self { error_dir }
    }
}

impl TransferPolicy for DeleteOnSuccessTransferPolicy {
    fn on_success_transfer(&self, path: &Path) -> Result<(), Error> {
        std::fs::remove_file(path)?;
        tracing::info!(path = %path.display(), "segment deleted after successful read");
        Ok(())
    }

    fn on_error_transfer(&self, path: &Path) -> Result<(), Error> {
        cdc_fs_utils::move_file(path, &self.error_dir)?;
        tracing::warn!(path = %path.display(), dest = %self.error_dir, "segment moved to error folder");
        Ok(())
    }
}

/// Moves every file currently in the error folder back into `cdc_dir`,
/// enabling reprocessing on the next Detector pass.
/// Called at the top of the Detector loop when
/// `errorCommitLogReprocessEnabled` is set.
pub fn recycle_error_commit_log_files(error_dir: &ErrorDir, cdc_dir: &CdcDir) -> Result<Vec<PathBuf>, Error> {
    let mut recycled = Vec::new();
    let entries = match std::fs::read_dir(&error_dir.0) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(recycled),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let dest = cdc_fs_utils::move_file(&entry.path(), cdc_dir)?;
        tracing::info!(path = %dest.display(), "recycled error segment back into CDC directory");
        recycled.push(dest);
    }
    Ok(recycled)
}
