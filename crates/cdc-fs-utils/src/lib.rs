//! Atomic file operations: write-temp-then-rename, and move-with-fallback.
//!
//! Used by the Offset Store's file backend for durable persistence and by
//! the Transfer Policy to move segments between directories.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};
use tempfile::NamedTempFile;

/// Atomically replace the contents of `path` with `content`.
///
/// Writes to a temporary file in `path`'s parent directory, `fsync`s it, then
/// renames it over `path`. A crash at any point leaves either the old or the
/// new content in place, never a partial write.
pub fn atomic_write(path: &Path, content: impl AsRef<[u8]>) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })?;
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    io::Write::write_all(&mut tmp, content.as_ref())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Move `file` into `target_dir`, keeping its filename.
///
/// Prefers an atomic rename (works when `target_dir` is on the same device
/// as `file`); falls back to copy-then-delete when the rename fails because
/// the directories live on different devices ([`io::ErrorKind::CrossesDevices`]
/// on recent std, `EXDEV` on older ones surfaces as a generic [`io::Error`]).
///
/// Returns the destination path.
pub fn move_file(file: &Path, target_dir: &Path) -> io::Result<std::path::PathBuf> {
    fs::create_dir_all(target_dir)?;
    let file_name = file.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no file name", file.display()))
    })?;
    let dest = target_dir.join(file_name);

    match fs::rename(file, &dest) {
        Ok(()) => {
            debug!("moved {} -> {} (rename)", file.display(), dest.display());
            Ok(dest)
        }
        Err(e) if is_cross_device(&e) => {
            warn!(
                "cross-device move of {} -> {}, falling back to copy+delete",
                file.display(),
                dest.display()
            );
            fs::copy(file, &dest)?;
            fs::remove_file(file)?;
            Ok(dest)
        }
        Err(e) => Err(e),
    }
}

fn is_cross_device(e: &io::Error) -> bool {
    // `ErrorKind::CrossesDevices` is only stable on very recent toolchains;
    // match on the raw OS error (EXDEV = 18 on Linux) so this also builds on
    // the workspace's pinned MSRV.
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(libc_exdev())
    }
    #[cfg(not(unix))]
    {
        let _ = e;
        false
    }
}

#[cfg(unix)]
fn libc_exdev() -> i32 {
    18
}
