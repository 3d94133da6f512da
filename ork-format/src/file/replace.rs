use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::TempPath;

use crate::error::SaveError;

/// `<name>-bak`, next to `path`.
pub(crate) fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push("-bak");
    path.with_file_name(name)
}

/// Moves a finished temp file over `dest`.
///
/// An existing `dest` is first renamed to its backup path. If the final
/// rename fails the temp file is removed and the backup moved back, so
/// `dest` keeps its old content. `rename` is `std::fs::rename` outside tests.
pub(crate) fn replace_file_with<F>(temp: TempPath, dest: &Path, mut rename: F) -> Result<(), SaveError>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    let backup = if dest.exists() {
        let backup = backup_path(dest);
        tracing::debug!(from = %dest.display(), to = %backup.display(), "moving existing file aside");
        rename(dest, &backup).map_err(|e| SaveError::Backup(e, dest.to_path_buf()))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = rename(&*temp, dest) {
        tracing::warn!(path = %dest.display(), error = %e, "replacing destination failed, restoring");
        drop(temp);
        if let Some(backup) = &backup {
            if let Err(restore) = rename(backup, dest) {
                tracing::error!(
                    backup = %backup.display(),
                    error = %restore,
                    "could not restore original file from backup"
                );
            }
        }
        return Err(SaveError::Replace(e, dest.to_path_buf()));
    }

    // The temp path now names nothing; keep it from trying to delete `dest`.
    if let Err(e) = temp.keep() {
        tracing::trace!(error = %e, "temp path already released");
    }

    if let Err(e) = touch(dest) {
        tracing::warn!(path = %dest.display(), error = %e, "could not update modification time");
    }

    if let Some(backup) = backup {
        if let Err(e) = std::fs::remove_file(&backup) {
            tracing::warn!(path = %backup.display(), error = %e, "could not remove backup");
        }
    }

    Ok(())
}

fn touch(path: &Path) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}
