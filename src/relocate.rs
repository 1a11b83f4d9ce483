use filetime::{set_file_mtime, FileTime};
use log::{info, warn};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocateOutcome {
    Moved { destination: PathBuf },
    AlreadyInstalled { destination: PathBuf },
}

#[derive(Debug, Error)]
pub enum RelocateError {
    #[error("failed to move {} into {}: {source}", source_dir.display(), destination_parent.display())]
    RelocateFailed {
        source_dir: PathBuf,
        destination_parent: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Moves `source_dir` to `destination_parent/<name of source_dir>`.
///
/// An existing entry at the destination is left alone and reported as
/// [`RelocateOutcome::AlreadyInstalled`].
pub fn relocate(
    source_dir: &Path,
    destination_parent: &Path,
) -> Result<RelocateOutcome, RelocateError> {
    let failed = |source: io::Error| RelocateError::RelocateFailed {
        source_dir: source_dir.to_path_buf(),
        destination_parent: destination_parent.to_path_buf(),
        source,
    };

    let name = source_dir.file_name().ok_or_else(|| {
        failed(io::Error::new(
            io::ErrorKind::InvalidInput,
            "source has no directory name",
        ))
    })?;
    let destination = destination_parent.join(name);

    if fs::symlink_metadata(&destination).is_ok() {
        info!("{} already present, leaving it", destination.display());
        return Ok(RelocateOutcome::AlreadyInstalled { destination });
    }

    if !source_dir.is_dir() {
        return Err(failed(io::Error::new(
            io::ErrorKind::NotFound,
            "staged directory is missing",
        )));
    }
    fs::create_dir_all(destination_parent).map_err(failed)?;

    match fs::rename(source_dir, &destination) {
        Ok(()) => {}
        Err(err) if is_cross_device(&err) => {
            warn!(
                "{} is on another device, copying instead of renaming",
                destination.display()
            );
            copy_then_remove(source_dir, &destination).map_err(failed)?;
        }
        Err(err) => return Err(failed(err)),
    }

    info!("moved {} to {}", source_dir.display(), destination.display());
    Ok(RelocateOutcome::Moved { destination })
}

fn copy_then_remove(source: &Path, dest: &Path) -> io::Result<()> {
    if let Err(err) = copy_tree(source, dest) {
        // A half-copied tree would later pass for an existing install.
        let _ = fs::remove_dir_all(dest);
        return Err(err);
    }
    fs::remove_dir_all(source)
}

fn copy_tree(source: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            preserve_mtime(entry.path(), &target);
        }
    }
    Ok(())
}

fn preserve_mtime(source: &Path, dest: &Path) {
    let Ok(meta) = fs::metadata(source) else {
        return;
    };
    let _ = set_file_mtime(dest, FileTime::from_last_modification_time(&meta));
}

#[cfg(unix)]
fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV
    err.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(err: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_err: &io::Error) -> bool {
    false
}
