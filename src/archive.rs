use filetime::{set_file_mtime, FileTime};
use log::debug;
use std::{
    fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
};
use thiserror::Error;
use time::{Date, Month, PrimitiveDateTime, Time as TimeOfDay};

#[derive(Debug, Error)]
pub enum StageError {
    #[error("archive could not be opened: {0}")]
    CorruptArchive(#[source] zip::result::ZipError),
    #[error("archive entry '{entry}' points outside the extraction directory")]
    UnsafePath { entry: String },
    #[error("refusing to stage into {}: {reason}", path.display())]
    UntrustedStagingRoot { path: PathBuf, reason: String },
    #[error("failed to extract '{entry}': {source}")]
    ExtractionFailed {
        entry: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
}

/// Unpacks `archive` into `target`, recreating every directory and file entry.
///
/// Existing files are overwritten, so staging the same archive twice is fine.
/// The first failing entry aborts the run; entries already written stay on disk.
pub fn stage(archive: &[u8], target: &Path) -> Result<StageReport, StageError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).map_err(StageError::CorruptArchive)?;
    fs::create_dir_all(target).map_err(|source| StageError::ExtractionFailed {
        entry: target.display().to_string(),
        source,
    })?;

    let mut report = StageReport::default();
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| StageError::ExtractionFailed {
                entry: format!("#{index}"),
                source: io::Error::new(io::ErrorKind::InvalidData, err),
            })?;
        let name = entry.name().to_string();
        let Some(relative) = entry.enclosed_name() else {
            return Err(StageError::UnsafePath { entry: name });
        };
        let out_path = target.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|source| StageError::ExtractionFailed {
                entry: name.clone(),
                source,
            })?;
            report.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StageError::ExtractionFailed {
                entry: name.clone(),
                source,
            })?;
        }

        let expected = entry.size();
        let copied = fs::File::create(&out_path)
            .and_then(|mut out_file| io::copy(&mut entry, &mut out_file))
            .map_err(|source| StageError::ExtractionFailed {
                entry: name.clone(),
                source,
            })?;
        if copied != expected {
            return Err(StageError::ExtractionFailed {
                entry: name,
                source: io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("wrote {copied} of {expected} bytes"),
                ),
            });
        }

        if let Some(mtime) = entry.last_modified().and_then(zip_time_to_unix) {
            let _ = set_file_mtime(&out_path, FileTime::from_unix_time(mtime, 0));
        }

        debug!("staged {name} ({copied} bytes)");
        report.files += 1;
        report.bytes += copied;
    }

    Ok(report)
}

/// Makes sure `root` is a directory that only the current user can write into,
/// creating it when missing.
///
/// The staging root lives under the shared temp dir with a fixed name, so a
/// symlink, a non-directory, a group/world-writable directory or one owned by
/// someone else is refused before anything is staged.
pub fn claim_staging_root(root: &Path) -> Result<(), StageError> {
    let io_failure = |source: io::Error| StageError::ExtractionFailed {
        entry: root.display().to_string(),
        source,
    };
    match fs::symlink_metadata(root) {
        Ok(meta) if meta.file_type().is_symlink() => {
            return Err(untrusted(root, "it is a symlink"));
        }
        Ok(meta) if !meta.is_dir() => return Err(untrusted(root, "it is not a directory")),
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            create_private_dir(root).map_err(io_failure)?;
            return Ok(());
        }
        Err(err) => return Err(io_failure(err)),
    }
    check_ownership(root)
}

fn untrusted(root: &Path, reason: &str) -> StageError {
    StageError::UntrustedStagingRoot {
        path: root.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(unix)]
fn create_private_dir(root: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if let Some(parent) = root.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::DirBuilder::new().mode(0o700).create(root)
}

#[cfg(not(unix))]
fn create_private_dir(root: &Path) -> io::Result<()> {
    fs::create_dir_all(root)
}

#[cfg(unix)]
fn check_ownership(root: &Path) -> Result<(), StageError> {
    use std::os::unix::fs::MetadataExt;

    let io_failure = |source: io::Error| StageError::ExtractionFailed {
        entry: root.display().to_string(),
        source,
    };
    let meta = fs::symlink_metadata(root).map_err(io_failure)?;
    if meta.mode() & 0o022 != 0 {
        return Err(untrusted(root, "it is writable by other users"));
    }

    // A file we create is owned by us; compare it with the directory owner.
    let marker = root.join(".owner-check");
    let _ = fs::remove_file(&marker);
    let owner = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&marker)
        .and_then(|file| file.metadata())
        .map(|marker_meta| marker_meta.uid())
        .map_err(io_failure)?;
    let _ = fs::remove_file(&marker);
    if owner != meta.uid() {
        return Err(untrusted(root, "it belongs to another user"));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_ownership(_root: &Path) -> Result<(), StageError> {
    Ok(())
}

fn zip_time_to_unix(dt: zip::DateTime) -> Option<i64> {
    let month = Month::try_from(dt.month()).ok()?;
    let date = Date::from_calendar_date(dt.year() as i32, month, dt.day()).ok()?;
    let time = TimeOfDay::from_hms(dt.hour(), dt.minute(), dt.second()).ok()?;
    let datetime = PrimitiveDateTime::new(date, time).assume_utc();
    Some(datetime.unix_timestamp())
}
