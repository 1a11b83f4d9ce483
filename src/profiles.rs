use log::{debug, info};
use serde_json::{json, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub const PROFILE_TYPE_CUSTOM: &str = "custom";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot read launcher profiles at {}: {source}", path.display())]
    DocumentUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("launcher profiles at {} are not a JSON object: {reason}", path.display())]
    DocumentMalformed { path: PathBuf, reason: String },
    #[error("launcher profiles at {} have no \"profiles\" object", path.display())]
    MissingProfilesSection { path: PathBuf },
    #[error("failed to save launcher profiles to {}: {source}", path.display())]
    DocumentWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
        document: String,
    },
}

impl MergeError {
    /// The merged document that could not be written, if the merge got that far.
    pub fn unsaved_document(&self) -> Option<&str> {
        match self {
            MergeError::DocumentWriteFailed { document, .. } => Some(document),
            _ => None,
        }
    }
}

/// One launch configuration in `launcher_profiles.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub name: String,
    pub kind: String,
    pub created: String,
    pub last_used: String,
    pub last_version_id: String,
    pub game_dir: PathBuf,
    pub icon: String,
    pub java_args: String,
    pub memory_max: u32,
}

impl ProfileRecord {
    /// A custom profile stamped with the current time.
    pub fn custom(name: &str, last_version_id: &str, game_dir: &Path) -> Self {
        let now = timestamp_now();
        Self {
            name: name.to_string(),
            kind: PROFILE_TYPE_CUSTOM.to_string(),
            created: now.clone(),
            last_used: now,
            last_version_id: last_version_id.to_string(),
            game_dir: game_dir.to_path_buf(),
            icon: String::new(),
            java_args: String::new(),
            memory_max: 0,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "created": self.created,
            "lastUsed": self.last_used,
            "name": self.name,
            "type": self.kind,
            "lastVersionId": self.last_version_id,
            "gameDir": self.game_dir.to_string_lossy(),
            "icon": self.icon,
            "javaArgs": self.java_args,
            "memoryMax": self.memory_max,
        })
    }
}

/// Inserts `record` under `profiles[profile_id]` in the document at `path`.
///
/// Every other key is carried through untouched. Nothing is written unless the
/// document parsed and had a `profiles` object.
pub fn merge_profile(
    path: &Path,
    profile_id: &str,
    record: &ProfileRecord,
    select_new_profile: bool,
) -> Result<(), MergeError> {
    let raw = fs::read(path).map_err(|source| MergeError::DocumentUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document: Value =
        serde_json::from_slice(&raw).map_err(|err| MergeError::DocumentMalformed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

    let Some(root) = document.as_object_mut() else {
        return Err(MergeError::DocumentMalformed {
            path: path.to_path_buf(),
            reason: "top level is not an object".to_string(),
        });
    };
    let Some(profiles) = root.get_mut("profiles").and_then(Value::as_object_mut) else {
        return Err(MergeError::MissingProfilesSection {
            path: path.to_path_buf(),
        });
    };

    let replaced = profiles
        .insert(profile_id.to_string(), record.to_value())
        .is_some();
    debug!("profile {profile_id} replaced existing entry: {replaced}");
    if select_new_profile {
        root.insert(
            "selectedProfile".to_string(),
            Value::String(profile_id.to_string()),
        );
    }

    let rendered = render(&document);
    write_document(path, &rendered).map_err(move |(failed_path, source)| {
        MergeError::DocumentWriteFailed {
            path: failed_path,
            source,
            document: rendered,
        }
    })?;
    info!("wrote profile {profile_id} to {}", path.display());
    Ok(())
}

fn render(document: &Value) -> String {
    // Value serialization cannot fail: every map key is already a string.
    serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string())
}

/// Writes through a sibling temp file. The error names the file that failed.
fn write_document(path: &Path, raw: &str) -> Result<(), (PathBuf, io::Error)> {
    let temp = path.with_extension("json.tmp");
    if let Err(err) = fs::write(&temp, raw) {
        return Err((temp, err));
    }
    if let Err(err) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err((temp, err));
    }
    Ok(())
}

fn timestamp_now() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
