use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const APP_DIR_NAME: &str = "smp-installer";

/// What gets installed and how the launcher profile looks.
///
/// Every field falls back to the bundled pack's value when missing from a
/// config file, so an override only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub tool_name: String,
    pub profile_id: String,
    pub profile_name: String,
    pub loader_name: String,
    pub loader_version: String,
    pub game_version: String,
    pub meta_base_url: String,
    pub content_folder: String,
    pub java_args: String,
    pub memory_max: u32,
    pub select_profile: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            tool_name: "thesmp2".to_string(),
            profile_id: "thesmp2".to_string(),
            profile_name: "THE SMP 2".to_string(),
            loader_name: "fabric-loader".to_string(),
            loader_version: "0.16.14".to_string(),
            game_version: "1.21.1".to_string(),
            meta_base_url: "https://meta.fabricmc.net".to_string(),
            content_folder: "The_SMP_Instance".to_string(),
            java_args: "-Xmx4G -XX:+UnlockExperimentalVMOptions -XX:+UseG1GC -XX:G1NewSizePercent=20 -XX:G1ReservePercent=20 -XX:MaxGCPauseMillis=50 -XX:G1HeapRegionSize=32M".to_string(),
            memory_max: 4096,
            select_profile: true,
        }
    }
}

impl InstallerConfig {
    /// Reads `explicit` if given, else `config.json` in the app data dir if it
    /// exists, else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        let path = base_data_dir()?.join("config.json");
        if path.exists() {
            return Self::read(&path);
        }
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read installer config {}", path.display()))?;
        let config: InstallerConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parse installer config {}", path.display()))?;
        Ok(config)
    }

    /// Version directory name, e.g. `fabric-loader-0.16.14-1.21.1`.
    pub fn loader_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.loader_name, self.loader_version, self.game_version
        )
    }

    pub fn loader_profile_url(&self) -> String {
        format!(
            "{}/v2/versions/loader/{}/{}/profile/json",
            self.meta_base_url.trim_end_matches('/'),
            self.game_version,
            self.loader_version
        )
    }
}

pub fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join(APP_DIR_NAME))
}

pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = base_data_dir()?;
    fs::create_dir_all(&dir).context("create app data dir")?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_describe_the_bundled_pack() {
        let config = InstallerConfig::default();
        assert_eq!(config.loader_id(), "fabric-loader-0.16.14-1.21.1");
        assert_eq!(
            config.loader_profile_url(),
            "https://meta.fabricmc.net/v2/versions/loader/1.21.1/0.16.14/profile/json"
        );
        assert!(config.select_profile);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"loader_version":"0.17.0","meta_base_url":"http://localhost:9000/","memory_max":6144}"#,
        )
        .unwrap();

        let config = InstallerConfig::load(Some(&path)).unwrap();

        assert_eq!(config.memory_max, 6144);
        assert_eq!(config.profile_id, "thesmp2");
        assert_eq!(config.loader_id(), "fabric-loader-0.17.0-1.21.1");
        assert_eq!(
            config.loader_profile_url(),
            "http://localhost:9000/v2/versions/loader/1.21.1/0.17.0/profile/json"
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(InstallerConfig::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ memory_max: }").unwrap();
        let err = InstallerConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parse installer config"));
    }
}
