use crate::config;
use anyhow::{Context, Result};
use directories::{BaseDirs, UserDirs};
use std::{
    env,
    path::{Path, PathBuf},
};

pub const LAUNCHER_DIR_NAME: &str = ".minecraft";
pub const PROFILES_FILE_NAME: &str = "launcher_profiles.json";
pub const UNSAVED_PROFILES_FILE_NAME: &str = "launcher_profiles.unsaved.json";

/// Where the launcher keeps its data and where the installer stages files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherPaths {
    pub launcher_root: PathBuf,
    pub staging_root: PathBuf,
    pub desktop_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl LauncherPaths {
    pub fn detect(tool_name: &str, launcher_override: Option<&Path>) -> Result<Self> {
        let base = BaseDirs::new().context("resolve home dir")?;
        let launcher_root = match launcher_override {
            Some(path) => path.to_path_buf(),
            None => base.config_dir().join(LAUNCHER_DIR_NAME),
        };
        let desktop_dir = UserDirs::new()
            .and_then(|dirs| dirs.desktop_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| base.home_dir().join("Desktop"));

        Ok(Self {
            launcher_root,
            staging_root: staging_root_for(tool_name),
            desktop_dir,
            data_dir: config::base_data_dir()?,
        })
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.launcher_root.join("versions")
    }

    pub fn loader_descriptor(&self, loader_id: &str) -> PathBuf {
        self.versions_dir()
            .join(loader_id)
            .join(format!("{loader_id}.json"))
    }

    pub fn profiles_document(&self) -> PathBuf {
        self.launcher_root.join(PROFILES_FILE_NAME)
    }

    pub fn staged_content(&self, content_folder: &str) -> PathBuf {
        self.staging_root.join(content_folder)
    }

    pub fn installed_content(&self, content_folder: &str) -> PathBuf {
        self.launcher_root.join(content_folder)
    }

    /// Where a merged profile document goes when the launcher copy cannot be written.
    pub fn unsaved_profiles(&self) -> PathBuf {
        self.data_dir.join(UNSAVED_PROFILES_FILE_NAME)
    }
}

pub fn staging_root_for(tool_name: &str) -> PathBuf {
    env::temp_dir().join(format!("{tool_name}-installer-extracted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_launcher_conventions() {
        let paths = LauncherPaths {
            launcher_root: PathBuf::from("/cfg/.minecraft"),
            staging_root: PathBuf::from("/tmp/thesmp2-installer-extracted"),
            desktop_dir: PathBuf::from("/home/p/Desktop"),
            data_dir: PathBuf::from("/home/p/.local/share/smp-installer"),
        };

        assert_eq!(
            paths.unsaved_profiles(),
            PathBuf::from("/home/p/.local/share/smp-installer/launcher_profiles.unsaved.json")
        );
        assert_eq!(
            paths.loader_descriptor("fabric-loader-0.16.14-1.21.1"),
            PathBuf::from(
                "/cfg/.minecraft/versions/fabric-loader-0.16.14-1.21.1/fabric-loader-0.16.14-1.21.1.json"
            )
        );
        assert_eq!(
            paths.profiles_document(),
            PathBuf::from("/cfg/.minecraft/launcher_profiles.json")
        );
        assert_eq!(
            paths.staged_content("The_SMP_Instance"),
            PathBuf::from("/tmp/thesmp2-installer-extracted/The_SMP_Instance")
        );
        assert_eq!(
            paths.installed_content("The_SMP_Instance"),
            PathBuf::from("/cfg/.minecraft/The_SMP_Instance")
        );
    }

    #[test]
    fn staging_root_lives_in_temp() {
        let root = staging_root_for("thesmp2");
        assert!(root.starts_with(env::temp_dir()));
        assert!(root.ends_with("thesmp2-installer-extracted"));
    }
}
