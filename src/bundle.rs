use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::{borrow::Cow, fs, path::Path};

pub static BUNDLED_ARCHIVE: &[u8] = include_bytes!("../assets/bundled.zip");
static PROFILE_ICON: &[u8] = include_bytes!("../assets/icon.png");

/// The archive to install: the one compiled in, or `override_path` when set.
pub fn load_archive(override_path: Option<&Path>) -> Result<Cow<'static, [u8]>> {
    match override_path {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("read archive {}", path.display()))?;
            Ok(Cow::Owned(bytes))
        }
        None => Ok(Cow::Borrowed(BUNDLED_ARCHIVE)),
    }
}

pub fn icon_data_uri() -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(PROFILE_ICON))
}
