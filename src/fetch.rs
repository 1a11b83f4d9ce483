use log::{debug, info};
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};
use thiserror::Error;

const USER_AGENT: &str = concat!("smp-installer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    NetworkError { url: String, reason: String },
    #[error("response from {url} was cut short: {source}")]
    ReadError {
        url: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Downloads `url` once and writes the body to `destination` byte-for-byte.
pub fn fetch_and_store(url: &str, destination: &Path) -> Result<FetchReport, FetchError> {
    let body = fetch(url)?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| FetchError::WriteFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(destination, &body).map_err(|source| FetchError::WriteFailed {
        path: destination.to_path_buf(),
        source,
    })?;

    info!("stored {} bytes from {url} at {}", body.len(), destination.display());
    Ok(FetchReport {
        path: destination.to_path_buf(),
        bytes: body.len(),
    })
}

fn fetch(url: &str) -> Result<Vec<u8>, FetchError> {
    let agent = ureq::AgentBuilder::new().user_agent(USER_AGENT).build();
    let response = agent.get(url).call().map_err(|err| {
        let reason = match err {
            ureq::Error::Status(code, response) => {
                format!("server answered {code} {}", response.status_text())
            }
            ureq::Error::Transport(transport) => transport.to_string(),
        };
        FetchError::NetworkError {
            url: url.to_string(),
            reason,
        }
    })?;
    debug!("{url} answered {}", response.status());

    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|source| FetchError::ReadError {
            url: url.to_string(),
            source,
        })?;
    Ok(body)
}
