use std::path::PathBuf;

use thiserror::Error;

use crate::version::error::RegistryError;

/// Failure of the external download mechanism
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_description(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

/// Errors that abort the whole run
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Failed to fetch popularity page {page}: {source}")]
    PageFetch {
        page: u32,
        #[source]
        source: RegistryError,
    },

    #[error("Failed to write page snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download {package} {version} to {path:?}: {source}")]
    Download {
        package: String,
        version: String,
        path: PathBuf,
        #[source]
        source: DownloadError,
    },

    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HarvestError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
