use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::version::registries::packagist::{DEFAULT_REPO_URL, DEFAULT_WEB_URL};
use crate::version::resolver::DEFAULT_BRANCH_PRIORITY;

// =============================================================================
// Registry-related constants
// =============================================================================

/// Page size of the popularity listing
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Timeout for fetch operations in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// Download-related constants
// =============================================================================

/// External program used to fetch archives
pub const DEFAULT_DOWNLOADER_PROGRAM: &str = "wget";

/// Arguments passed to the downloader; `{url}` and `{output}` are substituted
pub const DEFAULT_DOWNLOADER_ARGS: &[&str] = &["{url}", "-O", "{output}"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Harvest configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HarvestConfig {
    pub registry: RegistryConfig,
    pub downloader: DownloaderConfig,
    /// Archive root; defaults to `<data dir>/zipballs`
    pub archive_dir: Option<PathBuf>,
    /// Root of per-run release snapshots; snapshots are disabled when unset
    pub release_dir: Option<PathBuf>,
    /// Default branches tried when a package has no tagged release, highest priority first
    pub branch_priority: Vec<String>,
    /// Additional JSON log file
    pub log_file: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            downloader: DownloaderConfig::default(),
            archive_dir: None,
            release_dir: None,
            branch_priority: DEFAULT_BRANCH_PRIORITY
                .iter()
                .map(|branch| branch.to_string())
                .collect(),
            log_file: None,
        }
    }
}

impl HarvestConfig {
    /// Reads a JSON config file; missing fields use defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured archive root, or `<data dir>/zipballs`
    pub fn archive_dir(&self) -> PathBuf {
        self.archive_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("zipballs"))
    }
}

/// Registry endpoints
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    /// Base URL of the popularity listing
    pub web_url: String,
    /// Base URL of the Composer v2 metadata
    pub repo_url: String,
    pub per_page: u32,
    /// Timeout for each registry request in milliseconds
    pub fetch_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            web_url: DEFAULT_WEB_URL.to_string(),
            repo_url: DEFAULT_REPO_URL.to_string(),
            per_page: DEFAULT_PER_PAGE,
            fetch_timeout_ms: FETCH_TIMEOUT_MS,
        }
    }
}

/// External download command
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloaderConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_DOWNLOADER_PROGRAM.to_string(),
            args: DEFAULT_DOWNLOADER_ARGS
                .iter()
                .map(|arg| arg.to_string())
                .collect(),
        }
    }
}

/// Returns the path to the data directory for packagist-harvest.
/// Uses $XDG_DATA_HOME/packagist-harvest if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/packagist-harvest,
/// or ./packagist-harvest if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("packagist-harvest")
}
