//! External download mechanism
//!
//! Archives are fetched by an external command (`wget` by default). The command's
//! exit status is authoritative: anything but success is a [`DownloadError`].

use std::path::Path;
use std::process::Stdio;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::error::DownloadError;

/// Placeholder replaced by the distributable URL
pub const URL_PLACEHOLDER: &str = "{url}";

/// Placeholder replaced by the destination path
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Trait for fetching one archive to a local path
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ArchiveDownloader: Send + Sync {
    /// Downloads `url` into `destination`, creating or truncating the file
    async fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError>;
}

/// Downloader that runs an external program once per archive
#[derive(Debug, Clone)]
pub struct CommandDownloader {
    program: String,
    args: Vec<String>,
}

impl CommandDownloader {
    /// `args` may contain `{url}` and `{output}` placeholders
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn render_args(&self, url: &str, destination: &Path) -> Vec<String> {
        let output = destination.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(URL_PLACEHOLDER, url)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl ArchiveDownloader for CommandDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        let args = self.render_args(url, destination);
        debug!("Running {} {:?}", self.program, args);

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| DownloadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DownloadError::Failed {
            program: self.program.clone(),
            code: output.status.code(),
            stderr: stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or_default()
                .trim()
                .to_string(),
        })
    }
}
