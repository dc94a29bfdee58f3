//! Downloader test utilities

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use packagist_harvest::archive::ArchiveDownloader;
use packagist_harvest::error::DownloadError;

/// Downloader that writes the URL into the destination and records every call
#[derive(Default)]
pub struct RecordingDownloader {
    calls: Mutex<Vec<(String, PathBuf)>>,
    fail_on: Option<String>,
}

impl RecordingDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a non-zero exit whenever `url` is requested
    pub fn failing_on(url: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(url.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls().into_iter().map(|(url, _)| url).collect()
    }
}

#[async_trait]
impl ArchiveDownloader for RecordingDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<(), DownloadError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), destination.to_path_buf()));

        if self.fail_on.as_deref() == Some(url) {
            // wget -O creates the output file before failing
            std::fs::write(destination, "").unwrap();
            return Err(DownloadError::Failed {
                program: "wget".to_string(),
                code: Some(4),
                stderr: "Network failure.".to_string(),
            });
        }

        std::fs::write(destination, url).unwrap();
        Ok(())
    }
}
