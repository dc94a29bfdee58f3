//! Idempotent archive storage
//!
//! Archives live at `<archive_dir>/<vendor>/<project>--<version>.zip`. The existence of
//! that file is the only state consulted between runs:
//! - tagged archives are immutable and never fetched twice
//! - `dev-*` archives are always stale and are deleted and fetched again
//!
//! The existence check is only safe for a single operator on a single machine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::archive::downloader::ArchiveDownloader;
use crate::enumerator::RankWindow;
use crate::error::HarvestError;
use crate::version::types::{DEV_PREFIX, PackageName};

/// What happened to one package's archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The archive was not on disk and has been downloaded
    Downloaded(PathBuf),
    /// A stale development archive was replaced
    Refreshed(PathBuf),
    /// A tagged archive was already on disk
    AlreadyPresent(PathBuf),
}

impl ArchiveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            ArchiveOutcome::Downloaded(path)
            | ArchiveOutcome::Refreshed(path)
            | ArchiveOutcome::AlreadyPresent(path) => path,
        }
    }
}

/// Archive location relative to the archive root
pub fn archive_relative_path(package_name: &PackageName, version: &str) -> PathBuf {
    let version = version.replace(['/', '\\'], "-");
    PathBuf::from(package_name.vendor())
        .join(format!("{}--{}.zip", package_name.project(), version))
}

/// Per-run copy of exactly the archives of one rank window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSnapshot {
    dir: PathBuf,
}

impl ReleaseSnapshot {
    /// Snapshot directory `<release_root>/<YYYYMMDD>-top<min>-<max>`
    pub fn new(release_root: &Path, run_date: NaiveDate, window: RankWindow) -> Self {
        Self {
            dir: release_root.join(format!(
                "{}-top{}-{}",
                run_date.format("%Y%m%d"),
                window.min,
                window.max
            )),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn copy_in(&self, archive: &Path, relative: &Path) -> Result<PathBuf, HarvestError> {
        let target = self.dir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(HarvestError::io(parent))?;
        }

        tokio::fs::copy(archive, &target)
            .await
            .map_err(HarvestError::io(&target))?;

        debug!("Copied {:?} into release snapshot", target);
        Ok(target)
    }
}

/// Stores package archives under a fixed root directory
pub struct Archiver {
    archive_dir: PathBuf,
    downloader: Arc<dyn ArchiveDownloader>,
    release: Option<ReleaseSnapshot>,
}

impl Archiver {
    pub fn new(archive_dir: PathBuf, downloader: Arc<dyn ArchiveDownloader>) -> Self {
        Self {
            archive_dir,
            downloader,
            release: None,
        }
    }

    /// Also copy every archive of this run into a release snapshot
    pub fn with_release_snapshot(mut self, release: ReleaseSnapshot) -> Self {
        self.release = Some(release);
        self
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Deterministic archive path for a package version
    pub fn archive_path(&self, package_name: &PackageName, version: &str) -> PathBuf {
        self.archive_dir
            .join(archive_relative_path(package_name, version))
    }

    /// Make sure the archive of `package_name` at `version` exists locally
    ///
    /// Invokes the downloader at most once. A downloader failure is fatal.
    pub async fn archive(
        &self,
        package_name: &PackageName,
        version: &str,
        url: &str,
    ) -> Result<ArchiveOutcome, HarvestError> {
        let relative = archive_relative_path(package_name, version);
        let path = self.archive_dir.join(&relative);

        let mut stale = false;
        if version.starts_with(DEV_PREFIX) && exists(&path).await? {
            info!("Removing stale development archive {:?}", path);
            tokio::fs::remove_file(&path)
                .await
                .map_err(HarvestError::io(&path))?;
            stale = true;
        }

        let outcome = if exists(&path).await? {
            info!("Already present: {} {}", package_name, version);
            ArchiveOutcome::AlreadyPresent(path)
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(HarvestError::io(parent))?;
            }

            info!("Downloading {} {}...", package_name, version);
            if let Err(source) = self.downloader.download(url, &path).await {
                remove_partial(&path).await;
                return Err(HarvestError::Download {
                    package: package_name.to_string(),
                    version: version.to_string(),
                    path,
                    source,
                });
            }

            if stale {
                ArchiveOutcome::Refreshed(path)
            } else {
                ArchiveOutcome::Downloaded(path)
            }
        };

        if let Some(release) = &self.release {
            release.copy_in(outcome.path(), &relative).await?;
        }

        Ok(outcome)
    }
}

/// A failed download may leave a truncated file that would later pass as present
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial archive {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial archive {:?}: {}", path, e),
    }
}

async fn exists(path: &Path) -> Result<bool, HarvestError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(HarvestError::io(path))
}
