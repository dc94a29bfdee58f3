//! Harvest pipeline: enumerate, resolve, archive
//!
//! Packages are processed strictly one at a time. Per-package problems (unknown
//! package, no usable version, missing dist) are logged and skipped; fetching a
//! listing page or running the downloader are the only failures that stop the run.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::archive::{ArchiveOutcome, Archiver};
use crate::enumerator::{PageSnapshotWriter, PopularPackages, RankWindow};
use crate::error::HarvestError;
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::resolver::LatestVersionResolver;
use crate::version::types::PackageName;

/// Why a package was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The listing returned a name that is not a valid package name
    InvalidName,
    /// Neither metadata file exists
    NotFound,
    /// The metadata lists no versions at all
    NoVersions,
    /// Fetching the metadata failed
    MetadataUnavailable(String),
    /// No tagged release and no usable default branch
    NoResolvableVersion,
    /// The resolved version has no distributable reference
    MissingDist { version: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidName => f.write_str("invalid package name"),
            SkipReason::NotFound => f.write_str("package not found"),
            SkipReason::NoVersions => f.write_str("no versions published"),
            SkipReason::MetadataUnavailable(e) => write!(f, "metadata unavailable: {}", e),
            SkipReason::NoResolvableVersion => {
                f.write_str("no tagged releases and no default branch found")
            }
            SkipReason::MissingDist { version } => write!(f, "missing dist for {}", version),
        }
    }
}

/// Result of processing one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    Archived(ArchiveOutcome),
    Skipped(SkipReason),
}

/// A skipped package and the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPackage {
    pub rank: u32,
    pub name: String,
    pub reason: SkipReason,
}

/// Summary of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub downloaded: Vec<PathBuf>,
    pub refreshed: Vec<PathBuf>,
    pub already_present: Vec<PathBuf>,
    pub skipped: Vec<SkippedPackage>,
}

impl HarvestReport {
    /// Number of packages the run looked at
    pub fn processed(&self) -> usize {
        self.downloaded.len() + self.refreshed.len() + self.already_present.len() + self.skipped.len()
    }

    fn record(&mut self, rank: u32, name: &str, outcome: PackageOutcome) {
        match outcome {
            PackageOutcome::Archived(ArchiveOutcome::Downloaded(path)) => {
                self.downloaded.push(path)
            }
            PackageOutcome::Archived(ArchiveOutcome::Refreshed(path)) => self.refreshed.push(path),
            PackageOutcome::Archived(ArchiveOutcome::AlreadyPresent(path)) => {
                self.already_present.push(path)
            }
            PackageOutcome::Skipped(reason) => self.skipped.push(SkippedPackage {
                rank,
                name: name.to_string(),
                reason,
            }),
        }
    }
}

/// Coordinates the registry, the version resolver and the archiver
pub struct Harvester {
    registry: Arc<dyn Registry>,
    resolver: Arc<dyn LatestVersionResolver>,
    archiver: Archiver,
    per_page: u32,
    run_date: NaiveDate,
}

impl Harvester {
    pub fn new(
        registry: Arc<dyn Registry>,
        resolver: Arc<dyn LatestVersionResolver>,
        archiver: Archiver,
        per_page: u32,
        run_date: NaiveDate,
    ) -> Self {
        Self {
            registry,
            resolver,
            archiver,
            per_page,
            run_date,
        }
    }

    /// Process every package in `window`, stopping at the first fatal error
    pub async fn run(&self, window: RankWindow) -> Result<HarvestReport, HarvestError> {
        info!(
            "Harvesting packages ranked {} to {} into {:?}",
            window.min,
            window.max,
            self.archiver.archive_dir()
        );

        let snapshots = PageSnapshotWriter::new(
            self.archiver.archive_dir().to_path_buf(),
            self.run_date,
            window.max,
        );
        let mut packages =
            PopularPackages::new(self.registry.as_ref(), window, self.per_page, snapshots);
        let mut report = HarvestReport::default();

        while let Some(package) = packages.next().await? {
            info!("[{}] {}", package.rank, package.name);
            let outcome = self.process_package(&package.name).await?;
            report.record(package.rank, &package.name, outcome);
        }

        info!(
            "Finished: {} downloaded, {} refreshed, {} already present, {} skipped",
            report.downloaded.len(),
            report.refreshed.len(),
            report.already_present.len(),
            report.skipped.len()
        );

        Ok(report)
    }

    /// Resolve and archive a single package
    ///
    /// Returns `Ok(PackageOutcome::Skipped)` for every per-package problem and
    /// `Err` only for failures that must stop the run.
    pub async fn process_package(&self, raw_name: &str) -> Result<PackageOutcome, HarvestError> {
        let package_name = match PackageName::parse(raw_name) {
            Ok(name) => name,
            Err(e) => return Ok(skip(raw_name, SkipReason::InvalidName, &e.to_string())),
        };

        let versions = match self.registry.fetch_all_versions(&package_name).await {
            Ok(versions) => versions,
            Err(RegistryError::NotFound(_)) => {
                return Ok(skip(raw_name, SkipReason::NotFound, "not on packagist"));
            }
            Err(e) => {
                let reason = SkipReason::MetadataUnavailable(e.to_string());
                return Ok(skip(raw_name, reason, "fetching metadata failed"));
            }
        };

        if versions.is_empty() {
            return Ok(skip(raw_name, SkipReason::NoVersions, "empty metadata"));
        }

        let Some(resolved) = self.resolver.resolve_latest(&versions) else {
            return Ok(skip(
                raw_name,
                SkipReason::NoResolvableVersion,
                &format!("{} versions considered", versions.len()),
            ));
        };

        let version = resolved.record.display_version();
        let Some(url) = resolved.record.dist_url() else {
            let reason = SkipReason::MissingDist {
                version: version.to_string(),
            };
            return Ok(skip(raw_name, reason, &format!("version key {}", resolved.key)));
        };

        let outcome = self.archiver.archive(&package_name, version, url).await?;
        Ok(PackageOutcome::Archived(outcome))
    }
}

fn skip(name: &str, reason: SkipReason, detail: &str) -> PackageOutcome {
    warn!("Skipping {}: {} ({})", name, reason, detail);
    PackageOutcome::Skipped(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::downloader::MockArchiveDownloader;
    use crate::error::DownloadError;
    use crate::version::registry::MockRegistry;
    use crate::version::resolver::ComposerLatestResolver;
    use crate::version::types::{Dist, PackageVersions, PopularEntry, PopularPage, VersionRecord};
    use mockall::predicate::{always, eq};
    use serde_json::json;
    use tempfile::TempDir;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn record(version: &str, normalized: &str, url: Option<&str>) -> VersionRecord {
        VersionRecord {
            version: version.to_string(),
            version_normalized: normalized.to_string(),
            dist: url.map(|url| Dist {
                url: Some(url.to_string()),
                kind: Some("zip".to_string()),
                shasum: None,
                reference: None,
            }),
        }
    }

    fn harvester(
        registry: MockRegistry,
        downloader: MockArchiveDownloader,
        archive_dir: PathBuf,
    ) -> Harvester {
        Harvester::new(
            Arc::new(registry),
            Arc::new(ComposerLatestResolver::default()),
            Archiver::new(archive_dir, Arc::new(downloader)),
            50,
            run_date(),
        )
    }

    fn listing(
        names: &'static [&'static str],
    ) -> impl FnMut(u32, u32) -> Result<PopularPage, RegistryError> + Send + 'static {
        move |page, _| {
            let packages = if page == 1 { names } else { &[] };
            Ok(PopularPage {
                packages: packages
                    .iter()
                    .map(|name| PopularEntry {
                        name: name.to_string(),
                        downloads: None,
                    })
                    .collect(),
                raw: json!({ "packages": packages }),
            })
        }
    }

    #[tokio::test]
    async fn process_package_downloads_highest_tag() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = MockRegistry::new();
        registry.expect_fetch_all_versions().returning(|_| {
            Ok(PackageVersions::from_list(vec![
                record("v1.0.0", "1.0.0.0", Some("https://dl.test/1.zip")),
                record("v2.0.0", "2.0.0.0", Some("https://dl.test/2.zip")),
                record("dev-main", "dev-main", Some("https://dl.test/main.zip")),
            ]))
        });
        let mut downloader = MockArchiveDownloader::new();
        downloader
            .expect_download()
            .with(eq("https://dl.test/2.zip"), always())
            .times(1)
            .returning(|_, _| Ok(()));
        let harvester = harvester(registry, downloader, temp_dir.path().to_path_buf());

        let outcome = harvester.process_package("Acme/Widget").await.unwrap();

        assert_eq!(
            outcome,
            PackageOutcome::Archived(ArchiveOutcome::Downloaded(
                temp_dir.path().join("acme/widget--v2.0.0.zip")
            ))
        );
    }

    #[tokio::test]
    async fn process_package_skips_missing_dist_without_download() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = MockRegistry::new();
        registry.expect_fetch_all_versions().returning(|_| {
            Ok(PackageVersions::from_list(vec![record("1.0.0", "1.0.0.0", None)]))
        });
        let mut downloader = MockArchiveDownloader::new();
        downloader.expect_download().times(0);
        let harvester = harvester(registry, downloader, temp_dir.path().to_path_buf());

        let outcome = harvester.process_package("acme/widget").await.unwrap();

        assert_eq!(
            outcome,
            PackageOutcome::Skipped(SkipReason::MissingDist {
                version: "1.0.0".to_string()
            })
        );
        assert!(!temp_dir.path().join("acme").exists());
    }

    #[tokio::test]
    async fn process_package_skips_unresolvable_package() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = MockRegistry::new();
        registry.expect_fetch_all_versions().returning(|_| {
            Ok(PackageVersions::from_list(vec![record(
                "dev-feature",
                "dev-feature",
                Some("https://dl.test/feature.zip"),
            )]))
        });
        let mut downloader = MockArchiveDownloader::new();
        downloader.expect_download().times(0);
        let harvester = harvester(registry, downloader, temp_dir.path().to_path_buf());

        let outcome = harvester.process_package("acme/widget").await.unwrap();

        assert_eq!(outcome, PackageOutcome::Skipped(SkipReason::NoResolvableVersion));
    }

    #[tokio::test]
    async fn process_package_skips_registry_failures() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_all_versions()
            .returning(|name| Err(RegistryError::NotFound(name.to_string())));
        let harvester = harvester(
            registry,
            MockArchiveDownloader::new(),
            temp_dir.path().to_path_buf(),
        );

        assert_eq!(
            harvester.process_package("acme/gone").await.unwrap(),
            PackageOutcome::Skipped(SkipReason::NotFound)
        );
        assert_eq!(
            harvester.process_package("not a package").await.unwrap(),
            PackageOutcome::Skipped(SkipReason::InvalidName)
        );
    }

    #[tokio::test]
    async fn process_package_skips_package_without_versions() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_all_versions()
            .returning(|_| Ok(PackageVersions::default()));
        let harvester = harvester(
            registry,
            MockArchiveDownloader::new(),
            temp_dir.path().to_path_buf(),
        );

        assert_eq!(
            harvester.process_package("acme/empty").await.unwrap(),
            PackageOutcome::Skipped(SkipReason::NoVersions)
        );
    }

    #[tokio::test]
    async fn run_stops_after_download_failure() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_popular_page()
            .returning(listing(&["acme/first", "acme/second", "acme/third"]));
        registry
            .expect_fetch_all_versions()
            .times(2)
            .returning(|_| {
                Ok(PackageVersions::from_list(vec![record(
                    "1.0.0",
                    "1.0.0.0",
                    Some("https://dl.test/1.zip"),
                )]))
            });
        let mut downloader = MockArchiveDownloader::new();
        let mut calls = 0;
        downloader.expect_download().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(DownloadError::Failed {
                    program: "wget".to_string(),
                    code: Some(4),
                    stderr: "Network failure".to_string(),
                })
            }
        });
        let harvester = harvester(registry, downloader, temp_dir.path().to_path_buf());

        let result = harvester.run(RankWindow::new(0, 3)).await;

        match result {
            Err(HarvestError::Download { package, .. }) => assert_eq!(package, "acme/second"),
            other => panic!("expected download failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_reports_each_outcome() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("acme/cached--1.0.0.zip");
        std::fs::create_dir_all(present.parent().unwrap()).unwrap();
        std::fs::write(&present, "zip").unwrap();

        let mut registry = MockRegistry::new();
        registry
            .expect_fetch_popular_page()
            .returning(listing(&["acme/cached", "acme/nodist", "acme/fresh"]));
        registry.expect_fetch_all_versions().returning(|name| {
            let records = match name.as_str() {
                "acme/cached" => vec![record("1.0.0", "1.0.0.0", Some("https://dl.test/c.zip"))],
                "acme/nodist" => vec![record("1.0.0", "1.0.0.0", None)],
                _ => vec![record("2.1.0", "2.1.0.0", Some("https://dl.test/f.zip"))],
            };
            Ok(PackageVersions::from_list(records))
        });
        let mut downloader = MockArchiveDownloader::new();
        downloader
            .expect_download()
            .times(1)
            .returning(|_, _| Ok(()));
        let harvester = harvester(registry, downloader, temp_dir.path().to_path_buf());

        let report = harvester.run(RankWindow::new(0, 3)).await.unwrap();

        assert_eq!(report.already_present, vec![present]);
        assert_eq!(
            report.downloaded,
            vec![temp_dir.path().join("acme/fresh--2.1.0.zip")]
        );
        assert_eq!(
            report.skipped,
            vec![SkippedPackage {
                rank: 1,
                name: "acme/nodist".to_string(),
                reason: SkipReason::MissingDist {
                    version: "1.0.0".to_string()
                },
            }]
        );
        assert_eq!(report.processed(), 3);
        assert!(temp_dir.path().join("20261017-top3-page001.txt").exists());
    }
}
