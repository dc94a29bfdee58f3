//! Registry test utilities

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;

use packagist_harvest::archive::Archiver;
use packagist_harvest::harvest::Harvester;
use packagist_harvest::version::error::RegistryError;
use packagist_harvest::version::registry::Registry;
use packagist_harvest::version::resolver::ComposerLatestResolver;
use packagist_harvest::version::types::{
    Dist, PackageName, PackageVersions, PopularEntry, PopularPage, VersionRecord,
};

use super::RecordingDownloader;

/// In-memory registry serving a fixed popularity listing and version metadata
pub struct StubRegistry {
    listing: Vec<String>,
    versions: HashMap<String, Vec<VersionRecord>>,
}

impl StubRegistry {
    pub fn new(listing: &[&str]) -> Self {
        Self {
            listing: listing.iter().map(|name| name.to_string()).collect(),
            versions: HashMap::new(),
        }
    }

    pub fn with_versions(mut self, package: &str, records: Vec<VersionRecord>) -> Self {
        self.versions.insert(package.to_string(), records);
        self
    }
}

#[async_trait]
impl Registry for StubRegistry {
    async fn fetch_popular_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<PopularPage, RegistryError> {
        let start = ((page - 1) * per_page) as usize;
        let end = (start + per_page as usize).min(self.listing.len());
        let names = self.listing.get(start..end).unwrap_or_default();

        Ok(PopularPage {
            packages: names
                .iter()
                .map(|name| PopularEntry {
                    name: name.clone(),
                    downloads: None,
                })
                .collect(),
            raw: json!({ "packages": names }),
        })
    }

    async fn fetch_all_versions(
        &self,
        package_name: &PackageName,
    ) -> Result<PackageVersions, RegistryError> {
        match self.versions.get(package_name.as_str()) {
            Some(records) => Ok(PackageVersions::from_list(records.clone())),
            None => Err(RegistryError::NotFound(package_name.to_string())),
        }
    }
}

/// A version record without a dist
pub fn record(version: &str, normalized: &str) -> VersionRecord {
    VersionRecord {
        version: version.to_string(),
        version_normalized: normalized.to_string(),
        dist: None,
    }
}

/// A version record with a zip dist at `url`
pub fn dist_record(version: &str, normalized: &str, url: &str) -> VersionRecord {
    VersionRecord {
        dist: Some(Dist {
            url: Some(url.to_string()),
            kind: Some("zip".to_string()),
            shasum: None,
            reference: None,
        }),
        ..record(version, normalized)
    }
}

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

/// Harvester over a stub registry with the default resolver and a page size of 2
pub fn create_test_harvester(
    registry: StubRegistry,
    downloader: Arc<RecordingDownloader>,
    archive_dir: &Path,
) -> Harvester {
    Harvester::new(
        Arc::new(registry),
        Arc::new(ComposerLatestResolver::default()),
        Archiver::new(archive_dir.to_path_buf(), downloader),
        2,
        run_date(),
    )
}
