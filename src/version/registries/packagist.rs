//! Packagist API implementation

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::{
    PackageName, PackageVersions, PopularEntry, PopularPage, VersionRecord,
};

/// Default base URL of the Packagist website API
pub const DEFAULT_WEB_URL: &str = "https://packagist.org";

/// Default base URL of the Composer v2 metadata repository
pub const DEFAULT_REPO_URL: &str = "https://repo.packagist.org";

/// Marker of Composer v2 minified metadata
const MINIFIED_FORMAT: &str = "composer/2.0";

/// Value that removes an inherited field from a minified entry
const UNSET_MARKER: &str = "__unset";

/// Registry implementation for the Packagist APIs
pub struct PackagistRegistry {
    client: reqwest::Client,
    web_url: String,
    repo_url: String,
}

impl PackagistRegistry {
    /// Creates a new PackagistRegistry with custom base URLs
    pub fn new(web_url: &str, repo_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            web_url: web_url.trim_end_matches('/').to_string(),
            repo_url: repo_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, url: &str, package_name: &str) -> Result<Value, RegistryError> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if !status.is_success() {
            warn!("Packagist returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            warn!("Failed to parse Packagist response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })
    }

    /// Fetches one p2 metadata file (`<name>.json` or `<name>~dev.json`)
    async fn fetch_metadata(
        &self,
        package_name: &PackageName,
        suffix: &str,
    ) -> Result<PackageVersions, RegistryError> {
        let url = format!("{}/p2/{}{}.json", self.repo_url, package_name, suffix);
        let body = self.get_json(&url, package_name.as_str()).await?;
        parse_metadata(body, package_name)
    }
}

/// Extracts the version records of `package_name` from a p2 metadata document
fn parse_metadata(
    mut body: Value,
    package_name: &PackageName,
) -> Result<PackageVersions, RegistryError> {
    let minified = body.get("minified").and_then(Value::as_str) == Some(MINIFIED_FORMAT);

    let entries = body
        .get_mut("packages")
        .and_then(|packages| packages.get_mut(package_name.as_str()))
        .map(Value::take)
        .unwrap_or(Value::Null);

    match entries {
        Value::Null => Ok(PackageVersions::default()),
        Value::Array(list) => {
            let list = if minified { expand_minified(list) } else { list };
            let records = list
                .into_iter()
                .map(parse_record)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(PackageVersions::from_list(records))
        }
        Value::Object(map) => {
            let records = map
                .into_iter()
                .map(|(key, value)| parse_record(value).map(|record| (key, record)))
                .collect::<Result<_, _>>()?;
            Ok(PackageVersions::new(records))
        }
        other => Err(RegistryError::InvalidResponse(format!(
            "Unexpected version list for {}: {}",
            package_name, other
        ))),
    }
}

fn parse_record(value: Value) -> Result<VersionRecord, RegistryError> {
    serde_json::from_value(value).map_err(|e| RegistryError::InvalidResponse(e.to_string()))
}

/// Expands Composer v2 minified entries
///
/// Every entry after the first only lists the fields that changed from the previous
/// expanded entry; a field set to `"__unset"` is dropped.
fn expand_minified(entries: Vec<Value>) -> Vec<Value> {
    let mut expanded = Vec::with_capacity(entries.len());
    let mut previous: Option<Map<String, Value>> = None;

    for entry in entries {
        let Value::Object(fields) = entry else {
            expanded.push(entry);
            continue;
        };

        let mut current = previous.take().unwrap_or_default();
        for (key, value) in fields {
            if value.as_str() == Some(UNSET_MARKER) {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }

        expanded.push(Value::Object(current.clone()));
        previous = Some(current);
    }

    expanded
}

#[async_trait::async_trait]
impl Registry for PackagistRegistry {
    async fn fetch_popular_page(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<PopularPage, RegistryError> {
        let url = format!(
            "{}/explore/popular.json?per_page={}&page={}",
            self.web_url, per_page, page
        );
        let raw = self.get_json(&url, "explore/popular").await?;

        let packages = raw
            .get("packages")
            .cloned()
            .ok_or_else(|| {
                RegistryError::InvalidResponse(format!("Missing packages on page {}", page))
            })
            .and_then(|packages| {
                serde_json::from_value::<Vec<PopularEntry>>(packages)
                    .map_err(|e| RegistryError::InvalidResponse(e.to_string()))
            })?;

        debug!("Page {} listed {} packages", page, packages.len());

        Ok(PopularPage { packages, raw })
    }

    async fn fetch_all_versions(
        &self,
        package_name: &PackageName,
    ) -> Result<PackageVersions, RegistryError> {
        match self.fetch_metadata(package_name, "").await {
            Ok(versions) if !versions.is_empty() => return Ok(versions),
            Ok(_) | Err(RegistryError::NotFound(_)) => {
                debug!("No tagged metadata for {}, trying ~dev", package_name);
            }
            Err(e) => return Err(e),
        }

        let versions = self.fetch_metadata(package_name, "~dev").await?;

        debug!(
            "Found {} versions for package {}",
            versions.len(),
            package_name
        );

        Ok(versions)
    }
}
