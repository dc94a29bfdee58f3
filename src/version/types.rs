//! Common types shared by the registry client, the resolver and the archiver

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::version::error::InvalidPackageName;

/// Composer package name grammar (`vendor/project`, lowercase)
static PACKAGE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([_.-]?[a-z0-9]+)*/[a-z0-9](([_.]|-{1,2})?[a-z0-9]+)*$")
        .expect("package name pattern is valid")
});

/// Prefix shared by all development-branch pseudo-versions
pub const DEV_PREFIX: &str = "dev-";

/// Lowercase-normalized `vendor/project` package identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName(String);

impl PackageName {
    /// Lowercases and validates a raw name taken from the popularity listing
    pub fn parse(raw: &str) -> Result<Self, InvalidPackageName> {
        let normalized = raw.trim().to_lowercase();
        if PACKAGE_NAME_PATTERN.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(InvalidPackageName(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the slash (`symfony` in `symfony/console`)
    pub fn vendor(&self) -> &str {
        self.0.split_once('/').map_or(&self.0, |(vendor, _)| vendor)
    }

    /// The part after the slash (`console` in `symfony/console`)
    pub fn project(&self) -> &str {
        self.0.split_once('/').map_or(&self.0, |(_, project)| project)
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Distributable reference of a version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dist {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub shasum: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// One version entry of a package
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionRecord {
    /// Human readable version (`v1.2.3`, `dev-main`)
    #[serde(default)]
    pub version: String,
    /// Normalized version (`1.2.3.0`, `dev-main`)
    #[serde(default)]
    pub version_normalized: String,
    #[serde(default)]
    pub dist: Option<Dist>,
}

impl VersionRecord {
    /// Version used for comparison, falling back to the pretty version
    pub fn normalized(&self) -> &str {
        if self.version_normalized.is_empty() {
            &self.version
        } else {
            &self.version_normalized
        }
    }

    /// Version used for display and archive names, falling back to the normalized version
    pub fn display_version(&self) -> &str {
        if self.version.is_empty() {
            &self.version_normalized
        } else {
            &self.version
        }
    }

    /// Whether this record is a development-branch pseudo-version
    pub fn is_dev_branch(&self) -> bool {
        self.normalized().starts_with(DEV_PREFIX)
    }

    /// The dist URL, if the record carries a usable distributable reference
    pub fn dist_url(&self) -> Option<&str> {
        self.dist
            .as_ref()
            .and_then(|dist| dist.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// All version records of a package keyed by their version key, in registry order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    pub records: IndexMap<String, VersionRecord>,
}

impl PackageVersions {
    pub fn new(records: IndexMap<String, VersionRecord>) -> Self {
        Self { records }
    }

    /// Builds a collection keyed by position, as Composer v2 list payloads are
    pub fn from_list(records: Vec<VersionRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .enumerate()
                .map(|(index, record)| (index.to_string(), record))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, key: &str) -> Option<&VersionRecord> {
        self.records.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VersionRecord)> {
        self.records.iter()
    }
}

/// One entry of the popularity listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopularEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<u64>,
}

/// One page of the popularity listing together with its verbatim payload
#[derive(Debug, Clone, PartialEq)]
pub struct PopularPage {
    pub packages: Vec<PopularEntry>,
    pub raw: serde_json::Value,
}
