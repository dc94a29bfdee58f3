//! Latest version resolver
//!
//! Selects the single "latest" version record of a package:
//! 1. the highest tagged (non `dev-`) version wins outright
//! 2. otherwise the first configured default branch that carries a dist
//! 3. otherwise nothing

use std::cmp::Ordering;

use crate::version::compare::compare_versions;
use crate::version::types::{PackageVersions, VersionRecord};

/// Default-branch fallbacks, highest priority first
pub const DEFAULT_BRANCH_PRIORITY: &[&str] = &["dev-latest", "dev-main", "dev-master"];

/// The version record chosen as latest, together with its version key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub key: String,
    pub record: VersionRecord,
}

/// Find the highest tagged version, ignoring development branches
///
/// Ties keep the record that appears first.
pub fn find_highest_tagged(versions: &PackageVersions) -> Option<ResolvedVersion> {
    versions
        .iter()
        .filter(|(_, record)| !record.is_dev_branch())
        .fold(None::<(&String, &VersionRecord)>, |best, candidate| match best {
            Some(current)
                if compare_versions(candidate.1.normalized(), current.1.normalized())
                    != Ordering::Greater =>
            {
                Some(current)
            }
            _ => Some(candidate),
        })
        .map(|(key, record)| ResolvedVersion {
            key: key.clone(),
            record: record.clone(),
        })
}

/// Trait for determining the "latest" version of a package
pub trait LatestVersionResolver: Send + Sync {
    /// Determine the "latest" version from all known version records
    ///
    /// Default implementation returns the highest tagged version.
    fn resolve_latest(&self, versions: &PackageVersions) -> Option<ResolvedVersion> {
        find_highest_tagged(versions)
    }
}

/// Composer resolver: highest tag, then the configured default branches
#[derive(Debug, Clone)]
pub struct ComposerLatestResolver {
    branch_priority: Vec<String>,
}

impl ComposerLatestResolver {
    pub fn new(branch_priority: Vec<String>) -> Self {
        Self { branch_priority }
    }

    fn find_default_branch(&self, versions: &PackageVersions) -> Option<ResolvedVersion> {
        self.branch_priority.iter().find_map(|branch| {
            versions
                .iter()
                .filter(|(_, record)| record.normalized() == branch)
                .find(|(_, record)| record.dist_url().is_some())
                .map(|(key, record)| ResolvedVersion {
                    key: key.clone(),
                    record: record.clone(),
                })
        })
    }
}

impl Default for ComposerLatestResolver {
    fn default() -> Self {
        Self::new(
            DEFAULT_BRANCH_PRIORITY
                .iter()
                .map(|branch| branch.to_string())
                .collect(),
        )
    }
}

impl LatestVersionResolver for ComposerLatestResolver {
    fn resolve_latest(&self, versions: &PackageVersions) -> Option<ResolvedVersion> {
        find_highest_tagged(versions).or_else(|| self.find_default_branch(versions))
    }
}
