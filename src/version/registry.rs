//! Registry trait for fetching the popularity listing and package versions

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::{PackageName, PackageVersions, PopularPage};

/// Trait for reading a package registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches one page of the popularity listing
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `per_page` - Number of packages per page
    ///
    /// # Returns
    /// * `Ok(PopularPage)` - Packages ordered by descending weekly downloads, plus the raw payload
    /// * `Err(RegistryError)` - If the fetch or the parse fails
    async fn fetch_popular_page(&self, page: u32, per_page: u32)
    -> Result<PopularPage, RegistryError>;

    /// Fetches all version records for a package
    ///
    /// # Returns
    /// * `Ok(PackageVersions)` - Version records keyed by version key, in registry order
    /// * `Err(RegistryError::NotFound)` - If the registry does not know the package
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_all_versions(
        &self,
        package_name: &PackageName,
    ) -> Result<PackageVersions, RegistryError>;
}
