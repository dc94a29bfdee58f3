//! Registry implementations for fetching the popularity listing and package versions

pub mod packagist;

pub use packagist::PackagistRegistry;
