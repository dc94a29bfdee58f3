//! Download the latest archives of the most popular Packagist packages
//!
//! A run enumerates a rank window of the popularity listing, resolves the latest
//! version of each package and stores its archive under a local directory that
//! doubles as a cache across runs.

pub mod archive;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod harvest;
pub mod logging;
pub mod version;
