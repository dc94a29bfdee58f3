//! Registry access and version resolution
//!
//! This module fetches the popularity listing and per-package version metadata from
//! Packagist and picks the single "latest" version of each package.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│  Resolver   │────▶│   Compare   │
//! │  (fetch)    │     │  (select)   │     │ (ordering)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ Registries  │
//! │ (packagist) │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for fetching listings and versions
//! - [`registries`]: Concrete registry implementations (Packagist)
//! - [`resolver`]: Latest version selection policy
//! - [`compare`]: Composer-style version ordering
//! - [`error`]: Error types for registry operations
//! - [`types`]: Common types like `PackageName` and `PackageVersions`

pub mod compare;
pub mod error;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod types;
