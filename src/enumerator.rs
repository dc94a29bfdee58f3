//! Popular package enumeration
//!
//! Walks the paginated popularity listing and yields `(rank, name)` pairs for a
//! half-open rank window `[min, max)`, one at a time. The cursor is lazy, finite
//! and not restartable: once it returns `None` or an error it stays finished.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::HarvestError;
use crate::version::registry::Registry;
use crate::version::types::PopularEntry;

/// Half-open rank window `[min, max)` over the popularity-ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankWindow {
    pub min: u32,
    pub max: u32,
}

impl RankWindow {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.max <= self.min
    }

    pub fn len(&self) -> u32 {
        self.max.saturating_sub(self.min)
    }

    pub fn contains(&self, rank: u32) -> bool {
        self.min <= rank && rank < self.max
    }
}

/// A package name together with its 0-based popularity rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedPackage {
    pub rank: u32,
    pub name: String,
}

/// Persists each fetched listing page verbatim for auditing
#[derive(Debug, Clone)]
pub struct PageSnapshotWriter {
    dir: PathBuf,
    run_date: NaiveDate,
    max: u32,
}

impl PageSnapshotWriter {
    pub fn new(dir: PathBuf, run_date: NaiveDate, max: u32) -> Self {
        Self { dir, run_date, max }
    }

    /// `<dir>/<YYYYMMDD>-top<max>-page<NNN>.txt`
    pub fn path(&self, page: u32) -> PathBuf {
        self.dir.join(format!(
            "{}-top{}-page{:03}.txt",
            self.run_date.format("%Y%m%d"),
            self.max,
            page
        ))
    }

    pub async fn write(&self, page: u32, raw: &serde_json::Value) -> Result<PathBuf, HarvestError> {
        let path = self.path(page);
        let snapshot_error = |source: std::io::Error| HarvestError::Snapshot {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(snapshot_error)?;
        let body = serde_json::to_string_pretty(raw)
            .map_err(|e| snapshot_error(std::io::Error::other(e)))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(snapshot_error)?;

        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Pull-based cursor over the popularity listing
pub struct PopularPackages<'a> {
    registry: &'a dyn Registry,
    window: RankWindow,
    per_page: u32,
    snapshots: PageSnapshotWriter,
    next_page: u32,
    next_rank: u32,
    buffer: VecDeque<PopularEntry>,
    seen: HashSet<String>,
    finished: bool,
}

impl<'a> PopularPackages<'a> {
    /// Positions the cursor on the page containing `window.min`
    ///
    /// `per_page` must be non-zero.
    pub fn new(
        registry: &'a dyn Registry,
        window: RankWindow,
        per_page: u32,
        snapshots: PageSnapshotWriter,
    ) -> Self {
        let per_page = per_page.max(1);
        let start_page = window.min / per_page;

        Self {
            registry,
            window,
            per_page,
            snapshots,
            next_page: start_page + 1,
            next_rank: start_page * per_page,
            buffer: VecDeque::new(),
            seen: HashSet::new(),
            finished: window.is_empty(),
        }
    }

    /// Returns the next package in the window, or `None` once the window or the catalog is exhausted
    pub async fn next(&mut self) -> Result<Option<RankedPackage>, HarvestError> {
        loop {
            if self.finished || self.next_rank >= self.window.max {
                self.finished = true;
                return Ok(None);
            }

            let Some(entry) = self.buffer.pop_front() else {
                self.load_next_page().await?;
                continue;
            };

            if !self.seen.insert(entry.name.clone()) {
                debug!("Skipping duplicate listing entry {}", entry.name);
                continue;
            }

            let rank = self.next_rank;
            self.next_rank += 1;

            if rank < self.window.min {
                continue;
            }

            return Ok(Some(RankedPackage {
                rank,
                name: entry.name,
            }));
        }
    }

    async fn load_next_page(&mut self) -> Result<(), HarvestError> {
        let page = self.next_page;

        let result = self.registry.fetch_popular_page(page, self.per_page).await;
        let listing = match result {
            Ok(listing) => listing,
            Err(source) => {
                self.finished = true;
                return Err(HarvestError::PageFetch { page, source });
            }
        };

        if let Err(e) = self.snapshots.write(page, &listing.raw).await {
            self.finished = true;
            return Err(e);
        }

        if listing.packages.is_empty() {
            info!(
                "Listing ended at page {} before rank {}",
                page, self.window.max
            );
            self.finished = true;
            return Ok(());
        }

        debug!("Loaded page {} with {} packages", page, listing.packages.len());
        self.buffer.extend(listing.packages);
        self.next_page += 1;
        Ok(())
    }
}
