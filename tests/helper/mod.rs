//! Shared test utilities

mod downloader;
mod registry;

pub use downloader::RecordingDownloader;
pub use registry::{StubRegistry, create_test_harvester, dist_record, record, run_date};
