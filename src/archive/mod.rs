//! Local archive storage and the external download mechanism

pub mod archiver;
pub mod downloader;

pub use archiver::{ArchiveOutcome, Archiver, ReleaseSnapshot, archive_relative_path};
pub use downloader::{ArchiveDownloader, CommandDownloader};
