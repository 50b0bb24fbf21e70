// src/error.rs

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::navigate::NavigationError;

/// Failures the pipeline can surface to a caller. Per-year errors
/// (download, extraction) are collected so independent years still run;
/// the payload invariants are treated as fatal to the whole run because
/// they indicate the source changed shape underneath us.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid year {0:?}: expected exactly four ASCII digits")]
    InvalidYear(String),

    #[error("year(s) not published: {requested:?}; available years: {catalog:?}")]
    UnknownYear {
        requested: Vec<String>,
        catalog: Vec<String>,
    },

    #[error("download for {year} did not complete within {waited:?}")]
    DownloadTimeout { year: String, waited: Duration },

    #[error("run cancelled while waiting on {stage}")]
    Cancelled { stage: &'static str },

    #[error("no archive on disk for {year}")]
    ArchiveMissing { year: String },

    #[error("no XML payload in {}; archive contents: {contents:?}", .archive.display())]
    PayloadMissing {
        archive: PathBuf,
        contents: Vec<String>,
    },

    #[error("multiple XML payloads in {}: {entries:?}", .archive.display())]
    AmbiguousPayload {
        archive: PathBuf,
        entries: Vec<String>,
    },

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Glob(#[from] glob::PatternError),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
