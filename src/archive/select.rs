// src/archive/select.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ScrapeError;
use crate::fetch::existing_archives;

/// Archive filenames carry an optional duplicate-download counter:
/// `2023FD.zip`, `2023FD(1).zip`, `2023FD(2).zip`, ...
static CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})FD(?:\((\d+)\))?\.zip$").expect("candidate pattern should parse")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCandidate {
    pub year: String,
    pub path: PathBuf,
    pub version: u32,
}

/// Parse one on-disk filename into a candidate. Names that violate the
/// `<year>FD[(n)].zip` contract are rejected rather than mis-parsed.
pub fn parse_candidate(path: &Path) -> Option<ArchiveCandidate> {
    let name = path.file_name()?.to_str()?;
    let caps = CANDIDATE_RE.captures(name)?;
    let version = caps
        .get(2)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(ArchiveCandidate {
        year: caps[1].to_string(),
        path: path.to_path_buf(),
        version,
    })
}

/// Pick the authoritative archive for `year`: the candidate with the
/// highest version counter. Ties resolve to the lexicographically
/// smallest filename, never to whatever order the directory listing
/// happened to return. Pure function of the listing at call time, so it
/// must run only after the fetch step has settled.
pub fn select_archive(dir: &Path, year: &str) -> Result<ArchiveCandidate, ScrapeError> {
    let mut candidates: Vec<ArchiveCandidate> = existing_archives(dir, year)?
        .iter()
        .filter_map(|path| parse_candidate(path))
        .collect();

    if candidates.is_empty() {
        return Err(ScrapeError::ArchiveMissing {
            year: year.to_string(),
        });
    }

    candidates.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    let mut best = candidates.remove(0);
    for candidate in candidates {
        if candidate.version > best.version {
            best = candidate;
        }
    }
    debug!(year, path = %best.path.display(), version = best.version, "selected archive");
    Ok(best)
}
