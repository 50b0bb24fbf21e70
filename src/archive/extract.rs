// src/archive/extract.rs

use glob::glob;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use zip::ZipArchive;

use crate::archive::select::select_archive;
use crate::error::ScrapeError;

/// Extension of the structured payload inside each archive.
pub const PAYLOAD_EXT: &str = "xml";

#[derive(Debug)]
pub struct ExtractOutcome {
    pub path: PathBuf,
    /// False when a historical payload was already on disk and reused.
    pub extracted: bool,
}

/// Extract the single XML payload for `year` into `extract_dir`, applying
/// the same freshness policy as the download step: historical payloads on
/// disk are reused untouched, current-year payloads are dropped and
/// re-extracted. Exactly one payload entry is expected in the archive;
/// zero or several indicate the source changed shape and fail loudly.
#[instrument(level = "info", skip(download_dir, extract_dir))]
pub fn extract_payload(
    download_dir: &Path,
    extract_dir: &Path,
    year: &str,
    current_year: &str,
) -> Result<ExtractOutcome, ScrapeError> {
    fs::create_dir_all(extract_dir)?;
    let is_current = year == current_year;
    let existing = payload_files(extract_dir, year)?;

    if !existing.is_empty() {
        if !is_current {
            debug!(year, "historical payload already extracted; skipping");
            return Ok(ExtractOutcome {
                path: existing[0].clone(),
                extracted: false,
            });
        }
        for path in &existing {
            fs::remove_file(path)?;
            debug!(path = %path.display(), "removed stale current-year payload");
        }
    }

    let selected = select_archive(download_dir, year)?;
    let file = File::open(&selected.path)?;
    let mut archive = ZipArchive::new(file)?;

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    let suffix = format!(".{PAYLOAD_EXT}");
    let payloads: Vec<String> = names
        .iter()
        .filter(|name| name.to_ascii_lowercase().ends_with(&suffix))
        .cloned()
        .collect();

    match payloads.as_slice() {
        [] => Err(ScrapeError::PayloadMissing {
            archive: selected.path,
            contents: names,
        }),
        [entry] => {
            let dest = extract_dir.join(format!("{year}FD.{PAYLOAD_EXT}"));
            let mut src = archive.by_name(entry)?;
            let mut out = File::create(&dest)?;
            io::copy(&mut src, &mut out)?;
            info!(year, path = %dest.display(), "payload extracted");
            Ok(ExtractOutcome {
                path: dest,
                extracted: true,
            })
        }
        _ => Err(ScrapeError::AmbiguousPayload {
            archive: selected.path,
            entries: payloads,
        }),
    }
}

/// Extracted payloads for `year` currently in the working directory.
pub fn payload_files(dir: &Path, year: &str) -> Result<Vec<PathBuf>, ScrapeError> {
    let pattern = format!("{}/{}FD*.{}", dir.display(), year, PAYLOAD_EXT);
    Ok(glob(&pattern)?.filter_map(Result::ok).collect())
}
