// src/fetch/download.rs

use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::ScrapeError;
use crate::navigate::{Navigator, IN_PROGRESS_SUFFIX};
use crate::util::{poll_until, CancelToken, PollOutcome};

#[derive(Debug)]
pub struct FetchOutcome {
    pub year: String,
    /// False when a historical archive was already on disk and reused.
    pub fetched: bool,
}

/// Fetch-or-skip for one year. Historical years with an archive on disk
/// are never re-fetched; the current year is force-refreshed because the
/// source republishes it. A fetch navigates to the direct-download link
/// and then polls the download directory until the browser's in-progress
/// marker clears.
#[instrument(level = "info", skip(nav, cfg, cancel, archive_url))]
pub async fn fetch_year(
    nav: &dyn Navigator,
    cfg: &Config,
    cancel: &CancelToken,
    year: &str,
    current_year: &str,
    archive_url: &str,
) -> Result<FetchOutcome, ScrapeError> {
    fs::create_dir_all(&cfg.download_dir)?;
    let is_current = year == current_year;
    let existing = existing_archives(&cfg.download_dir, year)?;

    if !existing.is_empty() {
        if !is_current {
            debug!(year, "historical archive already on disk; skipping fetch");
            return Ok(FetchOutcome {
                year: year.to_string(),
                fetched: false,
            });
        }
        // Current-year data may have been republished; stale copies go first.
        for path in &existing {
            fs::remove_file(path)?;
            debug!(path = %path.display(), "removed stale current-year archive");
        }
        info!(year, count = existing.len(), "forced refresh of current-year archive");
    }

    nav.navigate_to(archive_url).await?;
    wait_for_download(
        &cfg.download_dir,
        year,
        cfg.poll_interval(),
        cfg.download_timeout(),
        cancel,
    )
    .await?;

    info!(year, "archive fetched");
    Ok(FetchOutcome {
        year: year.to_string(),
        fetched: true,
    })
}

/// All finished archives for `year` currently on disk.
pub fn existing_archives(dir: &Path, year: &str) -> Result<Vec<PathBuf>, ScrapeError> {
    let pattern = format!("{}/{}FD*.zip", dir.display(), year);
    Ok(glob(&pattern)?.filter_map(Result::ok).collect())
}

fn in_progress_remaining(dir: &Path, year: &str) -> bool {
    let pattern = format!("{}/{}FD*{}", dir.display(), year, IN_PROGRESS_SUFFIX);
    glob(&pattern)
        .map(|m| m.filter_map(Result::ok).next().is_some())
        .unwrap_or(false)
}

/// Complete means no in-progress marker remains for the year and at least
/// one finished archive is present.
fn download_complete(dir: &Path, year: &str) -> bool {
    !in_progress_remaining(dir, year)
        && existing_archives(dir, year)
            .map(|archives| !archives.is_empty())
            .unwrap_or(false)
}

async fn wait_for_download(
    dir: &Path,
    year: &str,
    interval: Duration,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<(), ScrapeError> {
    match poll_until(interval, timeout, cancel, || download_complete(dir, year)).await {
        PollOutcome::Completed => Ok(()),
        PollOutcome::TimedOut => Err(ScrapeError::DownloadTimeout {
            year: year.to_string(),
            waited: timeout,
        }),
        PollOutcome::Cancelled => Err(ScrapeError::Cancelled { stage: "download" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigate::mock::MockNavigator;
    use tempfile::tempdir;

    fn test_config(download_dir: &Path) -> Config {
        Config {
            download_dir: download_dir.to_path_buf(),
            download_timeout_secs: 1,
            poll_interval_ms: 10,
            ..Config::default()
        }
    }

    fn zip_url(year: &str) -> String {
        format!("https://host/public_disc/financial-pdfs/{year}FD.zip")
    }

    #[tokio::test]
    async fn fetches_when_nothing_on_disk() {
        let dir = tempdir().unwrap();
        let cfg = test_config(dir.path());
        let nav = MockNavigator::new(dir.path(), Vec::new(), b"zipbytes".to_vec());

        let outcome = fetch_year(&nav, &cfg, &CancelToken::new(), "2022", "2024", &zip_url("2022"))
            .await
            .unwrap();

        assert!(outcome.fetched);
        assert!(dir.path().join("2022FD.zip").exists());
        assert_eq!(nav.visited(), vec![zip_url("2022")]);
    }

    #[tokio::test]
    async fn historical_year_on_disk_is_never_refetched() {
        let dir = tempdir().unwrap();
        let cfg = test_config(dir.path());
        fs::write(dir.path().join("2022FD.zip"), b"original").unwrap();
        let nav = MockNavigator::new(dir.path(), Vec::new(), b"fresh".to_vec());

        let outcome = fetch_year(&nav, &cfg, &CancelToken::new(), "2022", "2024", &zip_url("2022"))
            .await
            .unwrap();

        assert!(!outcome.fetched);
        assert!(nav.visited().is_empty(), "no navigation should happen");
        assert_eq!(fs::read(dir.path().join("2022FD.zip")).unwrap(), b"original");
    }

    #[tokio::test]
    async fn current_year_is_deleted_and_refetched() {
        let dir = tempdir().unwrap();
        let cfg = test_config(dir.path());
        fs::write(dir.path().join("2024FD.zip"), b"stale").unwrap();
        fs::write(dir.path().join("2024FD(1).zip"), b"stale dup").unwrap();
        let nav = MockNavigator::new(dir.path(), Vec::new(), b"fresh".to_vec());

        let outcome = fetch_year(&nav, &cfg, &CancelToken::new(), "2024", "2024", &zip_url("2024"))
            .await
            .unwrap();

        assert!(outcome.fetched);
        // both stale copies gone, exactly one fresh archive in their place
        let archives = existing_archives(dir.path(), "2024").unwrap();
        assert_eq!(archives, vec![dir.path().join("2024FD.zip")]);
        assert_eq!(fs::read(&archives[0]).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn stalled_download_times_out_with_typed_error() {
        let dir = tempdir().unwrap();
        let cfg = test_config(dir.path());
        let mut nav = MockNavigator::new(dir.path(), Vec::new(), Vec::new());
        nav.stall_downloads = true;

        let err = fetch_year(&nav, &cfg, &CancelToken::new(), "2023", "2024", &zip_url("2023"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, ScrapeError::DownloadTimeout { ref year, .. } if year == "2023"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn cancellation_is_honoured_inside_the_poll_loop() {
        let dir = tempdir().unwrap();
        let cfg = test_config(dir.path());
        let mut nav = MockNavigator::new(dir.path(), Vec::new(), Vec::new());
        nav.stall_downloads = true;
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = fetch_year(&nav, &cfg, &cancel, "2023", "2024", &zip_url("2023"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Cancelled { stage: "download" }));
    }

    #[test]
    fn in_progress_marker_blocks_completion() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("2023FD.zip.crdownload"), b"").unwrap();
        assert!(!download_complete(dir.path(), "2023"));

        fs::remove_file(dir.path().join("2023FD.zip.crdownload")).unwrap();
        fs::write(dir.path().join("2023FD.zip"), b"done").unwrap();
        assert!(download_complete(dir.path(), "2023"));
    }
}
