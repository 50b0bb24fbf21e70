// src/navigate/http.rs

use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::{fs, io::AsyncWriteExt, time::sleep, time::Instant};
use tracing::{debug, warn};
use url::Url;

use super::{in_progress_path, NavigationError, Navigator};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

/// Plain-HTTP [`Navigator`]: fetches pages with `reqwest`, discovers links
/// with `scraper`, and mimics a browser's download behaviour (streamed
/// write behind an in-progress marker, duplicate-name `(n)` counter).
pub struct HttpNavigator {
    client: Client,
    download_dir: PathBuf,
    page: Mutex<Option<(Url, String)>>,
}

impl HttpNavigator {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            download_dir: download_dir.into(),
            page: Mutex::new(None),
        }
    }

    async fn get_text(&self, url: &Url) -> anyhow::Result<String> {
        Ok(self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?
            .text()
            .await
            .with_context(|| format!("reading body from {url}"))?)
    }

    async fn get_text_with_retry(&self, url: &Url) -> Result<String, NavigationError> {
        let mut attempts = 0;
        loop {
            match self.get_text(url).await {
                Ok(text) => return Ok(text),
                Err(e) if attempts + 1 < MAX_RETRIES => {
                    attempts += 1;
                    let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempts - 1);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) => {
                    return Err(NavigationError::Unreachable {
                        url: url.to_string(),
                        attempts: attempts + 1,
                        reason: e.to_string(),
                    })
                }
            }
        }
    }

    async fn download(&self, url: &Url) -> Result<(), NavigationError> {
        let filename = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .unwrap_or("download.zip")
            .to_string();

        let dest = {
            fs::create_dir_all(&self.download_dir)
                .await
                .map_err(|e| NavigationError::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
            next_free_path(&self.download_dir, &filename)
        };
        let part = in_progress_path(&dest);

        match self.stream_to(url, &part, &dest).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // never leave a stale in-progress marker behind a failure
                let _ = fs::remove_file(&part).await;
                Err(NavigationError::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn stream_to(&self, url: &Url, part: &Path, dest: &Path) -> anyhow::Result<()> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()?;

        let mut file = fs::File::create(part)
            .await
            .with_context(|| format!("creating {}", part.display()))?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        drop(file);

        fs::rename(part, dest)
            .await
            .with_context(|| format!("finalizing {}", dest.display()))?;
        debug!(path = %dest.display(), "download complete");
        Ok(())
    }

    fn page_has_link_text(&self, text: &str) -> Result<bool, NavigationError> {
        let guard = self.page.lock().expect("page lock");
        let (_, html) = guard.as_ref().ok_or(NavigationError::NoPage)?;
        let selector = Selector::parse("a").expect("anchor selector should parse");
        Ok(Html::parse_document(html)
            .select(&selector)
            .any(|a| a.text().any(|t| t.contains(text))))
    }

    async fn refresh(&self) -> Result<(), NavigationError> {
        let url = {
            let guard = self.page.lock().expect("page lock");
            guard.as_ref().map(|(u, _)| u.clone())
        };
        let url = url.ok_or(NavigationError::NoPage)?;
        let html = self.get_text_with_retry(&url).await?;
        *self.page.lock().expect("page lock") = Some((url, html));
        Ok(())
    }
}

#[async_trait]
impl Navigator for HttpNavigator {
    async fn navigate_to(&self, url: &str) -> Result<(), NavigationError> {
        let url = Url::parse(url).map_err(|e| NavigationError::Unreachable {
            url: url.to_string(),
            attempts: 0,
            reason: e.to_string(),
        })?;

        if url.path().ends_with(".zip") {
            debug!(%url, "direct-download link");
            return self.download(&url).await;
        }

        let html = self.get_text_with_retry(&url).await?;
        *self.page.lock().expect("page lock") = Some((url, html));
        Ok(())
    }

    async fn find_links(&self, pattern: &Regex) -> Result<Vec<String>, NavigationError> {
        let guard = self.page.lock().expect("page lock");
        let (base, html) = guard.as_ref().ok_or(NavigationError::NoPage)?;
        let selector = Selector::parse("a[href]").expect("anchor selector should parse");
        Ok(Html::parse_document(html)
            .select(&selector)
            .filter_map(|e| e.value().attr("href"))
            .filter_map(|href| base.join(href).ok())
            .map(|u| u.to_string())
            .filter(|u| pattern.is_match(u))
            .collect())
    }

    async fn wait_for_link_text(
        &self,
        text: &str,
        timeout: Duration,
    ) -> Result<bool, NavigationError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.page_has_link_text(text)? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(REFRESH_INTERVAL.min(timeout)).await;
            self.refresh().await?;
        }
    }
}

/// First unoccupied destination for `filename`, appending the browser's
/// `(n)` duplicate counter before the extension when needed.
pub(crate) fn next_free_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = filename
        .rsplit_once('.')
        .unwrap_or((filename, ""));
    for n in 1u32.. {
        let name = if ext.is_empty() {
            format!("{stem}({n})")
        } else {
            format!("{stem}({n}).{ext}")
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("ran out of duplicate counters")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn duplicate_counter_mirrors_browser_naming() {
        let dir = tempdir().unwrap();
        assert_eq!(
            next_free_path(dir.path(), "2023FD.zip"),
            dir.path().join("2023FD.zip")
        );

        std::fs::write(dir.path().join("2023FD.zip"), b"x").unwrap();
        assert_eq!(
            next_free_path(dir.path(), "2023FD.zip"),
            dir.path().join("2023FD(1).zip")
        );

        std::fs::write(dir.path().join("2023FD(1).zip"), b"x").unwrap();
        assert_eq!(
            next_free_path(dir.path(), "2023FD.zip"),
            dir.path().join("2023FD(2).zip")
        );
    }

    #[test]
    fn in_progress_marker_appends_suffix() {
        let dest = Path::new("archives/2025FD.zip");
        assert_eq!(
            in_progress_path(dest),
            PathBuf::from("archives/2025FD.zip.crdownload")
        );
    }
}
