// src/navigate/mock.rs
//
// Canned navigator used across the test suites: serves a fixed set of
// hrefs and "downloads" canned bytes the way a browser would, in-progress
// marker included.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use super::http::next_free_path;
use super::{in_progress_path, NavigationError, Navigator};

pub struct MockNavigator {
    download_dir: PathBuf,
    links: Vec<String>,
    payload: Vec<u8>,
    /// Write only the in-progress marker and never finish the download.
    pub stall_downloads: bool,
    pub fail_navigation: bool,
    visited: Mutex<Vec<String>>,
}

impl MockNavigator {
    pub fn new(download_dir: impl Into<PathBuf>, links: Vec<String>, payload: Vec<u8>) -> Self {
        Self {
            download_dir: download_dir.into(),
            links,
            payload,
            stall_downloads: false,
            fail_navigation: false,
            visited: Mutex::new(Vec::new()),
        }
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for MockNavigator {
    async fn navigate_to(&self, url: &str) -> Result<(), NavigationError> {
        if self.fail_navigation {
            return Err(NavigationError::Unreachable {
                url: url.to_string(),
                attempts: 3,
                reason: "connection refused".to_string(),
            });
        }
        self.visited.lock().unwrap().push(url.to_string());

        let name = url.rsplit('/').next().unwrap_or_default();
        if name.ends_with(".zip") {
            std::fs::create_dir_all(&self.download_dir).unwrap();
            let dest = next_free_path(&self.download_dir, name);
            if self.stall_downloads {
                std::fs::write(in_progress_path(&dest), b"").unwrap();
            } else {
                std::fs::write(&dest, &self.payload).unwrap();
            }
        }
        Ok(())
    }

    async fn find_links(&self, pattern: &Regex) -> Result<Vec<String>, NavigationError> {
        Ok(self
            .links
            .iter()
            .filter(|link| pattern.is_match(link))
            .cloned()
            .collect())
    }

    async fn wait_for_link_text(
        &self,
        text: &str,
        _timeout: Duration,
    ) -> Result<bool, NavigationError> {
        Ok(self.links.iter().any(|link| link.contains(text)))
    }
}
