// src/navigate/mod.rs

pub mod http;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Suffix the browser gives a download that has not finished yet. The
/// orchestrator polls for this marker to clear before touching the file.
pub const IN_PROGRESS_SUFFIX: &str = ".crdownload";

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("navigation to {url} failed after {attempts} attempt(s): {reason}")]
    Unreachable {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("no page loaded yet; navigate_to must run before link discovery")]
    NoPage,
}

/// Abstract browsing capability the pipeline consumes. Anything that can
/// load a page, list its links, and trigger direct downloads satisfies it;
/// the production implementation is [`http::HttpNavigator`].
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Load `url`. Navigating to a direct-download link triggers the
    /// download side effect: the body lands in the download directory,
    /// written under an in-progress marker until complete.
    async fn navigate_to(&self, url: &str) -> Result<(), NavigationError>;

    /// All hrefs on the current page whose resolved URL matches `pattern`,
    /// in document order.
    async fn find_links(&self, pattern: &Regex) -> Result<Vec<String>, NavigationError>;

    /// Bounded wait for a link whose visible text contains `text`.
    /// `Ok(false)` means the text never appeared within `timeout`.
    async fn wait_for_link_text(&self, text: &str, timeout: Duration)
        -> Result<bool, NavigationError>;
}

/// In-progress twin of a destination path, browser style:
/// `2025FD.zip` → `2025FD.zip.crdownload`.
pub(crate) fn in_progress_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(IN_PROGRESS_SUFFIX);
    PathBuf::from(name)
}
