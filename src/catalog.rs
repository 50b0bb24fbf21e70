// src/catalog.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::ScrapeError;
use crate::navigate::Navigator;

/// Year archives are published as `<4-digit-year>FD.zip`.
pub static ARCHIVE_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})FD\.zip$").expect("archive link pattern should parse"));

/// The years the portal currently publishes, with the href each was
/// discovered under. Built once per run from the rendered listing page;
/// read-only afterwards. First-seen order is preserved.
pub struct YearCatalog {
    entries: Vec<(String, String)>,
}

impl YearCatalog {
    #[instrument(level = "info", skip(nav))]
    pub async fn discover(nav: &dyn Navigator) -> Result<Self, ScrapeError> {
        let links = nav.find_links(&ARCHIVE_LINK_RE).await?;
        let mut entries: Vec<(String, String)> = Vec::new();
        for link in links {
            let Some(caps) = ARCHIVE_LINK_RE.captures(&link) else {
                continue;
            };
            let year = caps[1].to_string();
            if entries.iter().all(|(y, _)| *y != year) {
                debug!(year = %year, href = %link, "found published year");
                entries.push((year, link));
            }
        }
        info!(count = entries.len(), "year catalog built");
        Ok(Self { entries })
    }

    pub fn years(&self) -> Vec<String> {
        self.entries.iter().map(|(y, _)| y.clone()).collect()
    }

    pub fn contains(&self, year: &str) -> bool {
        self.entries.iter().any(|(y, _)| y == year)
    }

    /// Direct-download href for `year`, if it was on the listing page.
    pub fn link_for(&self, year: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(y, _)| y == year)
            .map(|(_, link)| link.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A year must be exactly four ASCII digits.
pub fn validate_year_shape(year: &str) -> Result<(), ScrapeError> {
    if year.len() == 4 && year.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ScrapeError::InvalidYear(year.to_string()))
    }
}

/// Resolve the effective year set for a run. An empty request means the
/// whole catalog. Every requested year gets a bounded wait for its link
/// before being declared unpublished; the error carries the full catalog
/// so the caller can report the available alternatives.
pub async fn validate_requested(
    nav: &dyn Navigator,
    catalog: &YearCatalog,
    requested: &[String],
    link_wait: Duration,
) -> Result<Vec<String>, ScrapeError> {
    if requested.is_empty() {
        return Ok(catalog.years());
    }

    let mut missing = Vec::new();
    for year in requested {
        validate_year_shape(year)?;
        if catalog.contains(year) {
            continue;
        }
        // The portal renders year links lazily, so an absent link gets a
        // bounded wait rather than an immediate rejection.
        if !nav.wait_for_link_text(year, link_wait).await? {
            missing.push(year.clone());
        }
    }

    if missing.is_empty() {
        Ok(requested.to_vec())
    } else {
        Err(ScrapeError::UnknownYear {
            requested: missing,
            catalog: catalog.years(),
        })
    }
}

/// Known URL shape of the portal's direct-download links, used when a
/// year's link appeared only after catalog discovery.
pub fn default_archive_url(base_url: &str, year: &str) -> Result<String, ScrapeError> {
    let base = Url::parse(base_url)?;
    Ok(base
        .join(&format!("/public_disc/financial-pdfs/{year}FD.zip"))?
        .to_string())
}
