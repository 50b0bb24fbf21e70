// src/fetch/mod.rs

pub mod download;

pub use download::{existing_archives, fetch_year, FetchOutcome};
