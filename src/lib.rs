//! Scrapes yearly financial-disclosure archives from the House Clerk's
//! portal, picks the authoritative archive version per year, extracts the
//! XML payload, and normalizes it to JSON.

pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod navigate;
pub mod pipeline;
pub mod transform;
pub mod util;
