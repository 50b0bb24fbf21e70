// src/archive/mod.rs

pub mod extract;
pub mod select;

pub use extract::{extract_payload, ExtractOutcome, PAYLOAD_EXT};
pub use select::{select_archive, ArchiveCandidate};
