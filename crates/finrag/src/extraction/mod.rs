//! Extraction: table reconstruction and financial entity recognition
//!
//! Everything here is a pure function of page text, which keeps the
//! per-page work freely parallelizable and reproducible.

pub mod entities;
pub mod isin;
pub mod metrics;
pub mod numeric;
pub mod tables;

pub use entities::extract_entities;
pub use tables::{normalized_rows, reconstruct_tables};
