//! Ingestion: OCR adapter and page enumeration

pub mod adapter;

pub use adapter::{content_hash, CancelFlag, OcrAdapter};
