//! finrag: financial document extraction and grounded question answering
//!
//! This crate ingests scanned or text financial documents through an OCR
//! collaborator, reconstructs tables and validated financial entities from
//! the page text, aggregates them into a queryable document index, and
//! serves natural-language questions over bounded conversational sessions.
//! Web routing, upload transport, and storage engines stay outside; they
//! plug in through the provider and storage traits.

pub mod config;
pub mod error;
pub mod extraction;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod retrieval;
pub mod session;
pub mod storage;
pub mod types;

pub use config::FinragConfig;
pub use error::{Error, Result};
pub use index::{DocumentIndex, IndexedDocument};
pub use ingestion::{CancelFlag, OcrAdapter};
pub use processing::{ExtractionPipeline, PipelineReport};
pub use retrieval::Retriever;
pub use session::SessionCoordinator;
pub use types::{
    Answer, ContextChunk, Document, DocumentRecord, DocumentStatus, FinancialMetric,
    IsinRecord, LanguageHint, Page, Session, SessionState, TableCandidate,
};
