//! Core types for the extraction pipeline

pub mod chunk;
pub mod document;
pub mod entity;
pub mod record;
pub mod session;
pub mod table;

pub use chunk::{ContextChunk, ScoredChunk};
pub use document::{Document, DocumentMetadata, DocumentStatus, LanguageHint, Page};
pub use entity::{
    AmountMention, DateMention, FinancialMetric, IsinRecord, MetricUnit, PageEntities,
};
pub use record::{DocumentRecord, FinancialData, PageRecord};
pub use session::{Answer, HistoryMessage, MessageRole, Session, SessionState, SourceRef};
pub use table::{NumericCell, TableCandidate};
