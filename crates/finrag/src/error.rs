//! Error types for the extraction pipeline and session coordinator

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline and coordinator errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unreadable input file, no document produced
    #[error("Ingestion failed for '{filename}': {message}")]
    Ingestion { filename: String, message: String },

    /// Per-page OCR failure. Recorded on the page, never fatal to the document.
    #[error("OCR failed on page {page_number}: {message}")]
    Ocr { page_number: u32, message: String },

    /// Zero pages produced usable text
    #[error("Extraction produced no usable pages: {0}")]
    Extraction(String),

    /// Embedding or answer-generation provider failure
    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// Session has expired
    #[error("Session expired: {0}")]
    SessionExpired(uuid::Uuid),

    /// Session does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Document does not exist
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// Storage collaborator error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an ingestion error
    pub fn ingestion(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ingestion {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a per-page OCR error
    pub fn ocr(page_number: u32, message: impl Into<String>) -> Self {
        Self::Ocr {
            page_number,
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is a retryable provider fault
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Http(_))
    }
}
