//! Document aggregate: pages, lifecycle, and ingestion metadata

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language hint passed to the OCR collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LanguageHint {
    /// Let the OCR engine detect the language
    #[default]
    Auto,
    /// A single ISO 639-1 language code
    Language(String),
    /// Document mixes languages; the OCR engine decides per region
    Mixed,
}

impl LanguageHint {
    /// Label used in metadata and provider requests
    pub fn label(&self) -> &str {
        match self {
            Self::Auto => "auto",
            Self::Language(code) => code.as_str(),
            Self::Mixed => "mixed",
        }
    }
}

/// Document lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// OCR in progress
    Ingesting,
    /// Pages extracted, not yet indexed
    Extracted,
    /// Indexed and queryable
    Indexed,
    /// Ingestion failed, no usable content
    Failed,
}

/// Document metadata carried into the persisted representation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// Original filename as uploaded
    pub filename: String,
    /// Total number of pages
    pub page_count: u32,
    /// Language hint label used at ingestion
    pub language: String,
}

/// A single page of OCR output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// Page number, 1-based
    pub page_number: u32,
    /// Raw text as returned by the OCR collaborator
    pub raw_text: String,
    /// OCR confidence for this page (0.0-1.0)
    pub extraction_confidence: f32,
    /// Set when OCR failed; the page stays in the document but contributes
    /// no entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_error: Option<String>,
}

impl Page {
    /// Page with usable text
    pub fn ok(page_number: u32, raw_text: String, confidence: f32) -> Self {
        Self {
            page_number,
            raw_text,
            extraction_confidence: confidence,
            ocr_error: None,
        }
    }

    /// Page whose OCR failed
    pub fn failed(page_number: u32, error: String) -> Self {
        Self {
            page_number,
            raw_text: String::new(),
            extraction_confidence: 0.0,
            ocr_error: Some(error),
        }
    }

    /// Whether this page contributes to extraction
    pub fn is_usable(&self) -> bool {
        self.ocr_error.is_none() && !self.raw_text.trim().is_empty()
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Filename, page count, language
    pub metadata: DocumentMetadata,
    /// Ordered pages, including failed ones
    pub pages: Vec<Page>,
    /// Lifecycle state
    pub status: DocumentStatus,
    /// Content hash of the raw input, for deduplication
    pub content_hash: String,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document in the Ingesting state
    pub fn new(filename: String, language: &LanguageHint, content_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata: DocumentMetadata {
                filename,
                page_count: 0,
                language: language.label().to_string(),
            },
            pages: Vec::new(),
            status: DocumentStatus::Ingesting,
            content_hash,
            ingested_at: chrono::Utc::now(),
        }
    }

    /// Pages that produced usable text
    pub fn usable_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| p.is_usable())
    }

    /// Look up a page by its 1-based number
    pub fn page(&self, page_number: u32) -> Option<&Page> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }
}
