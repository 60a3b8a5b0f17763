//! OCR / text-layer provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::LanguageHint;

/// A single page handed to the OCR collaborator
#[derive(Debug, Clone)]
pub struct PageOcrRequest<'a> {
    /// Raw bytes of the source file
    pub data: &'a [u8],
    /// Page to extract, 1-based
    pub page_number: u32,
    /// Language hint forwarded to the engine
    pub language: &'a LanguageHint,
}

/// OCR output for one page
#[derive(Debug, Clone)]
pub struct PageText {
    /// Extracted text
    pub text: String,
    /// Engine confidence (0.0-1.0)
    pub confidence: f32,
}

/// Trait for page-level text extraction
///
/// The adapter applies the per-page timeout around calls to this trait, so
/// implementations only need to do the extraction itself.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Extract text for one page
    async fn extract_page_text(&self, request: PageOcrRequest<'_>) -> Result<PageText>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
