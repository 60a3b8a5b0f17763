//! OCR adapter: turns raw file bytes into a paged document
//!
//! Each page goes to the OCR collaborator under a per-page timeout. A
//! failed page is recorded with its error and excluded from downstream
//! extraction while the rest of the document continues; only a document
//! with zero usable pages fails as a whole.

use futures_util::future::join_all;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::{OcrConfig, ProcessingConfig};
use crate::error::{Error, Result};
use crate::providers::{OcrProvider, PageOcrRequest};
use crate::types::{Document, DocumentStatus, LanguageHint, Page};

/// Shared flag for cancelling the un-started remainder of an ingestion
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Pages already extracted are kept.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Adapter in front of the OCR collaborator
pub struct OcrAdapter {
    provider: Arc<dyn OcrProvider>,
    config: OcrConfig,
    parallel_pages: usize,
}

impl OcrAdapter {
    /// Create a new adapter
    pub fn new(
        provider: Arc<dyn OcrProvider>,
        config: OcrConfig,
        processing: &ProcessingConfig,
    ) -> Self {
        Self {
            provider,
            config,
            parallel_pages: processing.page_workers(),
        }
    }

    /// Ingest a file into a paged document
    pub async fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        language: LanguageHint,
    ) -> Result<Document> {
        self.ingest_with_cancel(filename, bytes, language, &CancelFlag::new())
            .await
    }

    /// Ingest with a cancellation flag. Cancelling stops un-started pages;
    /// pages already extracted stay in the returned document.
    pub async fn ingest_with_cancel(
        &self,
        filename: &str,
        bytes: &[u8],
        language: LanguageHint,
        cancel: &CancelFlag,
    ) -> Result<Document> {
        let page_count = count_pages(filename, bytes)?;

        let mut document = Document::new(
            filename.to_string(),
            &language,
            content_hash(bytes),
        );
        document.metadata.page_count = page_count;

        tracing::info!(
            filename = filename,
            pages = page_count,
            language = language.label(),
            "starting OCR ingestion"
        );

        let semaphore = Arc::new(Semaphore::new(self.parallel_pages));
        let page_timeout = Duration::from_secs(self.config.page_timeout_secs);

        let page_futures: Vec<_> = (1..=page_count)
            .map(|page_number| {
                let semaphore = Arc::clone(&semaphore);
                let language = &language;
                let cancel = cancel.clone();

                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");

                    if cancel.is_cancelled() {
                        return Page::failed(page_number, "ingestion cancelled".to_string());
                    }

                    let request = PageOcrRequest {
                        data: bytes,
                        page_number,
                        language,
                    };

                    match timeout(page_timeout, self.provider.extract_page_text(request)).await {
                        Ok(Ok(page_text)) => {
                            if page_text.confidence < self.config.min_confidence {
                                tracing::warn!(
                                    page = page_number,
                                    confidence = page_text.confidence,
                                    "page below confidence threshold"
                                );
                                Page::failed(
                                    page_number,
                                    format!(
                                        "confidence {:.2} below threshold",
                                        page_text.confidence
                                    ),
                                )
                            } else {
                                Page::ok(page_number, page_text.text, page_text.confidence)
                            }
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(page = page_number, "OCR failed: {}", e);
                            Page::failed(page_number, e.to_string())
                        }
                        Err(_) => {
                            tracing::warn!(page = page_number, "OCR timed out");
                            Page::failed(
                                page_number,
                                Error::ocr(page_number, "timed out").to_string(),
                            )
                        }
                    }
                }
            })
            .collect();

        let mut pages = join_all(page_futures).await;
        pages.sort_by_key(|p| p.page_number);
        document.pages = pages;

        let usable = document.usable_pages().count();
        if usable == 0 {
            tracing::error!(filename = filename, "no page produced usable text");
            return Err(Error::Extraction(format!(
                "all {} pages of '{}' failed OCR",
                page_count, filename
            )));
        }

        document.status = DocumentStatus::Extracted;
        tracing::info!(
            document_id = %document.id,
            usable_pages = usable,
            failed_pages = page_count as usize - usable,
            "ingestion complete"
        );
        Ok(document)
    }
}

/// Hex-encoded SHA-256 of the raw input, used for deduplication by callers
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Determine the page count of the input. PDF inputs are enumerated with
/// lopdf; plain-text inputs split on form feeds.
fn count_pages(filename: &str, bytes: &[u8]) -> Result<u32> {
    if bytes.is_empty() {
        return Err(Error::ingestion(filename, "empty file"));
    }

    if bytes.starts_with(b"%PDF") {
        let pdf = lopdf::Document::load_mem(bytes)
            .map_err(|e| Error::ingestion(filename, format!("unreadable PDF: {}", e)))?;
        let count = pdf.get_pages().len() as u32;
        if count == 0 {
            return Err(Error::ingestion(filename, "PDF has no pages"));
        }
        return Ok(count);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.split('\u{c}').count() as u32),
        Err(_) => Err(Error::ingestion(
            filename,
            "not a PDF and not valid UTF-8 text",
        )),
    }
}
