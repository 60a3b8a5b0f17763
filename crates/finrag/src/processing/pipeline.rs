//! Extraction pipeline: runs table reconstruction and entity extraction
//! over a document's pages in parallel, then indexes the result
//!
//! Both extractors are pure functions of page text, so pages fan out to a
//! bounded set of blocking tasks with no shared mutable state. The document
//! index and store only see the merged result.

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::{ChunkingConfig, EntityConfig, ProcessingConfig, TableConfig};
use crate::error::{Error, Result};
use crate::extraction::{extract_entities, reconstruct_tables};
use crate::index::{DocumentIndex, IndexedDocument};
use crate::ingestion::CancelFlag;
use crate::providers::EmbeddingProvider;
use crate::storage::DocumentStore;
use crate::types::{Document, DocumentStatus, PageEntities, TableCandidate};

/// Summary of one pipeline run, surfaced to the API layer
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineReport {
    pub document_id: uuid::Uuid,
    pub pages_total: usize,
    pub pages_ok: usize,
    pub pages_failed: usize,
    pub pages_skipped: usize,
    pub tables: usize,
    pub isins: usize,
    pub metrics: usize,
    pub cancelled: bool,
}

/// Drives extraction and indexing for ingested documents
pub struct ExtractionPipeline {
    index: Arc<DocumentIndex>,
    store: Arc<dyn DocumentStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    table_config: TableConfig,
    entity_config: EntityConfig,
    chunking: ChunkingConfig,
    page_workers: usize,
}

impl ExtractionPipeline {
    /// Create a new pipeline
    pub fn new(
        index: Arc<DocumentIndex>,
        store: Arc<dyn DocumentStore>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        table_config: TableConfig,
        entity_config: EntityConfig,
        chunking: ChunkingConfig,
        processing: &ProcessingConfig,
    ) -> Self {
        Self {
            index,
            store,
            embedder,
            table_config,
            entity_config,
            chunking,
            page_workers: processing.page_workers(),
        }
    }

    /// Extract and index a document. Re-running for the same document id
    /// replaces the prior index entry and stored aggregate.
    pub async fn process(&self, document: Document) -> Result<PipelineReport> {
        self.process_with_cancel(document, &CancelFlag::new()).await
    }

    /// Extract and index with a cancellation flag. Cancelling skips pages
    /// that have not started; completed pages are kept and indexed.
    pub async fn process_with_cancel(
        &self,
        mut document: Document,
        cancel: &CancelFlag,
    ) -> Result<PipelineReport> {
        let pages_total = document.pages.len();
        let pages_failed = pages_total - document.usable_pages().count();

        if pages_total == pages_failed {
            document.status = DocumentStatus::Failed;
            self.store.save_document(&document).await?;
            return Err(Error::Extraction(format!(
                "document '{}' has no usable pages",
                document.metadata.filename
            )));
        }

        let semaphore = Arc::new(Semaphore::new(self.page_workers));
        let page_futures: Vec<_> = document
            .usable_pages()
            .cloned()
            .map(|page| {
                let semaphore = Arc::clone(&semaphore);
                let table_config = self.table_config.clone();
                let entity_config = self.entity_config.clone();
                let cancel = cancel.clone();

                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");
                    if cancel.is_cancelled() {
                        return None;
                    }

                    let page_number = page.page_number;
                    let handle = tokio::task::spawn_blocking(move || {
                        let tables = reconstruct_tables(&page, &table_config);
                        let entities = extract_entities(&page, &entity_config);
                        (tables, entities)
                    });

                    match handle.await {
                        Ok((tables, entities)) => Some((page_number, tables, entities)),
                        Err(e) => {
                            tracing::error!(page = page_number, "extraction task panicked: {}", e);
                            None
                        }
                    }
                }
            })
            .collect();

        let mut results: Vec<(u32, Vec<TableCandidate>, PageEntities)> =
            join_all(page_futures).await.into_iter().flatten().collect();
        results.sort_by_key(|(page_number, _, _)| *page_number);

        let pages_ok = results.len();
        let pages_skipped = pages_total - pages_failed - pages_ok;
        let cancelled = cancel.is_cancelled();

        let mut tables = Vec::new();
        let mut entities = Vec::new();
        for (_, page_tables, page_entities) in results {
            tables.extend(page_tables);
            entities.push(page_entities);
        }

        document.status = DocumentStatus::Indexed;
        self.store.save_document(&document).await?;

        let mut indexed =
            IndexedDocument::build(document, tables, entities, &self.chunking);
        self.embed_chunks(&mut indexed).await;

        let report = PipelineReport {
            document_id: indexed.document.id,
            pages_total,
            pages_ok,
            pages_failed,
            pages_skipped,
            tables: indexed.tables.len(),
            isins: indexed.isins.len(),
            metrics: indexed.metrics.len(),
            cancelled,
        };

        self.index.insert(Arc::new(indexed));
        tracing::info!(
            document_id = %report.document_id,
            pages_ok = report.pages_ok,
            tables = report.tables,
            isins = report.isins,
            metrics = report.metrics,
            "pipeline run complete"
        );

        Ok(report)
    }

    /// Attach embeddings to chunks when a provider is configured. Failure
    /// here only loses the embedding ranking path, so it is absorbed.
    async fn embed_chunks(&self, indexed: &mut IndexedDocument) {
        let embedder = match &self.embedder {
            Some(e) => e,
            None => return,
        };
        if indexed.chunks.is_empty() {
            return;
        }

        let texts: Vec<String> = indexed.chunks.iter().map(|c| c.text.clone()).collect();
        match embedder.embed_batch(&texts).await {
            Ok(embeddings) if embeddings.len() == indexed.chunks.len() => {
                for (chunk, embedding) in indexed.chunks.iter_mut().zip(embeddings) {
                    chunk.embedding = embedding;
                }
            }
            Ok(_) => {
                tracing::warn!("embedder returned wrong batch size, skipping embeddings");
            }
            Err(e) => {
                tracing::warn!("chunk embedding failed, term ranking will be used: {}", e);
            }
        }
    }

    /// Remove a document from the index and store
    pub async fn delete_document(&self, id: &uuid::Uuid) -> Result<bool> {
        let in_index = self.index.remove(id);
        let in_store = self.store.delete_document(id).await?;
        if !in_index && !in_store {
            return Err(Error::DocumentNotFound(*id));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDocumentStore;
    use crate::types::{LanguageHint, Page};

    fn pipeline() -> (ExtractionPipeline, Arc<DocumentIndex>) {
        let index = Arc::new(DocumentIndex::new(ChunkingConfig::default()));
        let pipeline = ExtractionPipeline::new(
            Arc::clone(&index),
            Arc::new(MemoryDocumentStore::new()),
            None,
            TableConfig::default(),
            EntityConfig::default(),
            ChunkingConfig::default(),
            &ProcessingConfig::default(),
        );
        (pipeline, index)
    }

    fn document() -> Document {
        let mut doc = Document::new(
            "fund.pdf".to_string(),
            &LanguageHint::Auto,
            "hash".to_string(),
        );
        doc.pages.push(Page::ok(
            1,
            "ISIN: US0378331005 Apple Inc. 1000 shares at $178.25".to_string(),
            0.97,
        ));
        doc.pages.push(Page::ok(
            2,
            "Security      Qty     Price\nApple Inc     100     178.25\nBond B        50      99.10"
                .to_string(),
            0.92,
        ));
        doc.pages.push(Page::failed(3, "scanner jam".to_string()));
        doc.metadata.page_count = 3;
        doc.status = DocumentStatus::Extracted;
        doc
    }

    #[tokio::test]
    async fn pipeline_extracts_and_indexes() {
        let (pipeline, index) = pipeline();
        let doc = document();
        let id = doc.id;

        let report = pipeline.process(doc).await.unwrap();

        assert_eq!(report.pages_total, 3);
        assert_eq!(report.pages_ok, 2);
        assert_eq!(report.pages_failed, 1);
        assert_eq!(report.isins, 1);
        assert_eq!(report.tables, 1);
        assert!(!report.cancelled);

        let indexed = index.get(&id).unwrap();
        assert_eq!(indexed.document.status, DocumentStatus::Indexed);
        assert_eq!(indexed.isins[0].code, "US0378331005");
        assert_eq!(indexed.tables[0].page_number, 2);
    }

    #[tokio::test]
    async fn cancelled_run_still_indexes_completed_pages() {
        let (pipeline, index) = pipeline();
        let doc = document();
        let id = doc.id;

        let cancel = CancelFlag::new();
        cancel.cancel();
        let report = pipeline.process_with_cancel(doc, &cancel).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.pages_ok, 0);
        assert_eq!(report.pages_skipped, 2);
        assert!(index.get(&id).is_some());
    }

    #[tokio::test]
    async fn document_without_usable_pages_is_marked_failed() {
        let index = Arc::new(DocumentIndex::new(ChunkingConfig::default()));
        let store = Arc::new(MemoryDocumentStore::new());
        let pipeline = ExtractionPipeline::new(
            Arc::clone(&index),
            store.clone(),
            None,
            TableConfig::default(),
            EntityConfig::default(),
            ChunkingConfig::default(),
            &ProcessingConfig::default(),
        );

        let mut doc = Document::new(
            "burned.pdf".to_string(),
            &LanguageHint::Auto,
            "h".to_string(),
        );
        doc.pages.push(Page::failed(1, "unreadable".to_string()));
        let id = doc.id;

        let err = pipeline.process(doc).await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));

        let stored = store.get_document(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Failed);
        assert!(index.get(&id).is_none());
    }

    #[tokio::test]
    async fn delete_removes_document_everywhere() {
        let (pipeline, index) = pipeline();
        let doc = document();
        let id = doc.id;
        pipeline.process(doc).await.unwrap();

        assert!(pipeline.delete_document(&id).await.unwrap());
        assert!(index.get(&id).is_none());
        assert!(matches!(
            pipeline.delete_document(&id).await.unwrap_err(),
            Error::DocumentNotFound(_)
        ));
    }
}
