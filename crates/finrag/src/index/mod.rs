//! Document index: aggregated extraction output in queryable form
//!
//! Aggregates a document's pages, tables, and entities, builds the context
//! chunks used for retrieval, and maintains a term-frequency index over
//! page text as the fallback relevance signal. Re-indexing a document
//! replaces its entry wholesale.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::generation::terms::page_terms;
use crate::types::{
    AmountMention, ContextChunk, DateMention, Document, DocumentRecord, FinancialMetric,
    IsinRecord, PageEntities, TableCandidate,
};

/// A fully indexed document
pub struct IndexedDocument {
    /// The owning document aggregate
    pub document: Document,
    /// Reconstructed tables across all pages
    pub tables: Vec<TableCandidate>,
    /// Validated ISINs across all pages
    pub isins: Vec<IsinRecord>,
    /// Date mentions across all pages
    pub dates: Vec<DateMention>,
    /// Amount mentions across all pages
    pub amounts: Vec<AmountMention>,
    /// Metric tags across all pages
    pub metrics: Vec<FinancialMetric>,
    /// Retrieval chunks with attached entities
    pub chunks: Vec<ContextChunk>,
    /// Term counts per chunk, parallel to `chunks`
    chunk_terms: Vec<HashMap<String, u32>>,
}

impl IndexedDocument {
    /// Build from a document and its per-page extraction output
    pub fn build(
        document: Document,
        tables: Vec<TableCandidate>,
        entities: Vec<PageEntities>,
        chunking: &ChunkingConfig,
    ) -> Self {
        let mut isins = Vec::new();
        let mut dates = Vec::new();
        let mut amounts = Vec::new();
        let mut metrics = Vec::new();
        for page_entities in entities {
            isins.extend(page_entities.isins);
            dates.extend(page_entities.dates);
            amounts.extend(page_entities.amounts);
            metrics.extend(page_entities.metrics);
        }

        let chunks = build_chunks(&document, &isins, &metrics, chunking);
        let chunk_terms = chunks.iter().map(|c| term_counts(&c.text)).collect();

        Self {
            document,
            tables,
            isins,
            dates,
            amounts,
            metrics,
            chunks,
            chunk_terms,
        }
    }

    /// Chunks covering a page
    pub fn chunks_for_page(&self, page_number: u32) -> impl Iterator<Item = &ContextChunk> {
        self.chunks.iter().filter(move |c| c.page_number == page_number)
    }

    /// Tables on a page
    pub fn tables_for_page(&self, page_number: u32) -> impl Iterator<Item = &TableCandidate> {
        self.tables.iter().filter(move |t| t.page_number == page_number)
    }

    /// All tags for a normalized metric key
    pub fn metrics_for_key(&self, metric_key: &str) -> Vec<&FinancialMetric> {
        self.metrics
            .iter()
            .filter(|m| m.metric_key == metric_key)
            .collect()
    }

    /// Pages whose text contains the term, from the term index
    pub fn pages_with_term(&self, term: &str) -> Vec<u32> {
        let term = term.to_lowercase();
        let mut pages: Vec<u32> = self
            .chunks
            .iter()
            .zip(&self.chunk_terms)
            .filter(|(_, counts)| counts.contains_key(&term))
            .map(|(chunk, _)| chunk.page_number)
            .collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// Term-overlap score for a chunk against pre-tokenized query terms.
    /// Distinct matched terms dominate; total frequency breaks ties.
    pub fn term_overlap_score(&self, chunk_index: usize, query_terms: &[String]) -> f32 {
        let counts = match self.chunk_terms.get(chunk_index) {
            Some(c) => c,
            None => return 0.0,
        };
        let total: u32 = counts.values().sum();
        if total == 0 || query_terms.is_empty() {
            return 0.0;
        }

        let mut matched = 0u32;
        let mut frequency = 0u32;
        for term in query_terms {
            if let Some(&count) = counts.get(term) {
                matched += 1;
                frequency += count;
            }
        }
        if matched == 0 {
            return 0.0;
        }

        matched as f32 / query_terms.len() as f32
            + frequency as f32 / (10.0 * (1.0 + total as f32))
    }

    /// The persisted boundary record for this document
    pub fn to_record(&self) -> DocumentRecord {
        DocumentRecord::from_extraction(&self.document, &self.tables, &self.isins, &self.metrics)
    }
}

fn term_counts(text: &str) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for term in page_terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

/// Split usable pages into overlapping chunks on line boundaries and attach
/// the entities whose provenance window overlaps each span
fn build_chunks(
    document: &Document,
    isins: &[IsinRecord],
    metrics: &[FinancialMetric],
    chunking: &ChunkingConfig,
) -> Vec<ContextChunk> {
    let mut chunks = Vec::new();

    for page in document.usable_pages() {
        let text = &page.raw_text;
        let spans = chunk_spans(text, chunking);

        for (start, end) in spans {
            let mut chunk = ContextChunk::new(
                document.id,
                page.page_number,
                text[start..end].to_string(),
                start,
                end,
            );

            for isin in isins.iter().filter(|i| i.page_number == page.page_number) {
                if let Some(pos) = text.find(&isin.code) {
                    if pos < end && pos + isin.code.len() > start {
                        chunk.isins.push(isin.clone());
                    }
                }
            }
            for metric in metrics.iter().filter(|m| m.page_number == page.page_number) {
                if let Some(pos) = text.find(&metric.context) {
                    if pos < end && pos + metric.context.len() > start {
                        chunk.metrics.push(metric.clone());
                    }
                }
            }

            chunks.push(chunk);
        }
    }

    chunks
}

/// Chunk spans over page text: line-aligned, `chunk_size` target with
/// `chunk_overlap` carried between consecutive chunks
fn chunk_spans(text: &str, chunking: &ChunkingConfig) -> Vec<(usize, usize)> {
    if text.len() <= chunking.chunk_size {
        return vec![(0, text.len())];
    }

    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < text.len() {
        let mut target = (start + chunking.chunk_size).min(text.len());
        while target < text.len() && !text.is_char_boundary(target) {
            target += 1;
        }
        let end = if target == text.len() {
            target
        } else {
            // Extend to the next line break so spans stay line-aligned
            match text[target..].find('\n') {
                Some(offset) => target + offset + 1,
                None => text.len(),
            }
        };

        spans.push((start, end));
        if end == text.len() {
            break;
        }

        let mut next = end.saturating_sub(chunking.chunk_overlap);
        while next > 0 && !text.is_char_boundary(next) {
            next -= 1;
        }
        // Begin the overlap at a line start where possible
        if let Some(line_start) = text[..next].rfind('\n') {
            next = line_start + 1;
        }
        if next <= start {
            next = end;
        }
        start = next;
    }

    spans.retain(|(s, e)| text[*s..*e].trim().len() >= chunking.min_chunk_size);
    if spans.is_empty() {
        spans.push((0, text.len()));
    }
    spans
}

/// Concurrent registry of indexed documents. Reads are lock-free; indexing
/// a document id replaces its entry atomically.
#[derive(Default)]
pub struct DocumentIndex {
    documents: DashMap<Uuid, Arc<IndexedDocument>>,
    chunking: ChunkingConfig,
}

impl DocumentIndex {
    /// Create an empty index
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self {
            documents: DashMap::new(),
            chunking,
        }
    }

    /// Index a document with its extraction output, replacing any previous
    /// entry for the same id
    pub fn index(
        &self,
        document: Document,
        tables: Vec<TableCandidate>,
        entities: Vec<PageEntities>,
    ) -> Arc<IndexedDocument> {
        let indexed = Arc::new(IndexedDocument::build(
            document,
            tables,
            entities,
            &self.chunking,
        ));
        self.documents.insert(indexed.document.id, Arc::clone(&indexed));
        tracing::info!(
            document_id = %indexed.document.id,
            chunks = indexed.chunks.len(),
            isins = indexed.isins.len(),
            metrics = indexed.metrics.len(),
            "document indexed"
        );
        indexed
    }

    /// Replace an entry with an already-built indexed document (used after
    /// chunk embedding)
    pub fn insert(&self, indexed: Arc<IndexedDocument>) {
        self.documents.insert(indexed.document.id, indexed);
    }

    /// Fetch an indexed document
    pub fn get(&self, id: &Uuid) -> Option<Arc<IndexedDocument>> {
        self.documents.get(id).map(|e| Arc::clone(e.value()))
    }

    /// Remove a document from the index. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.documents.remove(id).is_some()
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
