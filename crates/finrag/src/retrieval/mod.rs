//! Chunk retrieval: embedding similarity with term-overlap fallback

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::generation::query_terms;
use crate::index::IndexedDocument;
use crate::providers::EmbeddingProvider;
use crate::types::ScoredChunk;

/// Ranks context chunks for a query across a session's documents
pub struct Retriever {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    config: RetrievalConfig,
}

impl Retriever {
    /// Create a retriever. Without an embedding provider, ranking falls
    /// back to term overlap from the document index.
    pub fn new(config: RetrievalConfig, embedder: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self { embedder, config }
    }

    /// Retrieve the top-K chunks for a query, most relevant first, bounded
    /// by the configured context budget
    pub async fn retrieve(
        &self,
        query: &str,
        documents: &[Arc<IndexedDocument>],
    ) -> Result<Vec<ScoredChunk>> {
        let mut scored = match self.embedding_scores(query, documents).await {
            Some(scores) => scores,
            None => self.term_overlap_scores(query, documents),
        };

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
                .then_with(|| a.chunk.page_number.cmp(&b.chunk.page_number))
                .then_with(|| a.chunk.char_start.cmp(&b.chunk.char_start))
        });
        scored.truncate(self.config.top_k);

        Ok(self.apply_budget(scored))
    }

    /// Cosine ranking over chunk embeddings. Returns None when no provider
    /// is configured, no chunk carries an embedding, or the embed call
    /// fails; the caller then uses the term index.
    async fn embedding_scores(
        &self,
        query: &str,
        documents: &[Arc<IndexedDocument>],
    ) -> Option<Vec<ScoredChunk>> {
        let embedder = self.embedder.as_ref()?;

        let any_embedded = documents
            .iter()
            .any(|d| d.chunks.iter().any(|c| !c.embedding.is_empty()));
        if !any_embedded {
            return None;
        }

        let query_embedding = match embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("query embedding failed, falling back to term overlap: {}", e);
                return None;
            }
        };

        let mut scored = Vec::new();
        for document in documents {
            for chunk in &document.chunks {
                if chunk.embedding.is_empty() {
                    continue;
                }
                let score = cosine_similarity(&query_embedding, &chunk.embedding);
                if score > 0.0 {
                    scored.push(ScoredChunk {
                        chunk: chunk.clone(),
                        score,
                    });
                }
            }
        }
        Some(scored)
    }

    fn term_overlap_scores(
        &self,
        query: &str,
        documents: &[Arc<IndexedDocument>],
    ) -> Vec<ScoredChunk> {
        let terms = query_terms(query);
        let mut scored = Vec::new();

        for document in documents {
            for (i, chunk) in document.chunks.iter().enumerate() {
                let score = document.term_overlap_score(i, &terms);
                if score > 0.0 {
                    scored.push(ScoredChunk {
                        chunk: chunk.clone(),
                        score,
                    });
                }
            }
        }
        scored
    }

    /// Keep chunks within the context budget, truncating the chunk that
    /// crosses it and dropping the rest
    fn apply_budget(&self, scored: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let budget = self.config.max_context_chars;
        let mut used = 0usize;
        let mut kept = Vec::new();

        for mut entry in scored {
            if used >= budget {
                break;
            }
            let remaining = budget - used;
            if entry.chunk.text.len() > remaining {
                let mut cut = remaining;
                while cut > 0 && !entry.chunk.text.is_char_boundary(cut) {
                    cut -= 1;
                }
                if cut == 0 {
                    break;
                }
                entry.chunk.text.truncate(cut);
            }
            used += entry.chunk.text.len();
            kept.push(entry);
        }

        kept
    }
}

/// Cosine similarity of two vectors; 0.0 when dimensions mismatch
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::index::DocumentIndex;
    use crate::types::{Document, LanguageHint, Page, PageEntities};

    fn indexed(text_by_page: &[&str]) -> Arc<IndexedDocument> {
        let mut document = Document::new(
            "doc.pdf".to_string(),
            &LanguageHint::Auto,
            "h".to_string(),
        );
        for (i, text) in text_by_page.iter().enumerate() {
            document
                .pages
                .push(Page::ok(i as u32 + 1, text.to_string(), 0.9));
        }
        let entities = vec![PageEntities::default(); text_by_page.len()];
        DocumentIndex::new(ChunkingConfig::default()).index(document, Vec::new(), entities)
    }

    #[tokio::test]
    async fn term_overlap_ranks_matching_page_first() {
        let doc = indexed(&[
            "Total Assets: $1,500,000 reported for the fund",
            "Weather was pleasant throughout the quarter",
        ]);
        let retriever = Retriever::new(RetrievalConfig::default(), None);

        let results = retriever
            .retrieve("what is the total assets", &[doc])
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.page_number, 1);
    }

    #[tokio::test]
    async fn no_match_returns_empty() {
        let doc = indexed(&["alpha beta gamma"]);
        let retriever = Retriever::new(RetrievalConfig::default(), None);
        let results = retriever.retrieve("zeppelin", &[doc]).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn budget_truncates_context() {
        let long_page = "assets ".repeat(400);
        let doc = indexed(&[long_page.as_str()]);
        let config = RetrievalConfig {
            top_k: 10,
            max_context_chars: 100,
        };
        let retriever = Retriever::new(config, None);

        let results = retriever.retrieve("assets", &[doc]).await.unwrap();
        let total: usize = results.iter().map(|r| r.chunk.text.len()).sum();
        assert!(total <= 100);
        assert!(!results.is_empty());
    }

    #[test]
    fn cosine_basics() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
