//! Context chunks: the retrievable unit for question answering

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{FinancialMetric, IsinRecord};

/// A span of page text plus the entities overlapping it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextChunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Page the span came from, 1-based
    pub page_number: u32,
    /// Text content
    pub text: String,
    /// Character position within the page text
    pub char_start: usize,
    pub char_end: usize,
    /// Embedding vector; empty when no embedding provider is configured
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// ISINs whose context overlaps this span
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub isins: Vec<IsinRecord>,
    /// Metrics whose value token falls within this span
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<FinancialMetric>,
}

impl ContextChunk {
    /// Create a new chunk for a page span
    pub fn new(
        document_id: Uuid,
        page_number: u32,
        text: String,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            page_number,
            text,
            char_start,
            char_end,
            embedding: Vec::new(),
            isins: Vec::new(),
            metrics: Vec::new(),
        }
    }

    /// Snippet for source citations, trimmed to a word boundary
    pub fn snippet(&self, max_len: usize) -> String {
        if self.text.len() <= max_len {
            return self.text.clone();
        }
        let mut end = max_len;
        while end > 0 && !self.text.is_char_boundary(end) {
            end -= 1;
        }
        match self.text[..end].rfind(' ') {
            Some(pos) if pos > 0 => format!("{}...", &self.text[..pos]),
            _ => format!("{}...", &self.text[..end]),
        }
    }
}

/// A chunk paired with its relevance score for a query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: ContextChunk,
    /// Relevance score; cosine similarity or normalized term overlap
    pub score: f32,
}
