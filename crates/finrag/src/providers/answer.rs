//! Answer-generation provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{HistoryMessage, ScoredChunk};

/// Trait for generating answers from retrieved context
///
/// All backends share this contract; the extractive fallback is one concrete
/// variant, not a special-cased code path.
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Generate an answer given a question, ranked context chunks, and the
    /// tail of the conversation history
    async fn generate(
        &self,
        question: &str,
        context: &[ScoredChunk],
        history: &[HistoryMessage],
    ) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
