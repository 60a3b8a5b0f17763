//! Extractive answer provider
//!
//! The degraded mode: synthesizes an answer purely from the extracted
//! entities and tables in the retrieved chunks, with no free-text
//! generation. Used standalone in provider-less deployments and as the
//! fallback arm when the configured provider stays unreachable.

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::query_terms;
use crate::types::{HistoryMessage, ScoredChunk};

use super::answer::AnswerProvider;

/// Answer provider that only reports extracted facts
#[derive(Debug, Default)]
pub struct ExtractiveAnswerer;

impl ExtractiveAnswerer {
    pub fn new() -> Self {
        Self
    }

    /// Facts in `chunks` whose metric key or entity text matches the query
    /// terms, one line per fact
    fn matching_facts(question: &str, chunks: &[ScoredChunk]) -> Vec<String> {
        let terms = query_terms(question);
        let mut lines = Vec::new();

        for scored in chunks {
            let chunk = &scored.chunk;

            for metric in &chunk.metrics {
                let key_words: Vec<&str> = metric.metric_key.split('_').collect();
                let matched = key_words.iter().any(|w| terms.iter().any(|t| t == w));
                if matched {
                    lines.push(format!(
                        "{}: {} (page {})",
                        metric.metric_key, metric.raw_value_text, chunk.page_number
                    ));
                }
            }

            let wants_isins = terms.iter().any(|t| t == "isin" || t == "isins" || t == "security" || t == "securities");
            if wants_isins {
                for isin in &chunk.isins {
                    lines.push(format!("ISIN {} (page {})", isin.code, chunk.page_number));
                }
            }
        }

        lines.dedup();
        lines
    }
}

#[async_trait]
impl AnswerProvider for ExtractiveAnswerer {
    async fn generate(
        &self,
        question: &str,
        context: &[ScoredChunk],
        _history: &[HistoryMessage],
    ) -> Result<String> {
        let facts = Self::matching_facts(question, context);

        if facts.is_empty() {
            return Ok(
                "No extracted facts in the indexed documents match this query.".to_string(),
            );
        }

        Ok(format!(
            "Extracted facts matching the query:\n{}",
            facts.join("\n")
        ))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "extractive"
    }

    fn model(&self) -> &str {
        "extractive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextChunk, FinancialMetric, MetricUnit};
    use uuid::Uuid;

    fn chunk_with_metric() -> ScoredChunk {
        let mut chunk = ContextChunk::new(
            Uuid::new_v4(),
            1,
            "Total Assets: $1,500,000".to_string(),
            0,
            24,
        );
        chunk.metrics.push(FinancialMetric {
            metric_key: "total_assets".to_string(),
            raw_value_text: "$1,500,000".to_string(),
            parsed_numeric_value: Some(1_500_000.0),
            unit: MetricUnit::Currency,
            page_number: 1,
            context: "Total Assets: $1,500,000".to_string(),
        });
        ScoredChunk { chunk, score: 1.0 }
    }

    #[tokio::test]
    async fn reports_matching_metric_with_page() {
        let answerer = ExtractiveAnswerer::new();
        let answer = answerer
            .generate("what is the total assets", &[chunk_with_metric()], &[])
            .await
            .unwrap();

        assert!(answer.contains("total_assets: $1,500,000 (page 1)"));
    }

    #[tokio::test]
    async fn no_match_is_explicit() {
        let answerer = ExtractiveAnswerer::new();
        let answer = answerer
            .generate("portfolio yield?", &[chunk_with_metric()], &[])
            .await
            .unwrap();

        assert!(answer.contains("No extracted facts"));
    }
}
