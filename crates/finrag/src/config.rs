//! Configuration for the extraction pipeline and session coordinator

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinragConfig {
    /// OCR adapter configuration
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Table reconstruction configuration
    #[serde(default)]
    pub tables: TableConfig,
    /// Entity extraction configuration
    #[serde(default)]
    pub entities: EntityConfig,
    /// Context chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// LLM / answer provider configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
    /// Page processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Storage backend configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl FinragConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// OCR adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Per-page OCR timeout in seconds
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,
    /// Minimum OCR confidence for a page to count as usable
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

fn default_page_timeout() -> u64 {
    60
}

fn default_min_confidence() -> f32 {
    0.0
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            page_timeout_secs: default_page_timeout(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// Table reconstruction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Minimum whitespace run length that splits a row into cells
    #[serde(default = "default_min_gap")]
    pub min_gap: usize,
    /// Allowed deviation from the block's modal token count
    #[serde(default = "default_token_tolerance")]
    pub token_tolerance: usize,
    /// Fraction of rows that must share a gap offset for a column break
    #[serde(default = "default_column_support")]
    pub column_support: f32,
    /// Candidates below this confidence are discarded
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,
}

fn default_min_gap() -> usize {
    2
}

fn default_token_tolerance() -> usize {
    1
}

fn default_column_support() -> f32 {
    0.6
}

fn default_confidence_floor() -> f32 {
    0.5
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_gap: default_min_gap(),
            token_tolerance: default_token_tolerance(),
            column_support: default_column_support(),
            confidence_floor: default_confidence_floor(),
        }
    }
}

/// Entity extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Characters of surrounding text kept with each match
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Maximum character distance between a metric keyword and its value
    #[serde(default = "default_metric_distance")]
    pub metric_distance: usize,
    /// Keyword sets mapped to normalized metric keys
    #[serde(default = "default_metric_keywords")]
    pub metric_keywords: HashMap<String, Vec<String>>,
}

fn default_context_window() -> usize {
    80
}

fn default_metric_distance() -> usize {
    60
}

fn default_metric_keywords() -> HashMap<String, Vec<String>> {
    let mut map = HashMap::new();
    map.insert("total_assets".to_string(), vec!["total assets".to_string()]);
    map.insert(
        "total_liabilities".to_string(),
        vec!["total liabilities".to_string()],
    );
    map.insert(
        "net_income".to_string(),
        vec!["net income".to_string(), "net profit".to_string()],
    );
    map.insert(
        "revenue".to_string(),
        vec!["total revenue".to_string(), "revenue".to_string()],
    );
    map.insert(
        "portfolio_yield".to_string(),
        vec!["portfolio yield".to_string()],
    );
    map.insert(
        "net_asset_value".to_string(),
        vec!["net asset value".to_string()],
    );
    map
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            metric_distance: default_metric_distance(),
            metric_keywords: default_metric_keywords(),
        }
    }
}

/// Context chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Chunks smaller than this are skipped
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

fn default_chunk_size() -> usize {
    1024
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_min_chunk_size() -> usize {
    50
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Maximum total context size in characters
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_max_context_chars() -> usize {
    8000
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
        }
    }
}

/// LLM / answer provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Embedding dimensions
    pub embed_dimensions: usize,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed provider calls
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds
    pub backoff_base_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "phi3".to_string(),
            embed_dimensions: 768,
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity window after which a session expires, in seconds
    #[serde(default = "default_inactivity")]
    pub inactivity_secs: u64,
    /// Maximum conversational turns retained (history holds 2x this)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Number of history messages passed to the answer provider
    #[serde(default = "default_history_tail")]
    pub history_tail: usize,
}

fn default_inactivity() -> u64 {
    1800
}

fn default_max_turns() -> usize {
    20
}

fn default_history_tail() -> usize {
    6
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_secs: default_inactivity(),
            max_turns: default_max_turns(),
            history_tail: default_history_tail(),
        }
    }
}

/// Page processing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Number of pages processed in parallel (default: CPU count, max 8)
    pub parallel_pages: Option<usize>,
}

impl ProcessingConfig {
    /// Resolve the page worker count
    pub fn page_workers(&self) -> usize {
        self.parallel_pages
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory stores
    #[default]
    Memory,
    /// JSON files under `storage.path`
    File,
}

/// Storage backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selection
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory for the file backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = FinragConfig::default();
        assert_eq!(config.tables.confidence_floor, 0.5);
        assert_eq!(config.session.inactivity_secs, 1800);
        assert!(config.entities.metric_keywords.contains_key("total_assets"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: FinragConfig = toml::from_str(
            r#"
            [session]
            max_turns = 4

            [tables]
            confidence_floor = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.session.max_turns, 4);
        assert_eq!(config.session.inactivity_secs, 1800);
        assert_eq!(config.tables.confidence_floor, 0.7);
        assert_eq!(config.tables.min_gap, 2);
    }
}
