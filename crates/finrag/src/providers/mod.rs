//! Provider abstractions for OCR, embeddings, and answer generation
//!
//! Trait-based collaborator interfaces selected at construction time, never
//! by patching shared state.

pub mod answer;
pub mod embedding;
pub mod extractive;
pub mod ocr;
pub mod ollama;

pub use answer::AnswerProvider;
pub use embedding::EmbeddingProvider;
pub use extractive::ExtractiveAnswerer;
pub use ocr::{OcrProvider, PageOcrRequest, PageText};
pub use ollama::{OllamaAnswerer, OllamaClient, OllamaEmbedder};
