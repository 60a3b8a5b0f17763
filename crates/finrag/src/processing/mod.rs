//! Page-parallel extraction pipeline

pub mod pipeline;

pub use pipeline::{ExtractionPipeline, PipelineReport};
