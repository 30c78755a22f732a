//! Extractor trait for the external text-extraction capability.
//!
//! The orchestrator only ever talks to models through this trait, so any
//! provider (Gemini, an OpenAI-compatible endpoint, a scripted mock) can
//! be plugged in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ExtractorResult;
use crate::pipeline::prompts::PromptConfig;
use crate::types::candidate::Span;

/// One call to the extraction capability.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    /// Source document text
    pub text: &'a str,

    /// Instruction text and few-shot examples
    pub prompt: &'a PromptConfig,

    /// Concrete model id, e.g. `gemini-1.5-pro`
    pub model_id: &'a str,

    /// Chunk size hint in characters
    pub max_char_buffer: usize,

    /// Chunk parallelism hint
    pub max_workers: usize,
}

/// A single extraction emitted by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub extraction_text: String,

    /// Free-form attributes; usually includes a `confidence` float
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub spans: Vec<Span>,
}

impl ExtractionRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            extraction_text: text.into(),
            attributes: HashMap::new(),
            spans: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.attributes
            .insert("confidence".to_string(), serde_json::json!(confidence));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }
}

/// Result of a successful extraction call. May hold zero records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub extractions: Vec<ExtractionRecord>,
}

impl ExtractionResult {
    pub fn new(extractions: Vec<ExtractionRecord>) -> Self {
        Self { extractions }
    }

    pub fn is_empty(&self) -> bool {
        self.extractions.is_empty()
    }
}

/// External text-extraction capability.
///
/// Implementations should return [`ExtractorError::Transient`] for
/// network failures, timeouts, rate limits and server errors, and
/// [`ExtractorError::EmptyResponse`] when the model answered with nothing
/// usable. The orchestrator retries the former and abandons the model on
/// the latter.
///
/// [`ExtractorError::Transient`]: crate::error::ExtractorError::Transient
/// [`ExtractorError::EmptyResponse`]: crate::error::ExtractorError::EmptyResponse
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> ExtractorResult<ExtractionResult>;
}
