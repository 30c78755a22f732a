//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the claim extraction
//! library without making real model calls.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ExtractorError, ExtractorResult};
use crate::pipeline::prompts::RandomSource;
use crate::traits::extractor::{ExtractionRequest, ExtractionResult, Extractor};
use crate::traits::usage::UsageRecorder;
use crate::types::model::PromptVersion;

/// A scripted extractor for testing.
///
/// Responses are queued per model id. Each call pops the front of the
/// queue; the last response stays in place and is repeated. Models with
/// no script answer with an empty-response error.
#[derive(Default)]
pub struct MockExtractor {
    /// Scripted responses by model id
    responses: Arc<RwLock<HashMap<String, VecDeque<ExtractorResult<ExtractionResult>>>>>,

    /// Simulated latency per call
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockExtractorCall>>>,
}

/// Record of a call made to the mock extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockExtractorCall {
    pub model_id: String,
    pub text_len: usize,
    pub prompt_version: PromptVersion,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response for a model.
    pub fn with_response(self, model_id: impl Into<String>, result: ExtractionResult) -> Self {
        self.push(model_id.into(), Ok(result));
        self
    }

    /// Queue a failure for a model.
    pub fn with_error(self, model_id: impl Into<String>, error: ExtractorError) -> Self {
        self.push(model_id.into(), Err(error));
        self
    }

    /// Sleep this long (on the tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn push(&self, model_id: String, response: ExtractorResult<ExtractionResult>) {
        self.responses
            .write()
            .unwrap()
            .entry(model_id)
            .or_default()
            .push_back(response);
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockExtractorCall> {
        self.calls.read().unwrap().clone()
    }

    /// Model ids in call order.
    pub fn models_called(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .map(|c| c.model_id.clone())
            .collect()
    }

    pub fn calls_for(&self, model_id: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.model_id == model_id)
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn next_response(&self, model_id: &str) -> ExtractorResult<ExtractionResult> {
        let mut responses = self.responses.write().unwrap();
        match responses.get_mut(model_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Err(ExtractorError::empty_response(model_id, "no scripted response")),
        }
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> ExtractorResult<ExtractionResult> {
        self.calls.write().unwrap().push(MockExtractorCall {
            model_id: request.model_id.to_string(),
            text_len: request.text.len(),
            prompt_version: request.prompt.version,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.next_response(request.model_id)
    }
}

/// Random source that always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(f64);

impl FixedRandom {
    pub fn new(draw: f64) -> Self {
        Self(draw)
    }
}

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        self.0
    }
}

/// Random source that cycles through a fixed list of draws.
#[derive(Debug)]
pub struct SequenceRandom {
    draws: Vec<f64>,
    next: AtomicUsize,
}

impl SequenceRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        let draws: Vec<f64> = draws.into_iter().collect();
        assert!(!draws.is_empty(), "SequenceRandom needs at least one draw");
        Self {
            draws,
            next: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&self) -> f64 {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.draws[i % self.draws.len()]
    }
}

/// One recorded usage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub request_id: String,
    pub prompt_text: String,
    pub model_id: String,
}

/// Usage recorder that keeps every call for assertions.
#[derive(Debug, Default)]
pub struct RecordingUsageRecorder {
    records: RwLock<Vec<UsageRecord>>,
}

impl RecordingUsageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.read().unwrap().clone()
    }
}

impl UsageRecorder for RecordingUsageRecorder {
    fn record_usage(&self, request_id: &str, prompt_text: &str, model_id: &str) {
        self.records.write().unwrap().push(UsageRecord {
            request_id: request_id.to_string(),
            prompt_text: prompt_text.to_string(),
            model_id: model_id.to_string(),
        });
    }
}
