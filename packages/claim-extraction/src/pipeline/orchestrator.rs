//! Model fallback chain with circuit breaking, retry, and regex fallback.
//!
//! For each tier in the chain (selected tier first, then the other):
//! take a breaker permit, run the extractor under bounded retry, and stop
//! at the first model that returns candidates. If every model is
//! exhausted the deterministic [`FallbackExtractor`] runs. Only empty
//! input and cancellation surface as errors.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::circuit_breaker::CircuitBreaker;
use super::fallback::FallbackExtractor;
use super::prompts::PromptConfig;
use super::retry::{retry_with_backoff, RetryError};
use crate::error::{ExtractionError, Result};
use crate::traits::extractor::{ExtractionRequest, Extractor};
use crate::traits::usage::{NoopUsageRecorder, UsageRecorder};
use crate::types::candidate::Candidate;
use crate::types::config::OrchestratorConfig;
use crate::types::model::{ExtractionMethod, ModelTier};

/// Per-request identity and cancellation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub cancel: CancellationToken,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// New context with a time-ordered request id.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::now_v7().to_string(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// What happened when one model in the chain was tried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded { records: usize },
    /// The call succeeded but returned no records
    NoRecords,
    /// The breaker rejected the call; no retries consumed
    CircuitOpen,
    EmptyResponse,
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelAttempt {
    pub tier: ModelTier,
    pub model_id: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Raw candidates plus provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub candidates: Vec<Candidate>,
    pub method: ExtractionMethod,
    /// Model id that produced the candidates; `None` for the fallback
    pub model_id: Option<String>,
    pub attempts: Vec<ModelAttempt>,
}

/// Drives the model fallback chain.
pub struct ExtractionOrchestrator {
    extractor: Arc<dyn Extractor>,
    breaker: Arc<CircuitBreaker>,
    usage: Arc<dyn UsageRecorder>,
    fallback: FallbackExtractor,
    config: OrchestratorConfig,
}

impl ExtractionOrchestrator {
    /// The breaker is shared state: pass the same `Arc` to every
    /// orchestrator in the process.
    pub fn new(extractor: Arc<dyn Extractor>, breaker: Arc<CircuitBreaker>) -> Self {
        let config = OrchestratorConfig::default();
        Self {
            extractor,
            breaker,
            usage: Arc::new(NoopUsageRecorder),
            fallback: FallbackExtractor::new(config.fallback_confidence, config.fallback_min_chars),
            config,
        }
    }

    pub fn with_usage_recorder(mut self, usage: Arc<dyn UsageRecorder>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.fallback = FallbackExtractor::new(config.fallback_confidence, config.fallback_min_chars);
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Extract raw candidates, starting with `tier`.
    ///
    /// Fails only on empty input or cancellation; every other failure
    /// degrades to the regex fallback, which may return zero candidates.
    pub async fn extract(
        &self,
        text: &str,
        tier: ModelTier,
        prompt: &PromptConfig,
        ctx: &RequestContext,
    ) -> Result<ExtractionOutcome> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyInput);
        }
        if ctx.cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let mut attempts = Vec::with_capacity(2);

        for tier in tier.fallback_chain() {
            let model_id = self.config.models.get(tier);

            let permit = match self.breaker.acquire() {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        model = model_id,
                        retry_in_ms = e.retry_in_ms,
                        "Circuit breaker open, skipping model"
                    );
                    attempts.push(attempt(tier, model_id, AttemptOutcome::CircuitOpen));
                    continue;
                }
            };

            let request = ExtractionRequest {
                text,
                prompt,
                model_id,
                max_char_buffer: self.config.max_char_buffer,
                max_workers: self.config.max_workers,
            };
            let extractor = self.extractor.as_ref();
            let request = &request;

            tracing::debug!(
                request_id = %ctx.request_id,
                model = model_id,
                prompt_version = %prompt.version,
                "Attempting extraction"
            );

            let result = retry_with_backoff(&self.config.retry, &ctx.cancel, model_id, move |_| {
                extractor.extract(request)
            })
            .await;

            match result {
                Ok(result) if result.is_empty() => {
                    permit.record_success();
                    tracing::info!(
                        request_id = %ctx.request_id,
                        model = model_id,
                        "Model returned no extractions, trying next model"
                    );
                    attempts.push(attempt(tier, model_id, AttemptOutcome::NoRecords));
                }
                Ok(result) => {
                    permit.record_success();
                    let candidates: Vec<Candidate> = result
                        .extractions
                        .into_iter()
                        .map(Candidate::from_record)
                        .collect();

                    self.usage
                        .record_usage(&ctx.request_id, &prompt.description, model_id);

                    tracing::info!(
                        request_id = %ctx.request_id,
                        model = model_id,
                        count = candidates.len(),
                        "Extraction succeeded"
                    );
                    attempts.push(attempt(
                        tier,
                        model_id,
                        AttemptOutcome::Succeeded {
                            records: candidates.len(),
                        },
                    ));
                    return Ok(ExtractionOutcome {
                        candidates,
                        method: ExtractionMethod::Llm(tier),
                        model_id: Some(model_id.to_string()),
                        attempts,
                    });
                }
                Err(RetryError::Cancelled) => {
                    drop(permit);
                    tracing::info!(request_id = %ctx.request_id, "Extraction cancelled");
                    return Err(ExtractionError::Cancelled);
                }
                Err(RetryError::NonRetryable(e)) => {
                    permit.record_failure();
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        model = model_id,
                        error = %e,
                        "Empty response, trying next model"
                    );
                    attempts.push(attempt(tier, model_id, AttemptOutcome::EmptyResponse));
                }
                Err(RetryError::Exhausted { attempts: n, last }) => {
                    permit.record_failure();
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        model = model_id,
                        attempts = n,
                        error = %last,
                        "Model failed after retries, trying next model"
                    );
                    attempts.push(attempt(
                        tier,
                        model_id,
                        AttemptOutcome::Exhausted { attempts: n },
                    ));
                }
            }
        }

        tracing::warn!(
            request_id = %ctx.request_id,
            "All models failed, using regex fallback"
        );
        Ok(ExtractionOutcome {
            candidates: self.fallback.extract(text),
            method: ExtractionMethod::RegexFallback,
            model_id: None,
            attempts,
        })
    }
}

fn attempt(tier: ModelTier, model_id: &str, outcome: AttemptOutcome) -> ModelAttempt {
    ModelAttempt {
        tier,
        model_id: model_id.to_string(),
        outcome,
    }
}
