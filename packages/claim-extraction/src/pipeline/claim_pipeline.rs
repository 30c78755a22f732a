//! End-to-end facade: plan, extract, assemble.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::assemble::{ConfidenceBands, RejectedCandidate, ResultAssembler};
use super::circuit_breaker::CircuitBreaker;
use super::orchestrator::{ExtractionOrchestrator, ModelAttempt, RequestContext};
use super::planner::PromptPlanner;
use crate::error::Result;
use crate::traits::extractor::Extractor;
use crate::types::claim::ValidatedClaim;
use crate::types::model::{ExtractionMethod, ModelTier, PromptVersion};

/// Per-run overrides.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub forced_version: Option<PromptVersion>,
    pub forced_tier: Option<ModelTier>,
    pub context: RequestContext,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prompt_version(mut self, version: PromptVersion) -> Self {
        self.forced_version = Some(version);
        self
    }

    pub fn with_model(mut self, tier: ModelTier) -> Self {
        self.forced_tier = Some(tier);
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// Everything a caller needs from one run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub request_id: String,
    pub claims: Vec<ValidatedClaim>,
    pub rejected: Vec<RejectedCandidate>,
    pub bands: ConfidenceBands,
    pub method: ExtractionMethod,
    /// Tier selected for the first attempt
    pub tier: ModelTier,
    pub prompt_version: PromptVersion,
    pub attempts: Vec<ModelAttempt>,
    pub processing_time_ms: u64,
}

/// Planner, orchestrator and assembler wired together.
pub struct ClaimPipeline {
    planner: PromptPlanner,
    orchestrator: ExtractionOrchestrator,
    assembler: ResultAssembler,
}

impl ClaimPipeline {
    /// Pipeline with default planning and assembly over `extractor`.
    pub fn new(extractor: Arc<dyn Extractor>, breaker: Arc<CircuitBreaker>) -> Self {
        Self::from_parts(
            PromptPlanner::default(),
            ExtractionOrchestrator::new(extractor, breaker),
            ResultAssembler::default(),
        )
    }

    pub fn from_parts(
        planner: PromptPlanner,
        orchestrator: ExtractionOrchestrator,
        assembler: ResultAssembler,
    ) -> Self {
        Self {
            planner,
            orchestrator,
            assembler,
        }
    }

    pub fn with_planner(mut self, planner: PromptPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_assembler(mut self, assembler: ResultAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn orchestrator(&self) -> &ExtractionOrchestrator {
        &self.orchestrator
    }

    pub fn assembler(&self) -> &ResultAssembler {
        &self.assembler
    }

    /// Run the full pipeline on one document.
    ///
    /// Fails only on empty input or cancellation.
    pub async fn run(&self, text: &str, options: RunOptions) -> Result<PipelineReport> {
        let started = Instant::now();
        let ctx = options.context;

        let plan = self
            .planner
            .plan(text, options.forced_version, options.forced_tier);
        let outcome = self
            .orchestrator
            .extract(text, plan.tier, &plan.prompt, &ctx)
            .await?;
        let assembled = self.assembler.assemble(outcome.candidates);

        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            request_id = %ctx.request_id,
            method = %outcome.method,
            claims = assembled.claims.len(),
            rejected = assembled.rejected.len(),
            processing_time_ms,
            "Claim extraction complete"
        );

        Ok(PipelineReport {
            request_id: ctx.request_id,
            claims: assembled.claims,
            rejected: assembled.rejected,
            bands: assembled.bands,
            method: outcome.method,
            tier: plan.tier,
            prompt_version: plan.version,
            attempts: outcome.attempts,
            processing_time_ms,
        })
    }
}
