//! Extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Model tier selection from document complexity
//! - Prompt version selection (weighted A/B)
//! - Model fallback chain with circuit breaking and retry
//! - Deterministic regex fallback
//! - Validation and classification of candidates

pub mod assemble;
pub mod circuit_breaker;
pub mod claim_pipeline;
pub mod complexity;
pub mod fallback;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod retry;

pub use assemble::{adjusted_confidence, AssembledClaims, ConfidenceBands, RejectedCandidate, ResultAssembler};
pub use circuit_breaker::{CircuitBreaker, CircuitPermit, CircuitSnapshot, CircuitState};
pub use claim_pipeline::{ClaimPipeline, PipelineReport, RunOptions};
pub use complexity::{ComplexityAnalysis, ModelSelector};
pub use fallback::FallbackExtractor;
pub use orchestrator::{
    AttemptOutcome, ExtractionOrchestrator, ExtractionOutcome, ModelAttempt, RequestContext,
};
pub use planner::{PromptPlan, PromptPlanner};
pub use prompts::{
    PromptConfig, PromptExample, PromptVersionSelector, RandomSource, SeededRandom, ThreadRandom,
    V1_BASIC_PROMPT, V2_ENHANCED_PROMPT, V3_CONTEXT_AWARE_PROMPT, V4_REGULATORY_PROMPT,
};
pub use retry::{retry_with_backoff, RetryError};
