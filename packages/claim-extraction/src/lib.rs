//! Regulatory Claim Extraction Library
//!
//! Extracts regulatory claims from pharmaceutical documents and filters them
//! with a rule-based three-question test.
//!
//! # Design Philosophy
//!
//! **"Availability over precision"**
//!
//! - Model calls go through a fallback chain, a shared circuit breaker and
//!   bounded retry
//! - When every model fails a deterministic regex scan still returns candidates
//! - Only empty input and cancellation are errors
//! - Rule data is swappable without code changes
//!
//! # Usage
//!
//! ```rust,ignore
//! use claim_extraction::{CircuitBreaker, ClaimPipeline, RunOptions};
//! use claim_extraction::testing::MockExtractor;
//!
//! let extractor = Arc::new(MockExtractor::new());
//! let pipeline = ClaimPipeline::new(extractor, Arc::new(CircuitBreaker::default()));
//!
//! let report = pipeline.run(&document_text, RunOptions::new()).await?;
//! for claim in &report.claims {
//!     println!("{:?} {:.2} {}", claim.claim_type, claim.confidence, claim.text);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Extraction capability and usage recording seams
//! - [`types`] - Claims, candidates, model tiers and configuration
//! - [`validation`] - Pattern library, validator and classifier
//! - [`pipeline`] - Planning, orchestration and assembly
//! - [`usage`] - Token and cost accounting
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;
pub mod usage;
pub mod validation;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{
    CircuitOpenError, ExtractionError, ExtractorError, ExtractorResult, FailureKind, PatternError,
    Result,
};
pub use traits::{
    extractor::{ExtractionRecord, ExtractionRequest, ExtractionResult, Extractor},
    usage::{NoopUsageRecorder, UsageRecorder},
};
pub use types::{
    candidate::{Candidate, Span},
    claim::{ClaimType, ValidatedClaim, ValidationVerdict, WarningKind},
    config::{
        AbTestConfig, CircuitBreakerConfig, ModelIds, ModelSelectorConfig, OrchestratorConfig,
        RetryConfig, ValidatorConfig,
    },
    model::{ExtractionMethod, ModelTier, PromptVersion},
};

// Re-export pipeline components
pub use pipeline::{
    // Facade
    ClaimPipeline, PipelineReport, RunOptions,
    // Planning
    ComplexityAnalysis, ModelSelector, PromptConfig, PromptPlan, PromptPlanner,
    PromptVersionSelector, RandomSource,
    // Orchestration
    CircuitBreaker, CircuitSnapshot, CircuitState, ExtractionOrchestrator, ExtractionOutcome,
    FallbackExtractor, RequestContext,
    // Assembly
    AssembledClaims, ConfidenceBands, RejectedCandidate, ResultAssembler,
};

pub use security::{ExtractorCredentials, SecretString};
pub use usage::{CostTracker, UsageStats};
pub use validation::{ClaimTypeClassifier, ClaimValidator, PatternCategory, PatternLibrary};

#[cfg(feature = "openai")]
pub use ai::OpenAICompatibleExtractor;
