//! Configuration types for validation, model selection, and extraction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::model::{ModelTier, PromptVersion};

/// Thresholds for the claim validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Minimum words for a complete, valid claim.
    ///
    /// Used both by the completeness test and by the validity gate.
    /// Default: 5. Some rule revisions use 4.
    pub min_word_count: usize,

    /// A lowercase-initial candidate with fewer words than this is a fragment.
    ///
    /// Default: 8.
    pub short_fragment_words: usize,

    /// A verbless candidate with fewer words than this is a fragment.
    ///
    /// Default: 4.
    pub min_fragment_words: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_word_count: 5,
            short_fragment_words: 8,
            min_fragment_words: 4,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum word count.
    pub fn with_min_word_count(mut self, words: usize) -> Self {
        self.min_word_count = words;
        self
    }

    pub fn with_short_fragment_words(mut self, words: usize) -> Self {
        self.short_fragment_words = words;
        self
    }

    pub fn with_min_fragment_words(mut self, words: usize) -> Self {
        self.min_fragment_words = words;
        self
    }
}

/// Thresholds for complexity-based model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelectorConfig {
    /// Texts shorter than this many characters always go to the cheap tier.
    pub short_length: usize,

    /// Complexity scores above this go to the capable tier.
    pub score_ceiling: f64,
}

impl Default for ModelSelectorConfig {
    fn default() -> Self {
        Self {
            short_length: 1000,
            score_ceiling: 3.0,
        }
    }
}

impl ModelSelectorConfig {
    pub fn with_short_length(mut self, chars: usize) -> Self {
        self.short_length = chars;
        self
    }

    pub fn with_score_ceiling(mut self, ceiling: f64) -> Self {
        self.score_ceiling = ceiling;
        self
    }
}

/// Live A/B traffic split across prompt versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestConfig {
    /// When false, the default version is always used.
    pub enabled: bool,

    /// Ordered (version, probability mass) table.
    pub weights: Vec<(PromptVersion, f64)>,

    /// Returned when disabled or when cumulative weights fall short.
    pub default_version: PromptVersion,
}

impl Default for AbTestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weights: vec![
                (PromptVersion::V1Basic, 0.0),
                (PromptVersion::V2Enhanced, 0.0),
                (PromptVersion::V3ContextAware, 0.1),
                (PromptVersion::V4Regulatory, 0.9),
            ],
            default_version: PromptVersion::V4Regulatory,
        }
    }
}

impl AbTestConfig {
    /// Disable A/B splitting.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, weights: impl IntoIterator<Item = (PromptVersion, f64)>) -> Self {
        self.weights = weights.into_iter().collect();
        self
    }

    pub fn with_default_version(mut self, version: PromptVersion) -> Self {
        self.default_version = version;
        self
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Time the circuit stays open before a half-open trial.
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(300),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }
}

/// Bounded exponential backoff for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first call.
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: Duration::from_secs(1),
            min_wait: Duration::from_secs(4),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// No retries: one attempt per model.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_waits(mut self, min: Duration, max: Duration) -> Self {
        self.min_wait = min;
        self.max_wait = max.max(min);
        self
    }

    /// Wait before retry `n` (1-based): `clamp(multiplier * 2^(n-1), min, max)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        let raw = self.multiplier.saturating_mul(1u32 << exp);
        raw.clamp(self.min_wait, self.max_wait.max(self.min_wait))
    }
}

/// Model ids per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIds {
    pub flash: String,
    pub pro: String,
}

impl Default for ModelIds {
    fn default() -> Self {
        Self {
            flash: ModelTier::Flash.default_model_id().to_string(),
            pro: ModelTier::Pro.default_model_id().to_string(),
        }
    }
}

impl ModelIds {
    pub fn get(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Flash => &self.flash,
            ModelTier::Pro => &self.pro,
        }
    }
}

/// Configuration for the extraction orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub retry: RetryConfig,

    pub models: ModelIds,

    /// Chunking hint passed to the extractor.
    pub max_char_buffer: usize,

    /// Parallelism hint passed to the extractor.
    pub max_workers: usize,

    /// Confidence given to regex fallback candidates.
    pub fallback_confidence: f64,

    /// Fallback matches must be longer than this many characters.
    pub fallback_min_chars: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            models: ModelIds::default(),
            max_char_buffer: 50_000,
            max_workers: 20,
            fallback_confidence: 0.7,
            fallback_min_chars: 20,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_models(mut self, models: ModelIds) -> Self {
        self.models = models;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    pub fn with_max_char_buffer(mut self, chars: usize) -> Self {
        self.max_char_buffer = chars.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_clamped() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff(1), Duration::from_secs(4));
        assert_eq!(retry.backoff(3), Duration::from_secs(4));
        assert_eq!(retry.backoff(4), Duration::from_secs(8));
        assert_eq!(retry.backoff(5), Duration::from_secs(10));
        assert_eq!(retry.backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let total: f64 = AbTestConfig::default().weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_model_ids() {
        let ids = ModelIds::default();
        assert_eq!(ids.get(ModelTier::Pro), "gemini-1.5-pro");
    }
}
