//! Document complexity scoring and model tier selection.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::types::config::ModelSelectorConfig;
use crate::types::model::ModelTier;

static STATS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+(\.\d+)?%|\bp\s*[<>]\s*0\.|\b\d+(\.\d+)?\s*(mg|g|ml|mcg)\b")
        .expect("valid regex")
});

static REFERENCES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNCT-\d+|\bPMID\b|\bdoi\b").expect("valid regex"));

static MEDICAL_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(clinical|trial|study|patient|treatment|therapy|drug|dose|adverse|effect)")
        .expect("valid regex")
});

/// Heuristic complexity signals for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityAnalysis {
    /// Length in characters
    pub length: usize,
    pub word_count: usize,
    pub has_stats: bool,
    pub has_tables: bool,
    pub has_references: bool,
    pub medical_terms: usize,
    pub score: f64,
}

impl ComplexityAnalysis {
    /// `2·stats + 1.5·tables + 1·references + 0.1·terms + 0.5·(words/1000)`
    pub fn analyze(text: &str) -> Self {
        let length = text.chars().count();
        let word_count = text.split_whitespace().count();
        let has_stats = STATS.is_match(text);
        let lower = text.to_lowercase();
        let has_tables = lower.contains("table") || lower.contains("figure");
        let has_references = REFERENCES.is_match(text);
        let medical_terms = MEDICAL_TERMS.find_iter(text).count();

        let score = f64::from(u8::from(has_stats)) * 2.0
            + f64::from(u8::from(has_tables)) * 1.5
            + f64::from(u8::from(has_references))
            + medical_terms as f64 * 0.1
            + word_count as f64 / 1000.0 * 0.5;

        Self {
            length,
            word_count,
            has_stats,
            has_tables,
            has_references,
            medical_terms,
            score,
        }
    }
}

/// Chooses the extraction model tier from document complexity.
///
/// Cost-biased: anything that is not clearly complex goes to `Flash`.
#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    config: ModelSelectorConfig,
}

impl ModelSelector {
    pub fn new(config: ModelSelectorConfig) -> Self {
        Self { config }
    }

    /// Select a tier. A forced tier always wins.
    pub fn select_model(&self, text: &str, forced: Option<ModelTier>) -> ModelTier {
        if let Some(tier) = forced {
            return tier;
        }
        self.select_for(&ComplexityAnalysis::analyze(text))
    }

    /// Apply the decision policy to a precomputed analysis.
    pub fn select_for(&self, analysis: &ComplexityAnalysis) -> ModelTier {
        if analysis.length < self.config.short_length {
            ModelTier::Flash
        } else if analysis.score > self.config.score_ceiling {
            ModelTier::Pro
        } else if analysis.has_stats && analysis.has_references {
            ModelTier::Pro
        } else {
            ModelTier::Flash
        }
    }
}
