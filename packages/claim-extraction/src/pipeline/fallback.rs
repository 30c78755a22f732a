//! Deterministic pattern-based extraction used when every model fails.
//!
//! Scans for result-bearing phrases co-located with numeric evidence.
//! Never fails; worst case it returns nothing.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::candidate::{Candidate, Span};

static RESULT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "change_with_magnitude",
            r"(?i)(?:reduced?|decreased?|improved?|increased?|effective).*?(?:\d+(?:\.\d+)?%|\d+(?:\.\d+)?\s*(?:times?|fold))",
        ),
        (
            "study_finding",
            r"(?i)(?:study|trial|research).*?(?:showed|demonstrated|found|revealed)",
        ),
        (
            "patient_outcome",
            r"(?i)(?:patients?|subjects?).*?(?:experienced?|achieved?|reported)",
        ),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Regex scan producing candidates with a fixed confidence.
#[derive(Debug, Clone)]
pub struct FallbackExtractor {
    confidence: f64,
    min_chars: usize,
}

impl Default for FallbackExtractor {
    fn default() -> Self {
        Self::new(0.7, 20)
    }
}

impl FallbackExtractor {
    pub fn new(confidence: f64, min_chars: usize) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            min_chars,
        }
    }

    /// Each match becomes a candidate carrying its byte span.
    ///
    /// Matches must be longer than the minimum. Candidates are
    /// ordered by pattern, then by position.
    pub fn extract(&self, text: &str) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for (label, regex) in RESULT_PATTERNS.iter() {
            for m in regex.find_iter(text) {
                let matched = m.as_str().trim();
                if matched.chars().count() <= self.min_chars {
                    continue;
                }
                candidates.push(
                    Candidate::new(matched, self.confidence)
                        .with_span(Span::new(m.start(), m.end()))
                        .with_attribute("pattern", serde_json::json!(label)),
                );
            }
        }

        tracing::info!(count = candidates.len(), "Regex fallback extraction complete");
        candidates
    }
}
