//! Claim type classification by ordered pattern precedence.

use std::sync::Arc;

use super::patterns::{PatternCategory, PatternLibrary};
use crate::types::claim::ClaimType;

/// Maps claim text to at most one [`ClaimType`].
///
/// Rules are evaluated in the library's precedence order and the first
/// match wins. With the built-in rules that order is indication,
/// contraindication, dosing, safety, comparative, pharmacokinetic,
/// mechanism, efficacy. `Population` is never produced by the built-in
/// rules; it only appears when a model suggests it.
#[derive(Debug, Clone)]
pub struct ClaimTypeClassifier {
    patterns: Arc<PatternLibrary>,
}

impl Default for ClaimTypeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimTypeClassifier {
    pub fn new() -> Self {
        Self {
            patterns: PatternLibrary::builtin(),
        }
    }

    pub fn with_patterns(patterns: Arc<PatternLibrary>) -> Self {
        Self { patterns }
    }

    pub fn classify(&self, text: &str) -> Option<ClaimType> {
        self.patterns
            .claim_type_rules()
            .iter()
            .find(|rule| rule.patterns.is_match(text))
            .map(|rule| rule.claim_type)
    }

    /// True if the text uses comparative language.
    pub fn is_comparative(&self, text: &str) -> bool {
        self.patterns.matches(PatternCategory::Comparative, text)
    }

    /// True if the text carries a statistical marker.
    pub fn has_statistical_evidence(&self, text: &str) -> bool {
        self.patterns.matches(PatternCategory::Statistical, text)
    }
}
