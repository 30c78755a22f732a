//! Raw candidate spans produced by extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::claim::ClaimType;
use crate::traits::extractor::ExtractionRecord;

/// Confidence assumed when a model omits the `confidence` attribute.
pub const DEFAULT_CANDIDATE_CONFIDENCE: f64 = 0.9;

/// Byte offsets of a candidate within the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A text span that might be a claim.
///
/// Both the model path and the regex fallback produce this same type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,

    /// Opaque score in [0, 1]
    pub confidence: f64,

    pub span: Option<Span>,

    /// Model-supplied attributes (claim_type, is_comparative, ...)
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Candidate {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
            span: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Build a candidate from an extractor record.
    ///
    /// Confidence is read from the `confidence` attribute (number or
    /// numeric string) and clamped to [0, 1]. The first span, if any,
    /// becomes the candidate span.
    pub fn from_record(record: ExtractionRecord) -> Self {
        let confidence = record
            .attributes
            .get("confidence")
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .filter(|c: &f64| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CANDIDATE_CONFIDENCE);

        Self {
            text: record.extraction_text,
            confidence,
            span: record.spans.first().copied(),
            attributes: record.attributes,
        }
    }

    /// Claim type suggested by the model, if it supplied a recognisable one.
    pub fn suggested_claim_type(&self) -> Option<ClaimType> {
        self.attributes
            .get("claim_type")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(attrs: serde_json::Value) -> ExtractionRecord {
        ExtractionRecord {
            extraction_text: "XARELTO reduced stroke risk by 21%".to_string(),
            attributes: serde_json::from_value(attrs).unwrap(),
            spans: vec![Span::new(4, 38)],
        }
    }

    #[test]
    fn test_missing_confidence_defaults() {
        let candidate = Candidate::from_record(record(json!({})));
        assert_eq!(candidate.confidence, DEFAULT_CANDIDATE_CONFIDENCE);
        assert_eq!(candidate.span, Some(Span::new(4, 38)));
    }

    #[test]
    fn test_string_confidence_parsed_and_clamped() {
        let candidate = Candidate::from_record(record(json!({"confidence": "0.75"})));
        assert_eq!(candidate.confidence, 0.75);

        let candidate = Candidate::from_record(record(json!({"confidence": 1.7})));
        assert_eq!(candidate.confidence, 1.0);
    }

    #[test]
    fn test_suggested_claim_type() {
        let candidate = Candidate::from_record(record(json!({"claim_type": "efficacy"})));
        assert_eq!(candidate.suggested_claim_type(), Some(ClaimType::Efficacy));

        let candidate = Candidate::from_record(record(json!({"claim_type": 3})));
        assert_eq!(candidate.suggested_claim_type(), None);
    }
}
