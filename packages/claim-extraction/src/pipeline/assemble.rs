//! Turns raw candidates into validated, typed claims.
//!
//! Rejected candidates are kept with their reasoning so callers can audit
//! the filter; rejection is never an error.

use serde::Serialize;

use crate::types::candidate::Candidate;
use crate::types::claim::{ValidatedClaim, WarningKind};
use crate::validation::{ClaimTypeClassifier, ClaimValidator};

const HIGH_CONFIDENCE: f64 = 0.8;
const MEDIUM_CONFIDENCE: f64 = 0.5;

/// A candidate that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedCandidate {
    pub text: String,
    pub reasoning: String,
    pub warnings: Vec<WarningKind>,
}

/// Survivor counts by adjusted confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceBands {
    /// `>= 0.8`
    pub high: usize,
    /// `>= 0.5`
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceBands {
    fn add(&mut self, confidence: f64) {
        if confidence >= HIGH_CONFIDENCE {
            self.high += 1;
        } else if confidence >= MEDIUM_CONFIDENCE {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledClaims {
    pub claims: Vec<ValidatedClaim>,
    pub rejected: Vec<RejectedCandidate>,
    pub bands: ConfidenceBands,
}

/// Validates and classifies candidates, preserving input order.
#[derive(Debug, Clone, Default)]
pub struct ResultAssembler {
    validator: ClaimValidator,
    classifier: ClaimTypeClassifier,
}

impl ResultAssembler {
    pub fn new(validator: ClaimValidator, classifier: ClaimTypeClassifier) -> Self {
        Self {
            validator,
            classifier,
        }
    }

    pub fn validator(&self) -> &ClaimValidator {
        &self.validator
    }

    pub fn classifier(&self) -> &ClaimTypeClassifier {
        &self.classifier
    }

    pub fn assemble(&self, candidates: Vec<Candidate>) -> AssembledClaims {
        let mut assembled = AssembledClaims::default();

        for candidate in candidates {
            let verdict = self.validator.validate(&candidate.text);
            let warnings: Vec<WarningKind> = verdict.warnings.iter().copied().collect();

            if !verdict.is_valid {
                assembled.rejected.push(RejectedCandidate {
                    text: candidate.text,
                    reasoning: verdict.reasoning,
                    warnings,
                });
                continue;
            }

            let confidence = adjusted_confidence(candidate.confidence, verdict.confidence_adjustment);
            let claim_type = self
                .classifier
                .classify(&candidate.text)
                .or_else(|| candidate.suggested_claim_type());

            assembled.bands.add(confidence);
            assembled.claims.push(ValidatedClaim {
                is_comparative: self.classifier.is_comparative(&candidate.text),
                has_statistics: self.classifier.has_statistical_evidence(&candidate.text),
                text: candidate.text,
                confidence,
                claim_type,
                reasoning: verdict.reasoning,
                warnings,
                span: candidate.span,
            });
        }

        tracing::info!(
            accepted = assembled.claims.len(),
            rejected = assembled.rejected.len(),
            high = assembled.bands.high,
            medium = assembled.bands.medium,
            low = assembled.bands.low,
            "Claims assembled"
        );

        assembled
    }
}

/// Candidate confidence plus the (non-positive) adjustment, clamped to [0, 1].
pub fn adjusted_confidence(confidence: f64, adjustment: f64) -> f64 {
    let adjusted = confidence + adjustment;
    if adjusted.is_nan() {
        return 0.0;
    }
    adjusted.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::candidate::Span;
    use crate::types::claim::ClaimType;
    use proptest::prelude::*;

    #[test]
    fn test_valid_claim_is_typed_and_flagged() {
        let assembled = ResultAssembler::default().assemble(vec![Candidate::new(
            "XARELTO reduced the risk of stroke by 21% compared to warfarin",
            0.95,
        )
        .with_span(Span::new(0, 62))]);

        assert!(assembled.rejected.is_empty());
        let claim = &assembled.claims[0];
        assert!(matches!(
            claim.claim_type,
            Some(ClaimType::Efficacy) | Some(ClaimType::Comparative)
        ));
        assert!(claim.is_comparative);
        assert!(claim.has_statistics);
        assert_eq!(claim.span, Some(Span::new(0, 62)));
        assert_eq!(assembled.bands.high, 1);
    }

    #[test]
    fn test_rejected_candidates_keep_reasoning() {
        let assembled = ResultAssembler::default().assemble(vec![
            Candidate::new("Table 3: Adverse Events by Treatment Group", 0.9),
            Candidate::new("Indicated for the treatment of atrial fibrillation", 0.9),
        ]);

        assert_eq!(assembled.claims.len(), 1);
        assert_eq!(assembled.claims[0].claim_type, Some(ClaimType::Indication));
        assert_eq!(assembled.rejected.len(), 1);
        assert!(assembled.rejected[0].warnings.contains(&WarningKind::TableHeader));
        assert!(!assembled.rejected[0].reasoning.is_empty());
    }

    #[test]
    fn test_model_suggested_type_used_when_classifier_is_silent() {
        let text = "XARELTO achieved a survival benefit in most elderly patients";
        assert!(ClaimTypeClassifier::new().classify(text).is_none());

        let assembled = ResultAssembler::default().assemble(vec![Candidate::new(text, 0.6)
            .with_attribute("claim_type", serde_json::json!("POPULATION"))]);

        assert_eq!(assembled.claims[0].claim_type, Some(ClaimType::Population));
        assert_eq!(assembled.bands.medium, 1);
    }

    #[test]
    fn test_clamping_edges() {
        assert_eq!(adjusted_confidence(0.2, -0.4), 0.0);
        assert_eq!(adjusted_confidence(1.0, 0.0), 1.0);
        assert_eq!(adjusted_confidence(f64::NAN, 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn adjusted_confidence_stays_in_unit_interval(
            confidence in -2.0f64..3.0,
            adjustment in -3.0f64..0.0,
        ) {
            let adjusted = adjusted_confidence(confidence, adjustment);
            prop_assert!((0.0..=1.0).contains(&adjusted));
        }
    }
}
