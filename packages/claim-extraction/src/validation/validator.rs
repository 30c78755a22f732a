//! The three-question claim test.
//!
//! 1. Is it a complete statement?
//! 2. Does it make an assertion about the drug?
//! 3. Would a regulator ask for the evidence?
//!
//! Every test runs on every candidate so the warning set is complete.
//! Independent structural checks (questions, table headers, citations,
//! boilerplate, fragments) add their own warnings on top.

use indexmap::IndexSet;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::patterns::{PatternCategory, PatternLibrary};
use crate::types::claim::{ValidationVerdict, WarningKind};
use crate::types::config::ValidatorConfig;

static DANGLING_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\b(and|or|but|with|to|of|in|for)|[,;])\s*$").expect("valid regex")
});

static TRAILING_CONJUNCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\b(and|or|but|with)|[,;])\s*$").expect("valid regex"));

static BARE_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?%\s+").expect("valid regex"));

static P_VALUE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^p\s*[<>=]").expect("valid regex"));

/// Citations shorter than this with a bracket are treated as bare references.
const SHORT_CITATION_CHARS: usize = 30;

/// Words needed to assume a subject without finding one explicitly.
const SUBJECT_FALLBACK_WORDS: usize = 6;

const VALID_REASONING: &str =
    "Valid regulatory claim; makes assertion about drug; requires clinical evidence";

#[derive(Debug, Clone, Copy)]
struct Completeness {
    has_subject: bool,
    has_verb: bool,
    is_complete: bool,
}

/// Rule-based regulatory claim validator.
///
/// Stateless apart from its immutable pattern library; safe to share
/// across tasks.
#[derive(Debug, Clone)]
pub struct ClaimValidator {
    patterns: Arc<PatternLibrary>,
    config: ValidatorConfig,
}

impl Default for ClaimValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimValidator {
    /// Validator over the built-in pattern library.
    pub fn new() -> Self {
        Self {
            patterns: PatternLibrary::builtin(),
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_patterns(mut self, patterns: Arc<PatternLibrary>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn patterns(&self) -> &Arc<PatternLibrary> {
        &self.patterns
    }

    /// Apply the three-question test to one candidate.
    pub fn validate(&self, text: &str) -> ValidationVerdict {
        let text = text.trim();
        let words: Vec<&str> = text.split_whitespace().collect();
        let word_count = words.len();
        let mut warnings = IndexSet::new();

        // Question 1: completeness
        let completeness = self.check_completeness(text, &words);
        if !completeness.is_complete {
            warnings.insert(WarningKind::IncompleteSentence);
        }
        if !completeness.has_subject {
            warnings.insert(WarningKind::MissingSubject);
        }
        if !completeness.has_verb {
            warnings.insert(WarningKind::MissingVerb);
        }
        if word_count < self.config.min_word_count {
            warnings.insert(WarningKind::LowWordCount);
        }

        // Structural checks
        if self.patterns.matches(PatternCategory::Question, text) {
            warnings.insert(WarningKind::QuestionForm);
        }
        if self.patterns.matches(PatternCategory::Structural, text) {
            warnings.insert(WarningKind::TableHeader);
        }
        if self.is_citation_only(text) {
            warnings.insert(WarningKind::CitationOnly);
        }
        if self.patterns.matches(PatternCategory::Boilerplate, text) {
            warnings.insert(WarningKind::Boilerplate);
        }

        // Question 2: assertion about the drug
        let is_background = self.patterns.matches(PatternCategory::Background, text);
        let is_methodology = self.patterns.matches(PatternCategory::Methodology, text);
        let is_about_drug = self.patterns.matches(PatternCategory::ClaimVerb, text)
            && !is_background
            && !is_methodology;

        if is_background {
            warnings.insert(WarningKind::BackgroundInfo);
        }
        if is_methodology {
            warnings.insert(WarningKind::StudyMethodology);
        }
        if !is_about_drug && !self.patterns.mentions_drug_action(text) {
            warnings.insert(WarningKind::NoDrugMention);
        }

        // Question 3: requires evidence
        let requires_evidence = self.requires_evidence(text);
        if !requires_evidence {
            warnings.insert(WarningKind::TooTrivial);
        }

        if self.is_likely_fragment(text, word_count, completeness.has_verb) {
            warnings.insert(WarningKind::Fragment);
            warnings.insert(WarningKind::ContextDependent);
        }

        let is_valid = completeness.is_complete
            && is_about_drug
            && requires_evidence
            && word_count >= self.config.min_word_count;

        let confidence_adjustment: f64 = warnings.iter().map(WarningKind::penalty).sum();
        let reasoning = build_reasoning(is_valid, &warnings, completeness);

        tracing::debug!(
            text_preview = %preview(text),
            is_valid,
            warnings = ?warnings.iter().map(WarningKind::as_str).collect::<Vec<_>>(),
            confidence_adjustment,
            "Claim validation result"
        );

        ValidationVerdict {
            is_valid,
            warnings,
            reasoning,
            confidence_adjustment,
            has_subject: completeness.has_subject,
            has_verb: completeness.has_verb,
            is_complete: completeness.is_complete,
            is_about_drug,
            requires_evidence,
            word_count,
        }
    }

    fn check_completeness(&self, text: &str, words: &[&str]) -> Completeness {
        let has_verb = self.patterns.matches(PatternCategory::Verb, text);

        let has_capitalized = words.iter().any(|w| is_capitalized_word(w));
        let head = words.len().div_ceil(3);
        let has_domain_noun = words[..head]
            .iter()
            .any(|w| self.patterns.is_domain_noun(w));
        let has_subject =
            has_capitalized || has_domain_noun || words.len() >= SUBJECT_FALLBACK_WORDS;

        let is_complete = has_subject
            && has_verb
            && words.len() >= self.config.min_word_count
            && !DANGLING_END.is_match(text);

        Completeness {
            has_subject,
            has_verb,
            is_complete,
        }
    }

    fn is_citation_only(&self, text: &str) -> bool {
        if self.patterns.matches(PatternCategory::Citation, text) {
            return true;
        }
        text.chars().count() < SHORT_CITATION_CHARS && (text.contains('(') || text.contains('['))
    }

    fn requires_evidence(&self, text: &str) -> bool {
        if self.patterns.matches(PatternCategory::Trivial, text) {
            return false;
        }
        self.patterns.matches(PatternCategory::Statistical, text)
            || self.patterns.matches(PatternCategory::Outcome, text)
            || self.patterns.mentions_drug_action(text)
    }

    fn is_likely_fragment(&self, text: &str, word_count: usize, has_verb: bool) -> bool {
        let starts_lowercase = text.chars().next().is_some_and(char::is_lowercase);
        if starts_lowercase
            && !P_VALUE_START.is_match(text)
            && word_count < self.config.short_fragment_words
        {
            return true;
        }

        TRAILING_CONJUNCTION.is_match(text)
            || BARE_PERCENT.is_match(text)
            || (word_count < self.config.min_fragment_words && !has_verb)
    }
}

/// A word starting with an uppercase letter and at least three
/// alphanumeric characters long.
fn is_capitalized_word(word: &str) -> bool {
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    word.chars().next().is_some_and(char::is_uppercase)
        && word.chars().filter(|c| c.is_alphanumeric()).count() >= 3
}

fn build_reasoning(
    is_valid: bool,
    warnings: &IndexSet<WarningKind>,
    completeness: Completeness,
) -> String {
    if is_valid {
        return VALID_REASONING.to_string();
    }

    let mut reasons = Vec::new();
    if !completeness.has_subject || !completeness.has_verb {
        reasons.push("incomplete sentence structure");
    }

    const REASONS: [(WarningKind, &str); 8] = [
        (WarningKind::Fragment, "appears to be sentence fragment"),
        (
            WarningKind::BackgroundInfo,
            "background information about disease, not drug claim",
        ),
        (
            WarningKind::StudyMethodology,
            "describes study methodology, not results",
        ),
        (WarningKind::TableHeader, "structural element (table/header)"),
        (WarningKind::Boilerplate, "standard boilerplate language"),
        (WarningKind::QuestionForm, "question, not assertion"),
        (
            WarningKind::TooTrivial,
            "trivial statement not requiring evidence",
        ),
        (WarningKind::LowWordCount, "too short to be meaningful claim"),
    ];
    reasons.extend(
        REASONS
            .iter()
            .filter(|(kind, _)| warnings.contains(kind))
            .map(|(_, reason)| *reason),
    );

    if reasons.is_empty() {
        reasons.push("does not meet claim criteria");
    }

    format!("Rejected: {}", reasons.join("; "))
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn validate(text: &str) -> ValidationVerdict {
        ClaimValidator::new().validate(text)
    }

    #[test]
    fn test_comparative_efficacy_claim_is_valid() {
        let verdict = validate("XARELTO reduced the risk of stroke by 21% compared to warfarin");
        assert!(verdict.is_valid, "{}", verdict.reasoning);
        assert!(verdict.is_complete);
        assert!(verdict.is_about_drug);
        assert!(verdict.requires_evidence);
        assert_eq!(verdict.reasoning, VALID_REASONING);
    }

    #[test]
    fn test_tolerability_claim_is_valid() {
        let verdict = validate("Well-tolerated in patients 75 years and older");
        assert!(verdict.is_valid, "{}", verdict.reasoning);
        assert!(verdict.warnings.is_empty());
        assert_eq!(verdict.confidence_adjustment, 0.0);
    }

    #[test]
    fn test_indication_is_valid() {
        let verdict = validate("Indicated for the treatment of atrial fibrillation");
        assert!(verdict.is_valid, "{}", verdict.reasoning);
    }

    #[test]
    fn test_fragment_is_rejected() {
        let verdict = validate("increase in AUCinf and a 56%");
        assert!(!verdict.is_valid);
        assert!(
            verdict.has_warning(WarningKind::IncompleteSentence)
                || verdict.has_warning(WarningKind::Fragment)
        );
        assert!(verdict.has_warning(WarningKind::Fragment));
        assert!(verdict.has_warning(WarningKind::ContextDependent));
        assert!(verdict.reasoning.starts_with("Rejected: "));
    }

    #[test]
    fn test_background_is_rejected() {
        let verdict = validate("Atrial fibrillation affects 2.7 million Americans");
        assert!(!verdict.is_valid);
        assert!(!verdict.is_about_drug);
        assert!(verdict.has_warning(WarningKind::BackgroundInfo));
        assert!(verdict
            .reasoning
            .contains("background information about disease"));
    }

    #[test]
    fn test_methodology_is_rejected() {
        let verdict = validate("Patients were randomized 1:1 to receive either XARELTO or placebo");
        assert!(!verdict.is_valid);
        assert!(verdict.has_warning(WarningKind::StudyMethodology));
    }

    #[test]
    fn test_table_header_is_rejected() {
        let verdict = validate("Table 3: Adverse Events by Treatment Group");
        assert!(!verdict.is_valid);
        assert!(verdict.has_warning(WarningKind::TableHeader));
    }

    #[test]
    fn test_trivial_statement_does_not_require_evidence() {
        let verdict = validate("XARELTO is a tablet");
        assert!(!verdict.is_valid);
        assert!(!verdict.requires_evidence);
        assert!(verdict.has_warning(WarningKind::TooTrivial));
        assert!(verdict.has_warning(WarningKind::LowWordCount));
    }

    #[test]
    fn test_question_and_boilerplate() {
        let verdict = validate("What is XARELTO?");
        assert!(verdict.has_warning(WarningKind::QuestionForm));
        assert!(!verdict.is_valid);

        let verdict = validate("See full prescribing information for complete safety information.");
        assert!(verdict.has_warning(WarningKind::Boilerplate));
        assert!(!verdict.is_valid);
    }

    #[test]
    fn test_short_parenthetical_is_citation() {
        let verdict = validate("(Smith et al. NEJM 2011)");
        assert!(verdict.has_warning(WarningKind::CitationOnly));
        assert!(!verdict.is_valid);
    }

    #[test]
    fn test_penalties_are_additive() {
        let verdict = validate("Table 3: Adverse Events by Treatment Group");
        let expected: f64 = verdict.warnings.iter().map(WarningKind::penalty).sum();
        assert!((verdict.confidence_adjustment - expected).abs() < 1e-12);
        assert!(verdict.confidence_adjustment <= -0.5);
    }

    #[test]
    fn test_trailing_conjunction_is_fragment() {
        let verdict = validate("XARELTO reduced the rate of major bleeding and");
        assert!(verdict.has_warning(WarningKind::Fragment));
        assert!(!verdict.is_complete);
        assert!(!verdict.is_valid);
    }

    fn total_penalty(kinds: &[WarningKind]) -> f64 {
        kinds.iter().map(WarningKind::penalty).sum()
    }

    #[test]
    fn test_missing_subject() {
        let verdict = validate("was well tolerated overall");
        assert!(!verdict.has_subject);
        assert!(verdict.has_verb);
        assert!(verdict.has_warning(WarningKind::MissingSubject));
        assert!(!verdict.is_valid);

        let expected = total_penalty(&[
            WarningKind::IncompleteSentence,
            WarningKind::MissingSubject,
            WarningKind::LowWordCount,
            WarningKind::Fragment,
            WarningKind::ContextDependent,
        ]);
        assert_eq!(verdict.warnings.len(), 5);
        assert!((verdict.confidence_adjustment - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_drug_mention() {
        let verdict = validate("The hospital cafeteria was renovated last spring");
        assert!(verdict.is_complete);
        assert!(!verdict.is_about_drug);
        assert!(verdict.has_warning(WarningKind::NoDrugMention));
        assert!(verdict.has_warning(WarningKind::TooTrivial));
        assert_eq!(verdict.warnings.len(), 2);
        assert!((verdict.confidence_adjustment - -0.5).abs() < 1e-9);
        assert!(!verdict.is_valid);
    }

    #[test]
    fn test_leading_bare_percentage_is_fragment() {
        let verdict = validate("56% of patients experienced a clinical improvement");
        assert!(verdict.has_warning(WarningKind::Fragment));
        assert!(verdict.has_warning(WarningKind::ContextDependent));
        assert_eq!(verdict.warnings.len(), 2);
        assert_eq!(verdict.confidence_adjustment, WarningKind::Fragment.penalty());
    }

    #[test]
    fn test_short_verbless_text_is_fragment() {
        let text = "Adverse Events Summary";
        let verdict = validate(text);
        assert!(!verdict.has_verb);
        assert!(verdict.has_warning(WarningKind::MissingVerb));
        assert!(verdict.has_warning(WarningKind::Fragment));

        let relaxed = ClaimValidator::new()
            .with_config(ValidatorConfig::new().with_min_fragment_words(3))
            .validate(text);
        assert!(!relaxed.has_warning(WarningKind::Fragment));
        assert!(
            (verdict.confidence_adjustment - relaxed.confidence_adjustment
                - WarningKind::Fragment.penalty())
            .abs()
                < 1e-9
        );
    }

    #[test]
    fn test_trailing_question_mark_without_interrogative() {
        let verdict = validate("XARELTO reduced the risk of stroke by 21%?");
        assert!(verdict.has_warning(WarningKind::QuestionForm));
        assert_eq!(verdict.warnings.len(), 1);
        assert_eq!(verdict.confidence_adjustment, WarningKind::QuestionForm.penalty());
    }

    #[test]
    fn test_word_threshold_is_tunable() {
        let text = "XARELTO reduces stroke risk";
        assert!(!validate(text).is_valid);

        let relaxed = ClaimValidator::new().with_config(ValidatorConfig::new().with_min_word_count(4));
        let verdict = relaxed.validate(text);
        assert!(verdict.is_valid, "{}", verdict.reasoning);
    }

    #[test]
    fn test_empty_text_rejected_without_panic() {
        let verdict = validate("   ");
        assert!(!verdict.is_valid);
        assert_eq!(verdict.word_count, 0);
    }

    proptest! {
        #[test]
        fn validate_is_idempotent(text in "[A-Za-z0-9%,.;:()?| -]{0,120}") {
            let validator = ClaimValidator::new();
            prop_assert_eq!(validator.validate(&text), validator.validate(&text));
        }

        #[test]
        fn valid_implies_all_tests_pass(text in "[A-Za-z0-9%,. -]{0,120}") {
            let verdict = ClaimValidator::new().validate(&text);
            prop_assert!(verdict.confidence_adjustment <= 0.0);
            if verdict.is_valid {
                prop_assert!(verdict.is_complete);
                prop_assert!(verdict.is_about_drug);
                prop_assert!(verdict.requires_evidence);
                prop_assert!(verdict.word_count >= 5);
            }
        }
    }
}
