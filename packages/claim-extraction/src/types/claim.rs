//! Claim taxonomy, validation warnings, and validated output.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::candidate::Span;
use super::model::ParseEnumError;

/// Regulatory claim category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    Efficacy,
    Safety,
    Indication,
    Contraindication,
    Dosing,
    Pharmacokinetic,
    Comparative,
    Mechanism,
    Population,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Efficacy => "EFFICACY",
            Self::Safety => "SAFETY",
            Self::Indication => "INDICATION",
            Self::Contraindication => "CONTRAINDICATION",
            Self::Dosing => "DOSING",
            Self::Pharmacokinetic => "PHARMACOKINETIC",
            Self::Comparative => "COMPARATIVE",
            Self::Mechanism => "MECHANISM",
            Self::Population => "POPULATION",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = ParseEnumError;

    /// Case-insensitive. Also accepts the loose labels models tend to
    /// emit (`dosage`, `pharmacokinetics`, `outcome`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "efficacy" | "outcome" => Ok(Self::Efficacy),
            "safety" => Ok(Self::Safety),
            "indication" => Ok(Self::Indication),
            "contraindication" => Ok(Self::Contraindication),
            "dosing" | "dosage" => Ok(Self::Dosing),
            "pharmacokinetic" | "pharmacokinetics" => Ok(Self::Pharmacokinetic),
            "comparative" => Ok(Self::Comparative),
            "mechanism" => Ok(Self::Mechanism),
            "population" => Ok(Self::Population),
            _ => Err(ParseEnumError {
                kind: "claim type",
                value: s.to_string(),
            }),
        }
    }
}

/// Reason a candidate was penalised or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    IncompleteSentence,
    MissingSubject,
    MissingVerb,
    LowWordCount,
    Fragment,
    QuestionForm,
    TableHeader,
    CitationOnly,
    Boilerplate,
    BackgroundInfo,
    StudyMethodology,
    TooTrivial,
    NoDrugMention,
    ContextDependent,
}

impl WarningKind {
    /// Confidence penalty applied when this warning is raised.
    ///
    /// `ContextDependent` always rides along with `Fragment` and carries
    /// no penalty of its own.
    pub fn penalty(&self) -> f64 {
        match self {
            Self::MissingSubject => -0.2,
            Self::MissingVerb => -0.3,
            Self::IncompleteSentence => -0.3,
            Self::LowWordCount => -0.2,
            Self::Fragment => -0.4,
            Self::ContextDependent => 0.0,
            Self::QuestionForm => -0.4,
            Self::TableHeader => -0.5,
            Self::CitationOnly => -0.5,
            Self::Boilerplate => -0.4,
            Self::BackgroundInfo => -0.4,
            Self::StudyMethodology => -0.4,
            Self::NoDrugMention => -0.3,
            Self::TooTrivial => -0.2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncompleteSentence => "INCOMPLETE_SENTENCE",
            Self::MissingSubject => "MISSING_SUBJECT",
            Self::MissingVerb => "MISSING_VERB",
            Self::LowWordCount => "LOW_WORD_COUNT",
            Self::Fragment => "FRAGMENT",
            Self::QuestionForm => "QUESTION_FORM",
            Self::TableHeader => "TABLE_HEADER",
            Self::CitationOnly => "CITATION_ONLY",
            Self::Boilerplate => "BOILERPLATE",
            Self::BackgroundInfo => "BACKGROUND_INFO",
            Self::StudyMethodology => "STUDY_METHODOLOGY",
            Self::TooTrivial => "TOO_TRIVIAL",
            Self::NoDrugMention => "NO_DRUG_MENTION",
            Self::ContextDependent => "CONTEXT_DEPENDENT",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the three-question test for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    /// Insertion-ordered, no duplicates
    pub warnings: IndexSet<WarningKind>,
    pub reasoning: String,
    /// Sum of penalties; never positive, never clamped here
    pub confidence_adjustment: f64,
    pub has_subject: bool,
    pub has_verb: bool,
    pub is_complete: bool,
    pub is_about_drug: bool,
    pub requires_evidence: bool,
    pub word_count: usize,
}

impl ValidationVerdict {
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.contains(&kind)
    }
}

/// A candidate that survived validation, ready for the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedClaim {
    pub text: String,
    /// Candidate confidence plus adjustment, clamped to [0, 1]
    pub confidence: f64,
    pub claim_type: Option<ClaimType>,
    pub reasoning: String,
    pub is_comparative: bool,
    pub has_statistics: bool,
    pub warnings: Vec<WarningKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}
