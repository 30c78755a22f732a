//! Labeled regular-expression rule sets for claim validation.
//!
//! A [`PatternLibrary`] is immutable once compiled. The built-in library
//! carries the regulatory rule set; a JSON [`PatternLibrarySpec`] can
//! replace any category without code changes.

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use crate::error::PatternError;
use crate::types::claim::ClaimType;

/// Rule category consumed by the validator or classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// Disease background and epidemiology
    Background,
    /// Study design and enrolment
    Methodology,
    /// Table headers, captions, section titles
    Structural,
    /// Disclaimers and label references
    Boilerplate,
    /// Interrogative forms
    Question,
    /// Bare references
    Citation,
    /// Assertions a drug can make
    ClaimVerb,
    Comparative,
    Statistical,
    /// Packaging, availability, manufacturer facts
    Trivial,
    /// Clinical outcome keywords
    Outcome,
    /// Lexical verb set for the completeness test
    Verb,
}

impl PatternCategory {
    pub const ALL: [PatternCategory; 12] = [
        PatternCategory::Background,
        PatternCategory::Methodology,
        PatternCategory::Structural,
        PatternCategory::Boilerplate,
        PatternCategory::Question,
        PatternCategory::Citation,
        PatternCategory::ClaimVerb,
        PatternCategory::Comparative,
        PatternCategory::Statistical,
        PatternCategory::Trivial,
        PatternCategory::Outcome,
        PatternCategory::Verb,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Methodology => "methodology",
            Self::Structural => "structural",
            Self::Boilerplate => "boilerplate",
            Self::Question => "question",
            Self::Citation => "citation",
            Self::ClaimVerb => "claim_verb",
            Self::Comparative => "comparative",
            Self::Statistical => "statistical",
            Self::Trivial => "trivial",
            Self::Outcome => "outcome",
            Self::Verb => "verb",
        }
    }
}

// =============================================================================
// Serializable rule data
// =============================================================================

/// One labeled rule before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRuleSpec {
    pub label: String,
    pub pattern: String,
    /// Rules match case-insensitively unless set.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl PatternRuleSpec {
    fn new(label: &str, pattern: &str, case_sensitive: bool) -> Self {
        Self {
            label: label.to_string(),
            pattern: pattern.to_string(),
            case_sensitive,
        }
    }
}

/// Classifier rule for one claim type.
///
/// `include` pulls in every rule of another category (the comparative
/// claim type reuses the comparative markers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTypeRuleSpec {
    pub claim_type: ClaimType,
    #[serde(default)]
    pub patterns: Vec<PatternRuleSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<PatternCategory>,
}

/// Externally supplied pattern data.
///
/// Every field is optional in JSON. Whatever is present replaces the
/// corresponding built-in data; the rest stays built-in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternLibrarySpec {
    #[serde(default)]
    pub categories: IndexMap<PatternCategory, Vec<PatternRuleSpec>>,

    /// Ordered by precedence; first match wins.
    #[serde(default)]
    pub claim_types: Vec<ClaimTypeRuleSpec>,

    /// Lowercase substrings signalling a drug action.
    #[serde(default)]
    pub drug_action_words: Vec<String>,

    /// Subject-like nouns for the completeness test.
    #[serde(default)]
    pub domain_nouns: Vec<String>,
}

impl PatternLibrarySpec {
    /// The built-in regulatory rule set.
    pub fn builtin() -> Self {
        let mut categories = IndexMap::new();
        for (category, rules, case_sensitive) in BUILTIN_CATEGORIES {
            categories.insert(
                *category,
                rules
                    .iter()
                    .map(|(label, pattern)| PatternRuleSpec::new(label, pattern, *case_sensitive))
                    .collect(),
            );
        }

        let claim_types = BUILTIN_CLAIM_TYPES
            .iter()
            .map(|(claim_type, rules)| ClaimTypeRuleSpec {
                claim_type: *claim_type,
                patterns: rules
                    .iter()
                    .map(|(label, pattern)| PatternRuleSpec::new(label, pattern, false))
                    .collect(),
                include: (*claim_type == ClaimType::Comparative)
                    .then_some(PatternCategory::Comparative),
            })
            .collect();

        Self {
            categories,
            claim_types,
            drug_action_words: DRUG_ACTION_WORDS.iter().map(|w| w.to_string()).collect(),
            domain_nouns: DOMAIN_NOUNS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Apply `overrides` on top of this spec.
    pub fn overlay(mut self, overrides: PatternLibrarySpec) -> Self {
        for (category, rules) in overrides.categories {
            self.categories.insert(category, rules);
        }
        if !overrides.claim_types.is_empty() {
            self.claim_types = overrides.claim_types;
        }
        if !overrides.drug_action_words.is_empty() {
            self.drug_action_words = overrides.drug_action_words;
        }
        if !overrides.domain_nouns.is_empty() {
            self.domain_nouns = overrides.domain_nouns;
        }
        self
    }
}

// =============================================================================
// Compiled library
// =============================================================================

/// A compiled, labeled rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub label: String,
    regex: Regex,
}

impl PatternRule {
    fn compile(category: &str, spec: &PatternRuleSpec) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(!spec.case_sensitive)
            .build()
            .map_err(|source| PatternError::InvalidRegex {
                category: category.to_string(),
                label: spec.label.clone(),
                source,
            })?;
        Ok(Self {
            label: spec.label.clone(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// An ordered set of rules; matches if any rule matches.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    rules: Vec<PatternRule>,
}

impl PatternSet {
    fn compile(category: &str, specs: &[PatternRuleSpec]) -> Result<Self, PatternError> {
        let rules = specs
            .iter()
            .map(|spec| PatternRule::compile(category, spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.rules.iter().any(|r| r.is_match(text))
    }

    /// Label of the first matching rule.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.is_match(text))
            .map(|r| r.label.as_str())
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compiled rule set for one claim type.
#[derive(Debug, Clone)]
pub struct ClaimTypeRule {
    pub claim_type: ClaimType,
    pub patterns: PatternSet,
}

/// Immutable collection of rule sets used by the validator and classifier.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    sets: IndexMap<PatternCategory, PatternSet>,
    claim_types: Vec<ClaimTypeRule>,
    drug_action_words: Vec<String>,
    domain_nouns: Vec<String>,
}

static BUILTIN: LazyLock<Arc<PatternLibrary>> = LazyLock::new(|| {
    Arc::new(
        PatternLibrary::from_spec(&PatternLibrarySpec::builtin())
            .expect("built-in pattern library compiles"),
    )
});

static EMPTY_SET: LazyLock<PatternSet> = LazyLock::new(PatternSet::default);

impl PatternLibrary {
    /// Shared handle to the built-in library.
    pub fn builtin() -> Arc<PatternLibrary> {
        Arc::clone(&BUILTIN)
    }

    /// Compile a library from a full spec.
    pub fn from_spec(spec: &PatternLibrarySpec) -> Result<Self, PatternError> {
        let mut sets = IndexMap::new();
        for (category, rules) in &spec.categories {
            sets.insert(*category, PatternSet::compile(category.as_str(), rules)?);
        }

        let mut claim_types = Vec::with_capacity(spec.claim_types.len());
        for rule in &spec.claim_types {
            let mut specs = rule.patterns.clone();
            if let Some(included) = rule.include {
                if let Some(extra) = spec.categories.get(&included) {
                    specs.extend(extra.iter().cloned());
                }
            }
            claim_types.push(ClaimTypeRule {
                claim_type: rule.claim_type,
                patterns: PatternSet::compile(rule.claim_type.as_str(), &specs)?,
            });
        }

        Ok(Self {
            sets,
            claim_types,
            drug_action_words: spec
                .drug_action_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            domain_nouns: spec.domain_nouns.iter().map(|w| w.to_lowercase()).collect(),
        })
    }

    /// Parse a JSON document and overlay it on the built-in rules.
    pub fn from_json(json: &str) -> Result<Self, PatternError> {
        let overrides: PatternLibrarySpec = serde_json::from_str(json)?;
        Self::from_spec(&PatternLibrarySpec::builtin().overlay(overrides))
    }

    /// Read a JSON pattern document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PatternError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Rule set for a category; empty if the category is absent.
    pub fn set(&self, category: PatternCategory) -> &PatternSet {
        self.sets.get(&category).unwrap_or(&EMPTY_SET)
    }

    pub fn matches(&self, category: PatternCategory, text: &str) -> bool {
        self.set(category).is_match(text)
    }

    /// Classifier rules in precedence order.
    pub fn claim_type_rules(&self) -> &[ClaimTypeRule] {
        &self.claim_types
    }

    /// True if any drug-action word occurs as a substring.
    pub fn mentions_drug_action(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.drug_action_words.iter().any(|w| lower.contains(w.as_str()))
    }

    pub fn is_domain_noun(&self, word: &str) -> bool {
        let word = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        self.domain_nouns.iter().any(|n| *n == word)
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        (*Self::builtin()).clone()
    }
}

// =============================================================================
// Built-in rule data
// =============================================================================

type RuleTable = &'static [(&'static str, &'static str)];

const BACKGROUND: RuleTable = &[
    (
        "affects_population",
        r"\b(affects?|afflicts?)\s+\d+(\.\d+)?\s+(million|billion|thousand)",
    ),
    (
        "disease_description",
        r"is\s+a\s+(common|rare|chronic|serious|life-threatening)\s+(condition|disease|disorder)",
    ),
    ("epidemiology", r"\b(epidemiology|prevalence|incidence)\b"),
];

const METHODOLOGY: RuleTable = &[
    ("allocation", r"\b(were|was)\s+(randomized|enrolled|assigned|stratified)"),
    ("enrolment", r"\btrial\s+(enrolled|recruited|included)"),
    ("study_design", r"\bstudy\s+design\b"),
    ("endpoint_definition", r"\b(primary|secondary)\s+endpoint\s+(was|were)"),
    ("treatment_received", r"\bpatients?\s+(received|underwent)\b"),
    ("dosing_protocol", r"\bsubjects?\s+(were|was)\s+(given|administered)"),
];

const STRUCTURAL: RuleTable = &[
    ("caption", r"^(Table|Figure|Chart|Graph|Appendix)\s+\d+"),
    ("numbered_heading", r"^\d+\.\s+[A-Z]"),
    ("caps_heading", r"^[A-Z\s]+:$"),
    ("table_cells", r"\|\s+\w+\s+\|"),
];

const BOILERPLATE: RuleTable = &[
    ("prescribing_info", r"see\s+(full\s+)?prescribing\s+information"),
    ("package_insert", r"refer\s+to\s+package\s+insert"),
    ("full_label", r"consult\s+the\s+full\s+label"),
    ("results_vary", r"individual\s+results\s+may\s+vary"),
    ("ask_provider", r"ask\s+your\s+(doctor|physician|healthcare\s+provider)"),
];

const QUESTION: RuleTable = &[
    ("interrogative", r"^(what|when|where|why|how|who|which)\s+"),
    ("question_mark", r"\?\s*$"),
];

const CITATION: RuleTable = &[
    ("author_et_al", r"^\([A-Za-z]+\s+et\s+al[.,]"),
    ("pmid", r"\(PMID[:=]\s*\d+\)"),
    ("doi", r"\(doi[:=]"),
    ("numeric_reference", r"^\[\d+[,\s\d]*\]"),
    ("trial_registry", r"\(NCT-?\d+\)"),
];

const CLAIM_VERB: RuleTable = &[
    ("reduces", r"\b(reduc(es?|ed|ing|tion)|decreas(es?|ed|ing))"),
    ("improves", r"\b(improv(es?|ed|ing|ement))"),
    ("prevents", r"\b(prevent(s?|ed|ing|ion))"),
    ("achieves", r"\b(achiev(es?|ed|ing))"),
    ("demonstrates", r"\b(demonstrat(es?|ed|ing))"),
    ("shows", r"\b(show(s?|ed|ing|n))"),
    ("indicated_for", r"\b(indicat(es?|ed)\s+for)"),
    ("contraindicated_in", r"\b(contraindicated\s+in)"),
    ("recommended_dose", r"\b(recommended\s+dose)"),
    ("usage_directive", r"\b(should\s+(not\s+)?be\s+(used|administered))"),
    ("may_cause", r"\b(may\s+cause)"),
    ("well_tolerated", r"\b(well-tolerated)"),
    ("relative_standing", r"\b(superior\s+to|inferior\s+to|non-inferior)"),
];

const COMPARATIVE: RuleTable = &[
    ("versus", r"\b(vs\.?|versus|compared\s+(to|with))\b"),
    ("relative_standing", r"\b(superior|inferior|non-inferior|equivalent)\s+to\b"),
    ("better_worse", r"\b(better|worse)\s+than\b"),
    ("more_less", r"\b(more|less)\s+\w+\s+than\b"),
];

const STATISTICAL: RuleTable = &[
    ("p_value", r"\bp\s*[<>=]\s*0?\.\d+"),
    ("confidence_interval", r"\b(95|99)%\s*CI\b"),
    ("hazard_ratio", r"\bHR\s*=?\s*\d+\.\d+"),
    ("odds_ratio", r"\bOR\s*=?\s*\d+\.\d+"),
    (
        "percent_change",
        r"\d+(\.\d+)?%\s+(reduction|increase|improvement|decrease)",
    ),
    (
        "change_by_percent",
        r"\b(reduc|decreas|improv|increas|lower)\w*\b[^.;]{0,60}?\bby\s+\d+(\.\d+)?%",
    ),
];

const TRIVIAL: RuleTable = &[
    ("dosage_form", r"is\s+a\s+(tablet|capsule|pill|liquid|injection)"),
    ("strength", r"comes\s+in\s+\d+\s*mg"),
    ("availability", r"is\s+(available|supplied)"),
    ("manufacturer", r"manufactured\s+by"),
];

const OUTCOME: RuleTable = &[(
    "outcome_keyword",
    r"\b(efficacy|safety|adverse|benefit|risk|response|survival|mortality|reduction|improvement)\b",
)];

const VERB: RuleTable = &[
    (
        "state",
        r"\b(is|are|was|were|be|been|being|has|have|had|does|do|did)\b",
    ),
    (
        "modal",
        r"\b(can|could|may|might|must|shall|should|will|would)\b",
    ),
    (
        "drug_action",
        r"\b(reduce[sd]?|reducing|decreas(es|ed|ing)|improv(es|ed|ing)|prevent(s|ed|ing)?|treat(s|ed|ing)?|caus(es|ed|ing)|show(s|ed|n|ing)?|demonstrat(es|ed|ing)|achiev(es|ed|ing)|increas(es|ed|ing)|lower(s|ed|ing)|inhibit(s|ed|ing)?|block(s|ed|ing)?|binds?|occur(s|red|ring)?|provid(es|ed|ing)|result(s|ed|ing)|leads?|led|experienc(es|ed|ing)|report(s|ed))\b",
    ),
    (
        "participle",
        r"\b(tolerated|indicated|contraindicated|administered|dosed|recommended|approved|randomized|enrolled)\b",
    ),
];

const BUILTIN_CATEGORIES: &[(PatternCategory, RuleTable, bool)] = &[
    (PatternCategory::Background, BACKGROUND, false),
    (PatternCategory::Methodology, METHODOLOGY, false),
    (PatternCategory::Structural, STRUCTURAL, true),
    (PatternCategory::Boilerplate, BOILERPLATE, false),
    (PatternCategory::Question, QUESTION, false),
    (PatternCategory::Citation, CITATION, true),
    (PatternCategory::ClaimVerb, CLAIM_VERB, false),
    (PatternCategory::Comparative, COMPARATIVE, false),
    (PatternCategory::Statistical, STATISTICAL, false),
    (PatternCategory::Trivial, TRIVIAL, false),
    (PatternCategory::Outcome, OUTCOME, false),
    (PatternCategory::Verb, VERB, false),
];

/// Precedence order matters: categories share vocabulary.
const BUILTIN_CLAIM_TYPES: &[(ClaimType, RuleTable)] = &[
    (
        ClaimType::Indication,
        &[(
            "indication",
            r"indicat(ed|ion)\s+for|approved\s+for|treatment\s+of",
        )],
    ),
    (
        ClaimType::Contraindication,
        &[(
            "contraindication",
            r"contraindicated|should\s+not\s+be\s+used|avoid\s+(use\s+)?in",
        )],
    ),
    (
        ClaimType::Dosing,
        &[(
            "dosing",
            r"(recommended\s+)?dos(e|age|ing)|administr(ation|ed)|once\s+daily|twice\s+daily|\d+\s*mg",
        )],
    ),
    (
        ClaimType::Safety,
        &[(
            "safety",
            r"adverse\s+(event|reaction|effect)|side\s+effect|tolera(ted|bility)|bleeding|safety",
        )],
    ),
    (ClaimType::Comparative, &[]),
    (
        ClaimType::Pharmacokinetic,
        &[(
            "pharmacokinetic",
            r"(auc|cmax|tmax|half-life|absorption|metabolism|excretion|plasma\s+concentration|bioavailability)",
        )],
    ),
    (
        ClaimType::Mechanism,
        &[(
            "mechanism",
            r"(mechanism\s+of\s+action|inhibitor|agonist|antagonist|binds\s+to|blocks)",
        )],
    ),
    (
        ClaimType::Efficacy,
        &[(
            "efficacy",
            r"reduc(ed|es|tion)|improv(ed|es|ement)|prevent(ed|s|ion)|efficacy|response\s+rate",
        )],
    ),
];

const DRUG_ACTION_WORDS: &[&str] = &[
    "reduces",
    "decreases",
    "improves",
    "prevents",
    "treats",
    "indicated",
    "contraindicated",
    "administered",
    "dosed",
    "tolerated",
    "effective",
    "safe",
];

const DOMAIN_NOUNS: &[&str] = &[
    "patients",
    "patient",
    "subjects",
    "adults",
    "children",
    "treatment",
    "therapy",
    "dose",
    "dosing",
    "drug",
    "medication",
    "study",
    "trial",
    "it",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_every_category() {
        let library = PatternLibrary::builtin();
        for category in PatternCategory::ALL {
            assert!(
                !library.set(category).is_empty(),
                "missing {}",
                category.as_str()
            );
        }
        assert_eq!(library.claim_type_rules().len(), 8);
    }

    #[test]
    fn test_comparative_claim_type_includes_markers() {
        let library = PatternLibrary::builtin();
        let rule = library
            .claim_type_rules()
            .iter()
            .find(|r| r.claim_type == ClaimType::Comparative)
            .unwrap();
        assert_eq!(rule.patterns.len(), COMPARATIVE.len());
        assert!(rule.patterns.is_match("superior to warfarin"));
    }

    #[test]
    fn test_structural_is_case_sensitive() {
        let library = PatternLibrary::builtin();
        assert!(library.matches(PatternCategory::Structural, "Table 3: Adverse Events"));
        assert!(!library.matches(PatternCategory::Structural, "table 3 shows the data"));
    }

    #[test]
    fn test_first_match_label() {
        let library = PatternLibrary::builtin();
        assert_eq!(
            library
                .set(PatternCategory::Background)
                .first_match("Atrial fibrillation affects 2.7 million Americans"),
            Some("affects_population")
        );
    }

    #[test]
    fn test_json_overlay_replaces_one_category() {
        let json = r#"{
            "categories": {
                "trivial": [{"label": "color", "pattern": "is\\s+(white|blue)"}]
            },
            "drug_action_words": ["Lowers"]
        }"#;
        let library = PatternLibrary::from_json(json).unwrap();

        assert!(library.matches(PatternCategory::Trivial, "The tablet is WHITE"));
        assert!(!library.matches(PatternCategory::Trivial, "XARELTO is a tablet"));
        // untouched categories stay built-in
        assert!(library.matches(PatternCategory::Boilerplate, "See full prescribing information"));
        assert!(library.mentions_drug_action("It lowers blood pressure"));
        assert!(!library.mentions_drug_action("It reduces blood pressure"));
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let json = r#"{"categories": {"question": [{"label": "broken", "pattern": "(unclosed"}]}}"#;
        let err = PatternLibrary::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            PatternError::InvalidRegex { ref label, .. } if label == "broken"
        ));
    }

    #[test]
    fn test_domain_noun_ignores_punctuation() {
        let library = PatternLibrary::builtin();
        assert!(library.is_domain_noun("Patients,"));
        assert!(!library.is_domain_noun("warfarin"));
    }
}
