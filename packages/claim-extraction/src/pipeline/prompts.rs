//! Extraction prompt templates and A/B version selection.
//!
//! Each [`PromptVersion`] has an instruction text and a few-shot example
//! set. The regulatory template (V4) also carries negative examples that
//! show the model what not to extract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

use crate::traits::extractor::ExtractionRecord;
use crate::types::config::AbTestConfig;
use crate::types::model::PromptVersion;

/// Prompt for basic claim extraction.
pub const V1_BASIC_PROMPT: &str = r#"Extract key claims from the document. A claim is a significant statement that asserts facts about results, efficacy, or findings.
Extract the exact text of the claim without paraphrasing."#;

/// Prompt with pharmaceutical claim categories and quantitative focus.
pub const V2_ENHANCED_PROMPT: &str = r#"Extract key claims from pharmaceutical or medical documents. A claim is a significant statement that asserts facts about:

- Clinical trial results and efficacy data
- Safety and side effect information
- Dosage and administration outcomes
- Comparative effectiveness against other treatments
- Patient response rates and demographics

Guidelines:
- Extract the exact text of the claim without paraphrasing
- Focus on quantitative results, statistical significance, and clinical outcomes
- Include context about study design when relevant
- Prioritize claims with specific numbers, percentages, or statistical measures"#;

/// Prompt for claims usable in promotional or regulatory material.
pub const V3_CONTEXT_AWARE_PROMPT: &str = r#"Extract key claims from pharmaceutical documents with clinical context. Focus on statements that could be used in promotional materials or regulatory submissions.

Claim Categories to Extract:
1. EFFICACY: Treatment effectiveness, response rates, clinical outcomes
2. SAFETY: Adverse events, tolerability, side effect profiles
3. DOSAGE: Optimal dosing, administration schedules, pharmacokinetics
4. COMPARATIVE: Superiority/inferiority to other treatments
5. POPULATION: Specific patient subgroups, demographics, indications

Quality Criteria:
- Include statistical significance when available (p-values, confidence intervals)
- Note study design (RCT, meta-analysis, observational)
- Preserve exact wording for regulatory compliance
- Flag claims requiring additional context or caveats"#;

/// Prompt enforcing the three-question regulatory claim test.
pub const V4_REGULATORY_PROMPT: &str = r#"Extract ONLY pharmaceutical regulatory claims from this document.

CRITICAL: A regulatory claim must pass ALL three tests:

1. Is it a COMPLETE statement?
   - Has subject + verb + object
   - Can stand alone and be understood without surrounding context
   - NOT a fragment, NOT a partial sentence

2. Does it make an ASSERTION about the DRUG?
   - States what the drug DOES, IS, or CAUSES
   - NOT about the disease background
   - NOT about study methodology

3. Would a regulator ask "WHERE'S THE PROOF?"
   - Requires clinical evidence to substantiate
   - Is actionable medical information
   - NOT trivial facts (e.g., "is a tablet")

EXTRACT THESE (Valid Claims):
- "[DRUG] reduced [outcome] by X% compared to [comparator]"
- "Well-tolerated in [population]"
- "Indicated for treatment of [condition]"
- "Peak plasma concentration occurs within X hours"
- "The most common adverse reaction was [event]"
- "Contraindicated in patients with [condition]"
- "The recommended dose is X mg [frequency]"

DO NOT EXTRACT (Invalid - Skip These):
- Sentence fragments: "increase in AUCinf and a 56%"
- Background info: "Atrial fibrillation affects 2.7 million Americans"
- Study methodology: "Patients were randomized 1:1 to treatment groups"
- Table headers: "Adverse Event | Drug | Placebo"
- Section titles: "Clinical Pharmacology"
- Questions: "What is [DRUG]?"
- Citations: "(Smith et al. NEJM 2011)"
- Boilerplate: "See full prescribing information"

Extract the EXACT text of the claim. Do NOT paraphrase. Include statistical data when present."#;

/// A worked example shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptExample {
    pub text: String,
    /// Empty for negative examples
    pub extractions: Vec<ExtractionRecord>,
}

/// Instruction text plus few-shot examples for one prompt version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptConfig {
    pub version: PromptVersion,
    pub description: String,
    pub examples: Vec<PromptExample>,
}

impl PromptConfig {
    /// Shared template for a version.
    pub fn for_version(version: PromptVersion) -> Arc<PromptConfig> {
        TEMPLATES
            .get(&version)
            .cloned()
            .unwrap_or_else(|| Arc::new(build_template(version)))
    }

    pub fn negative_examples(&self) -> impl Iterator<Item = &PromptExample> {
        self.examples.iter().filter(|e| e.extractions.is_empty())
    }
}

// (source text, [(extraction text, confidence, claim type)])
type ExampleTable = &'static [(&'static str, &'static [(&'static str, f64, &'static str)])];

const V1_EXAMPLES: ExampleTable = &[
    (
        "The study showed that Drug X reduced symptoms by 50% compared to placebo.",
        &[("The study showed that Drug X reduced symptoms by 50% compared to placebo", 0.95, "")],
    ),
    (
        "Patients treated with the new therapy had a 30% improvement in quality of life.",
        &[("Patients treated with the new therapy had a 30% improvement in quality of life", 0.92, "")],
    ),
    (
        "The medication was well-tolerated with only mild side effects reported in 5% of participants.",
        &[("The medication was well-tolerated with only mild side effects reported in 5% of participants", 0.88, "")],
    ),
    (
        "Clinical trials demonstrated a 40% reduction in disease progression over 12 months.",
        &[("Clinical trials demonstrated a 40% reduction in disease progression over 12 months", 0.94, "")],
    ),
];

const V2_EXAMPLES: ExampleTable = &[
    (
        "In the randomized controlled trial, patients receiving Drug X showed a 45% reduction in symptom severity compared to placebo (p<0.001).",
        &[("patients receiving Drug X showed a 45% reduction in symptom severity compared to placebo (p<0.001)", 0.98, "efficacy")],
    ),
    (
        "The meta-analysis of 12 studies demonstrated that Treatment Y reduced hospitalization rates by 32% (95% CI: 0.58-0.81).",
        &[("Treatment Y reduced hospitalization rates by 32% (95% CI: 0.58-0.81)", 0.96, "outcome")],
    ),
    (
        "Adverse events were reported in 8.3% of patients in the treatment group versus 12.1% in controls.",
        &[("Adverse events were reported in 8.3% of patients in the treatment group versus 12.1% in controls", 0.94, "safety")],
    ),
    (
        "The pharmacokinetic study showed that Drug Z achieves peak plasma concentration within 2 hours of administration.",
        &[("Drug Z achieves peak plasma concentration within 2 hours of administration", 0.91, "pharmacokinetics")],
    ),
    (
        "In pediatric patients aged 6-12, the treatment resulted in a 55% improvement in symptom control (p=0.002).",
        &[("In pediatric patients aged 6-12, the treatment resulted in a 55% improvement in symptom control (p=0.002)", 0.97, "efficacy")],
    ),
];

const V3_EXAMPLES: ExampleTable = &[
    (
        "PRIMARY ENDPOINT: In the Phase 3 RCT (NCT-12345), Drug X achieved a 52% clinical response rate vs 28% for placebo (p<0.0001, N=450).",
        &[("Drug X achieved a 52% clinical response rate vs 28% for placebo (p<0.0001, N=450)", 0.99, "efficacy")],
    ),
    (
        "SAFETY PROFILE: Treatment-emergent adverse events led to discontinuation in 4.2% of Drug X patients vs 6.8% placebo (p=0.03).",
        &[("Treatment-emergent adverse events led to discontinuation in 4.2% of Drug X patients vs 6.8% placebo (p=0.03)", 0.97, "safety")],
    ),
    (
        "SUBGROUP ANALYSIS: In patients aged 65+, Drug X reduced cardiovascular events by 38% (HR=0.62, 95% CI: 0.45-0.85).",
        &[("In patients aged 65+, Drug X reduced cardiovascular events by 38% (HR=0.62, 95% CI: 0.45-0.85)", 0.95, "efficacy")],
    ),
    (
        "DOSAGE OPTIMIZATION: Once-daily dosing of 10mg Drug Y provided equivalent efficacy to twice-daily 5mg with improved tolerability.",
        &[("Once-daily dosing of 10mg Drug Y provided equivalent efficacy to twice-daily 5mg with improved tolerability", 0.93, "dosage")],
    ),
    (
        "COMPARATIVE EFFECTIVENESS: Drug Z was superior to standard therapy in reducing relapse rates (23% vs 35%, p=0.008) in the intent-to-treat population.",
        &[("Drug Z was superior to standard therapy in reducing relapse rates (23% vs 35%, p=0.008) in the intent-to-treat population", 0.98, "comparative")],
    ),
    (
        "LONG-TERM SAFETY: Over 5 years of follow-up, no new safety signals emerged with an adverse event rate of 0.8 per patient-year.",
        &[("Over 5 years of follow-up, no new safety signals emerged with an adverse event rate of 0.8 per patient-year", 0.96, "safety")],
    ),
];

const V4_EXAMPLES: ExampleTable = &[
    (
        "XARELTO reduced the risk of stroke and systemic embolism by 21% compared to warfarin (HR 0.79, 95% CI 0.70-0.89, p<0.001).",
        &[("XARELTO reduced the risk of stroke and systemic embolism by 21% compared to warfarin (HR 0.79, 95% CI 0.70-0.89, p<0.001)", 0.99, "EFFICACY")],
    ),
    (
        "The most common adverse reaction was bleeding, occurring in 14.9% of XARELTO-treated patients.",
        &[("The most common adverse reaction was bleeding, occurring in 14.9% of XARELTO-treated patients", 0.96, "SAFETY")],
    ),
    (
        "XARELTO is indicated for the treatment of deep vein thrombosis (DVT) and pulmonary embolism (PE).",
        &[("XARELTO is indicated for the treatment of deep vein thrombosis (DVT) and pulmonary embolism (PE)", 0.98, "INDICATION")],
    ),
    (
        "Well-tolerated in patients 75 years and older with no dose adjustment required.",
        &[("Well-tolerated in patients 75 years and older with no dose adjustment required", 0.94, "SAFETY")],
    ),
    // Negative examples: nothing to extract
    ("increase in AUCinf and a 56%", &[]),
    (
        "Atrial fibrillation is a common cardiac arrhythmia affecting millions worldwide.",
        &[],
    ),
    (
        "In the ROCKET AF trial, 14,264 patients with atrial fibrillation were randomized to receive either XARELTO or warfarin.",
        &[],
    ),
    ("Table 3: Adverse Events by Treatment Group", &[]),
    ("What is XARELTO?", &[]),
    (
        "See full prescribing information for complete safety information.",
        &[],
    ),
    // Mixed: only the drug claim is extracted
    (
        "In the ROCKET AF trial, patients receiving XARELTO showed a 45% reduction in major bleeding events compared to warfarin. Atrial fibrillation affects millions of people.",
        &[("patients receiving XARELTO showed a 45% reduction in major bleeding events compared to warfarin", 0.97, "SAFETY")],
    ),
];

static TEMPLATES: LazyLock<HashMap<PromptVersion, Arc<PromptConfig>>> = LazyLock::new(|| {
    PromptVersion::ALL
        .into_iter()
        .map(|v| (v, Arc::new(build_template(v))))
        .collect()
});

fn build_template(version: PromptVersion) -> PromptConfig {
    let (description, table) = match version {
        PromptVersion::V1Basic => (V1_BASIC_PROMPT, V1_EXAMPLES),
        PromptVersion::V2Enhanced => (V2_ENHANCED_PROMPT, V2_EXAMPLES),
        PromptVersion::V3ContextAware => (V3_CONTEXT_AWARE_PROMPT, V3_EXAMPLES),
        PromptVersion::V4Regulatory => (V4_REGULATORY_PROMPT, V4_EXAMPLES),
    };

    let examples = table
        .iter()
        .map(|(text, extractions)| PromptExample {
            text: text.to_string(),
            extractions: extractions
                .iter()
                .map(|(claim, confidence, claim_type)| {
                    let record = ExtractionRecord::new(*claim).with_confidence(*confidence);
                    if claim_type.is_empty() {
                        record
                    } else {
                        record.with_attribute("claim_type", serde_json::json!(claim_type))
                    }
                })
                .collect(),
        })
        .collect();

    PromptConfig {
        version,
        description: description.to_string(),
        examples,
    }
}

// =============================================================================
// Random sources
// =============================================================================

/// Uniform draws in [0, 1).
///
/// Injected into the version selector so tests can force a branch.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Reproducible generator for simulations.
#[derive(Debug)]
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        let mut rng = self.0.lock().unwrap_or_else(|e| e.into_inner());
        rng.random::<f64>()
    }
}

// =============================================================================
// Version selection
// =============================================================================

/// Picks the prompt version for a request.
#[derive(Clone)]
pub struct PromptVersionSelector {
    config: AbTestConfig,
    random: Arc<dyn RandomSource>,
}

impl Default for PromptVersionSelector {
    fn default() -> Self {
        Self::new(AbTestConfig::default())
    }
}

impl std::fmt::Debug for PromptVersionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptVersionSelector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PromptVersionSelector {
    pub fn new(config: AbTestConfig) -> Self {
        Self {
            config,
            random: Arc::new(ThreadRandom),
        }
    }

    /// Replace the random source.
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn config(&self) -> &AbTestConfig {
        &self.config
    }

    /// A forced version always wins. Otherwise weighted random selection
    /// by cumulative sum, falling back to the default version.
    pub fn select_version(&self, forced: Option<PromptVersion>) -> PromptVersion {
        if let Some(version) = forced {
            return version;
        }
        if !self.config.enabled {
            return self.config.default_version;
        }

        let draw = self.random.next_f64();
        let mut cumulative = 0.0;
        for (version, weight) in &self.config.weights {
            if *weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            if draw < cumulative {
                return *version;
            }
        }

        self.config.default_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedRandom, SequenceRandom};

    fn selector(draw: f64) -> PromptVersionSelector {
        PromptVersionSelector::default().with_random(Arc::new(FixedRandom::new(draw)))
    }

    #[test]
    fn test_forced_version_wins() {
        assert_eq!(
            selector(0.0).select_version(Some(PromptVersion::V1Basic)),
            PromptVersion::V1Basic
        );
    }

    #[test]
    fn test_weighted_branches() {
        assert_eq!(selector(0.05).select_version(None), PromptVersion::V3ContextAware);
        assert_eq!(selector(0.1).select_version(None), PromptVersion::V4Regulatory);
        assert_eq!(selector(0.95).select_version(None), PromptVersion::V4Regulatory);
    }

    #[test]
    fn test_zero_weights_never_selected() {
        // a draw of exactly 0.0 must not land on a zero-weight version
        assert_eq!(selector(0.0).select_version(None), PromptVersion::V3ContextAware);
    }

    #[test]
    fn test_shortfall_falls_back_to_default() {
        let config = AbTestConfig::default()
            .with_weights([(PromptVersion::V2Enhanced, 0.3), (PromptVersion::V3ContextAware, 0.3)])
            .with_default_version(PromptVersion::V1Basic);
        let selector = PromptVersionSelector::new(config)
            .with_random(Arc::new(SequenceRandom::new([0.2, 0.5, 0.9])));

        assert_eq!(selector.select_version(None), PromptVersion::V2Enhanced);
        assert_eq!(selector.select_version(None), PromptVersion::V3ContextAware);
        assert_eq!(selector.select_version(None), PromptVersion::V1Basic);
    }

    #[test]
    fn test_disabled_uses_default() {
        let selector = PromptVersionSelector::new(AbTestConfig::disabled())
            .with_random(Arc::new(FixedRandom::new(0.01)));
        assert_eq!(selector.select_version(None), PromptVersion::V4Regulatory);
    }

    #[test]
    fn test_distribution_converges_to_weights() {
        let selector =
            PromptVersionSelector::default().with_random(Arc::new(SeededRandom::new(42)));
        let draws = 20_000;
        let v3 = (0..draws)
            .filter(|_| selector.select_version(None) == PromptVersion::V3ContextAware)
            .count();
        let share = v3 as f64 / draws as f64;
        assert!((share - 0.1).abs() < 0.015, "V3 share was {share}");
    }

    #[test]
    fn test_templates_have_examples() {
        for version in PromptVersion::ALL {
            let config = PromptConfig::for_version(version);
            assert_eq!(config.version, version);
            assert!(!config.examples.is_empty());
            assert!(!config.description.is_empty());
        }
        let v4 = PromptConfig::for_version(PromptVersion::V4Regulatory);
        assert_eq!(v4.negative_examples().count(), 6);
        assert_eq!(v4.examples.len(), 11);
    }
}
