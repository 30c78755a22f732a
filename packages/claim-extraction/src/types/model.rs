//! Model tiers, prompt versions, and extraction provenance tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Extraction model tier.
///
/// `Flash` is the cheap, fast tier; `Pro` is the most capable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Flash,
    Pro,
}

impl ModelTier {
    /// All tiers, cheapest first.
    pub const ALL: [ModelTier; 2] = [ModelTier::Flash, ModelTier::Pro];

    /// Model id used when no override is configured.
    pub fn default_model_id(&self) -> &'static str {
        match self {
            Self::Flash => "gemini-1.5-flash",
            Self::Pro => "gemini-1.5-pro",
        }
    }

    /// Short name used in provenance tags.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Flash => "flash",
            Self::Pro => "pro",
        }
    }

    /// The other tier in the two-element fallback chain.
    pub fn other(&self) -> Self {
        match self {
            Self::Flash => Self::Pro,
            Self::Pro => Self::Flash,
        }
    }

    /// Ordered attempt list: this tier first, then the other.
    pub fn fallback_chain(&self) -> [ModelTier; 2] {
        [*self, self.other()]
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Error returned when a tier or version name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for ModelTier {
    type Err = ParseEnumError;

    /// Accepts short names (`flash`, `pro`) and full model ids
    /// (`gemini-1.5-flash`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if lower == "flash" || lower.ends_with("-flash") {
            Ok(Self::Flash)
        } else if lower == "pro" || lower.ends_with("-pro") {
            Ok(Self::Pro)
        } else {
            Err(ParseEnumError {
                kind: "model tier",
                value: s.to_string(),
            })
        }
    }
}

/// Instruction template variant requested from the extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptVersion {
    #[serde(rename = "v1_basic")]
    V1Basic,
    #[serde(rename = "v2_enhanced")]
    V2Enhanced,
    #[serde(rename = "v3_context_aware")]
    V3ContextAware,
    #[default]
    #[serde(rename = "v4_regulatory")]
    V4Regulatory,
}

impl PromptVersion {
    pub const ALL: [PromptVersion; 4] = [
        PromptVersion::V1Basic,
        PromptVersion::V2Enhanced,
        PromptVersion::V3ContextAware,
        PromptVersion::V4Regulatory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1Basic => "v1_basic",
            Self::V2Enhanced => "v2_enhanced",
            Self::V3ContextAware => "v3_context_aware",
            Self::V4Regulatory => "v4_regulatory",
        }
    }
}

impl fmt::Display for PromptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptVersion {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == lower || v.as_str().split('_').next() == Some(lower.as_str()))
            .ok_or_else(|| ParseEnumError {
                kind: "prompt version",
                value: s.to_string(),
            })
    }
}

/// Which path produced a set of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionMethod {
    /// A model in the fallback chain returned candidates.
    Llm(ModelTier),
    /// Every model failed; the deterministic pattern scan ran.
    RegexFallback,
}

impl ExtractionMethod {
    /// Provenance tag, e.g. `llm_flash` or `regex_fallback`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Llm(ModelTier::Flash) => "llm_flash",
            Self::Llm(ModelTier::Pro) => "llm_pro",
            Self::RegexFallback => "regex_fallback",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::RegexFallback)
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for ExtractionMethod {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}
