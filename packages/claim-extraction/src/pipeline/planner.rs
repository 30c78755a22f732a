//! Per-request choice of model tier and prompt template.

use serde::Serialize;
use std::sync::Arc;

use super::complexity::{ComplexityAnalysis, ModelSelector};
use super::prompts::{PromptConfig, PromptVersionSelector};
use crate::types::model::{ModelTier, PromptVersion};

/// What the orchestrator should run for one document.
#[derive(Debug, Clone, Serialize)]
pub struct PromptPlan {
    pub tier: ModelTier,
    pub version: PromptVersion,
    #[serde(skip)]
    pub prompt: Arc<PromptConfig>,
    pub complexity: ComplexityAnalysis,
}

/// Combines the model selector and the prompt version selector.
#[derive(Debug, Clone, Default)]
pub struct PromptPlanner {
    model_selector: ModelSelector,
    version_selector: PromptVersionSelector,
}

impl PromptPlanner {
    pub fn new(model_selector: ModelSelector, version_selector: PromptVersionSelector) -> Self {
        Self {
            model_selector,
            version_selector,
        }
    }

    pub fn with_model_selector(mut self, selector: ModelSelector) -> Self {
        self.model_selector = selector;
        self
    }

    pub fn with_version_selector(mut self, selector: PromptVersionSelector) -> Self {
        self.version_selector = selector;
        self
    }

    /// Plan a request. Forced values bypass their selector.
    pub fn plan(
        &self,
        text: &str,
        forced_version: Option<PromptVersion>,
        forced_tier: Option<ModelTier>,
    ) -> PromptPlan {
        let complexity = ComplexityAnalysis::analyze(text);
        let tier = forced_tier.unwrap_or_else(|| self.model_selector.select_for(&complexity));
        let version = self.version_selector.select_version(forced_version);

        tracing::info!(
            model = %tier,
            prompt_version = %version,
            score = complexity.score,
            length = complexity.length,
            has_stats = complexity.has_stats,
            has_references = complexity.has_references,
            "Prompt plan selected"
        );

        PromptPlan {
            tier,
            version,
            prompt: PromptConfig::for_version(version),
            complexity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedRandom;

    #[test]
    fn test_plan_uses_selectors() {
        let planner = PromptPlanner::default().with_version_selector(
            PromptVersionSelector::default().with_random(Arc::new(FixedRandom::new(0.05))),
        );
        let plan = planner.plan("XARELTO reduced stroke by 21%.", None, None);

        assert_eq!(plan.tier, ModelTier::Flash);
        assert_eq!(plan.version, PromptVersion::V3ContextAware);
        assert_eq!(plan.prompt.version, PromptVersion::V3ContextAware);
        assert!(plan.complexity.has_stats);
    }

    #[test]
    fn test_forced_values_win() {
        let plan = PromptPlanner::default().plan(
            "short",
            Some(PromptVersion::V1Basic),
            Some(ModelTier::Pro),
        );
        assert_eq!(plan.tier, ModelTier::Pro);
        assert_eq!(plan.version, PromptVersion::V1Basic);
        assert_eq!(plan.prompt.description, crate::pipeline::prompts::V1_BASIC_PROMPT);
    }
}
