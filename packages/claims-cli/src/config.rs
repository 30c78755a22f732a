//! Environment configuration for the claims CLI.
//!
//! Variables (a `.env` file is loaded first if present):
//! - `EXTRACTOR_API_KEY` - required for `extract`
//! - `EXTRACTOR_BASE_URL` - OpenAI-compatible endpoint
//! - `FLASH_MODEL_ID` / `PRO_MODEL_ID`
//! - `CIRCUIT_FAILURE_THRESHOLD` / `CIRCUIT_RECOVERY_SECS`
//! - `MIN_WORD_COUNT`
//! - `PATTERN_LIBRARY_PATH` - JSON pattern overrides

use anyhow::{Context, Result};
use claim_extraction::security::DEFAULT_BASE_URL;
use claim_extraction::{
    CircuitBreakerConfig, ExtractorCredentials, ModelIds, SecretString, ValidatorConfig,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub models: ModelIds,
    pub breaker: CircuitBreakerConfig,
    pub validator: ValidatorConfig,
    pub pattern_library_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let defaults = ModelIds::default();
        let models = ModelIds {
            flash: get("FLASH_MODEL_ID").unwrap_or(defaults.flash),
            pro: get("PRO_MODEL_ID").unwrap_or(defaults.pro),
        };

        let mut breaker = CircuitBreakerConfig::default();
        if let Some(threshold) = parse::<u32>(&get, "CIRCUIT_FAILURE_THRESHOLD")? {
            breaker = breaker.with_failure_threshold(threshold);
        }
        if let Some(secs) = parse::<u64>(&get, "CIRCUIT_RECOVERY_SECS")? {
            breaker = breaker.with_recovery_timeout(Duration::from_secs(secs));
        }

        let mut validator = ValidatorConfig::default();
        if let Some(words) = parse::<usize>(&get, "MIN_WORD_COUNT")? {
            validator = validator.with_min_word_count(words);
        }

        Ok(Self {
            api_key: get("EXTRACTOR_API_KEY").map(SecretString::from),
            base_url: get("EXTRACTOR_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            models,
            breaker,
            validator,
            pattern_library_path: get("PATTERN_LIBRARY_PATH").map(PathBuf::from),
        })
    }

    pub fn credentials(&self) -> Result<ExtractorCredentials> {
        let api_key = self
            .api_key
            .as_ref()
            .context("EXTRACTOR_API_KEY must be set to extract claims")?;
        Ok(ExtractorCredentials::new(api_key.expose())
            .with_base_url(&self.base_url)
            .with_models(self.models.clone()))
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{name} has an invalid value: {raw}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.models, ModelIds::default());
        assert_eq!(config.breaker.failure_threshold, 3);
        assert_eq!(config.validator.min_word_count, 5);
        assert!(config.credentials().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("EXTRACTOR_API_KEY", "AIza-test"),
            ("PRO_MODEL_ID", "gemini-2.0-pro"),
            ("CIRCUIT_FAILURE_THRESHOLD", "5"),
            ("CIRCUIT_RECOVERY_SECS", "30"),
            ("MIN_WORD_COUNT", "4"),
            ("PATTERN_LIBRARY_PATH", "rules.json"),
        ])
        .unwrap();

        assert_eq!(config.models.pro, "gemini-2.0-pro");
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.breaker.recovery_timeout, Duration::from_secs(30));
        assert_eq!(config.validator.min_word_count, 4);
        assert_eq!(config.pattern_library_path, Some(PathBuf::from("rules.json")));
        assert_eq!(config.credentials().unwrap().api_key.expose(), "AIza-test");
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = config(&[("MIN_WORD_COUNT", "five")]).unwrap_err();
        assert!(err.to_string().contains("MIN_WORD_COUNT"));
    }
}
