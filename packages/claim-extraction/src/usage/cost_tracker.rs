//! Estimated token usage and cost per model.
//!
//! Token counts are heuristics (about four characters per token), not
//! tokenizer output. Prices are per 1K tokens.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::traits::usage::UsageRecorder;

/// History entries kept per request id.
const MAX_HISTORY_PER_REQUEST: usize = 1000;

/// Request ids with history; the oldest is evicted first.
const MAX_TRACKED_REQUESTS: usize = 1000;

const MIN_COMPLETION_TOKENS: u64 = 50;

/// Input and output price per 1K tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPrice {
    pub input: f64,
    pub output: f64,
}

const DEFAULT_PRICES: &[(&str, ModelPrice)] = &[
    (
        "gemini-1.5-flash",
        ModelPrice {
            input: 0.000075,
            output: 0.0003,
        },
    ),
    (
        "gemini-1.5-pro",
        ModelPrice {
            input: 0.00125,
            output: 0.005,
        },
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenUsage {
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelUsage {
    pub cost: f64,
    pub tokens: u64,
    pub requests: u64,
    pub avg_cost_per_request: f64,
    pub avg_tokens_per_request: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageStats {
    pub total_cost: f64,
    pub total_tokens: u64,
    pub total_requests: u64,
    pub cost_per_token: f64,
    pub models: IndexMap<String, ModelUsage>,
}

#[derive(Debug, Default)]
struct Ledger {
    total_cost: f64,
    total_tokens: u64,
    total_requests: u64,
    models: IndexMap<String, ModelUsage>,
    history: IndexMap<String, VecDeque<TokenUsage>>,
}

/// Thread-safe usage ledger.
#[derive(Debug)]
pub struct CostTracker {
    prices: HashMap<String, ModelPrice>,
    max_tracked_requests: usize,
    ledger: Mutex<Ledger>,
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CostTracker {
    pub fn new() -> Self {
        Self {
            prices: DEFAULT_PRICES
                .iter()
                .map(|(model, price)| (model.to_string(), *price))
                .collect(),
            max_tracked_requests: MAX_TRACKED_REQUESTS,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Add or replace the price of a model.
    pub fn with_price(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    /// Bound the number of request ids whose history is kept.
    pub fn with_max_tracked_requests(mut self, max: usize) -> Self {
        self.max_tracked_requests = max.max(1);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// About four characters per token, plus 10% for Gemini models.
    pub fn estimate_tokens(text: &str, model: &str) -> u64 {
        let estimated = (text.chars().count() as u64 / 4).max(1);
        if model.contains("gemini") {
            (estimated as f64 * 1.1) as u64
        } else {
            estimated
        }
    }

    /// Zero for models without a price.
    pub fn calculate_cost(&self, model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        match self.prices.get(model) {
            Some(price) => {
                prompt_tokens as f64 / 1000.0 * price.input
                    + completion_tokens as f64 / 1000.0 * price.output
            }
            None => {
                tracing::warn!(model, "Unknown model for cost calculation");
                0.0
            }
        }
    }

    /// Record one call. Completion tokens default to a third of the prompt.
    pub fn record(
        &self,
        request_id: &str,
        prompt_text: &str,
        model: &str,
        completion_tokens: Option<u64>,
    ) -> TokenUsage {
        let prompt_tokens = Self::estimate_tokens(prompt_text, model);
        let completion_tokens =
            completion_tokens.unwrap_or_else(|| (prompt_tokens / 3).max(MIN_COMPLETION_TOKENS));
        let total_tokens = prompt_tokens + completion_tokens;
        let cost = self.calculate_cost(model, prompt_tokens, completion_tokens);

        let usage = TokenUsage {
            model: model.to_string(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
            cost,
            timestamp: Utc::now(),
        };

        {
            let mut ledger = self.lock();
            ledger.total_cost += cost;
            ledger.total_tokens += total_tokens;
            ledger.total_requests += 1;

            let entry = ledger.models.entry(model.to_string()).or_default();
            entry.cost += cost;
            entry.tokens += total_tokens;
            entry.requests += 1;

            if !ledger.history.contains_key(request_id)
                && ledger.history.len() >= self.max_tracked_requests
            {
                ledger.history.shift_remove_index(0);
            }
            let history = ledger.history.entry(request_id.to_string()).or_default();
            if history.len() >= MAX_HISTORY_PER_REQUEST {
                history.pop_front();
            }
            history.push_back(usage.clone());
        }

        tracing::info!(
            request_id,
            model,
            prompt_tokens,
            completion_tokens,
            total_tokens,
            estimated_cost = cost,
            "Token usage recorded"
        );

        usage
    }

    pub fn stats(&self) -> UsageStats {
        let ledger = self.lock();
        let models = ledger
            .models
            .iter()
            .map(|(model, usage)| {
                let requests = usage.requests.max(1) as f64;
                (
                    model.clone(),
                    ModelUsage {
                        avg_cost_per_request: usage.cost / requests,
                        avg_tokens_per_request: usage.tokens as f64 / requests,
                        ..usage.clone()
                    },
                )
            })
            .collect();

        UsageStats {
            total_cost: ledger.total_cost,
            total_tokens: ledger.total_tokens,
            total_requests: ledger.total_requests,
            cost_per_token: ledger.total_cost / ledger.total_tokens.max(1) as f64,
            models,
        }
    }

    /// Usage history for one request, oldest first.
    pub fn request_usage(&self, request_id: &str) -> Vec<TokenUsage> {
        self.lock()
            .history
            .get(request_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        *self.lock() = Ledger::default();
    }
}

impl UsageRecorder for CostTracker {
    fn record_usage(&self, request_id: &str, prompt_text: &str, model_id: &str) {
        self.record(request_id, prompt_text, model_id, None);
    }
}
