//! Usage and cost accounting for model calls.

pub mod cost_tracker;

pub use cost_tracker::{CostTracker, ModelPrice, ModelUsage, TokenUsage, UsageStats};
