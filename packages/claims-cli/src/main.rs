//! Claims CLI
//!
//! Runs the regulatory claim pipeline against a document, or checks a
//! single sentence with the three-question test.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use claim_extraction::{
    CircuitBreaker, ClaimPipeline, ClaimTypeClassifier, ClaimValidator, CostTracker,
    ExtractionError, ExtractionOrchestrator, ModelTier, OpenAICompatibleExtractor,
    OrchestratorConfig, PatternLibrary, PipelineReport, PromptPlanner, PromptVersion,
    RequestContext, ResultAssembler, RunOptions,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "claims", version, about = "Extract and validate regulatory claims")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract claims from a text document
    Extract {
        /// Path to a UTF-8 text file
        file: PathBuf,

        /// Force a prompt version (v1_basic, v2_enhanced, v3_context_aware, v4_regulatory)
        #[arg(long)]
        prompt_version: Option<PromptVersion>,

        /// Force the first model tier (flash or pro)
        #[arg(long)]
        model: Option<ModelTier>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and classify a single candidate sentence
    Validate {
        text: String,

        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,claim_extraction=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let patterns = match &config.pattern_library_path {
        Some(path) => Arc::new(
            PatternLibrary::from_path(path)
                .with_context(|| format!("Failed to load pattern library {}", path.display()))?,
        ),
        None => PatternLibrary::builtin(),
    };
    let validator = ClaimValidator::new()
        .with_patterns(patterns.clone())
        .with_config(config.validator.clone());
    let classifier = ClaimTypeClassifier::with_patterns(patterns);

    match cli.command {
        Command::Extract {
            file,
            prompt_version,
            model,
            json,
        } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let extractor = OpenAICompatibleExtractor::new(config.credentials()?);
            let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
            let tracker = Arc::new(CostTracker::new());

            let orchestrator = ExtractionOrchestrator::new(Arc::new(extractor), breaker)
                .with_usage_recorder(tracker.clone())
                .with_config(OrchestratorConfig::default().with_models(config.models.clone()));
            let pipeline = ClaimPipeline::from_parts(
                PromptPlanner::default(),
                orchestrator,
                ResultAssembler::new(validator, classifier),
            );

            let ctx = RequestContext::new();
            let cancel = ctx.cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling extraction");
                    cancel.cancel();
                }
            });

            let mut options = RunOptions::new().with_context(ctx);
            options.forced_version = prompt_version;
            options.forced_tier = model;

            let report = match pipeline.run(&text, options).await {
                Ok(report) => report,
                Err(ExtractionError::Cancelled) => {
                    eprintln!("Extraction cancelled");
                    return Ok(());
                }
                Err(e) => return Err(e).context("Extraction failed"),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            let stats = tracker.stats();
            tracing::info!(
                total_tokens = stats.total_tokens,
                total_cost = stats.total_cost,
                "Estimated usage"
            );
        }

        Command::Validate { text, json } => {
            let verdict = validator.validate(&text);
            let claim_type = classifier.classify(&text);

            if json {
                let output = serde_json::json!({
                    "verdict": verdict,
                    "claim_type": claim_type,
                    "is_comparative": classifier.is_comparative(&text),
                    "has_statistics": classifier.has_statistical_evidence(&text),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("valid:       {}", verdict.is_valid);
                println!(
                    "claim type:  {}",
                    claim_type.map_or("-".to_string(), |t| t.to_string())
                );
                println!("adjustment:  {:+.2}", verdict.confidence_adjustment);
                if !verdict.warnings.is_empty() {
                    let warnings: Vec<&str> = verdict.warnings.iter().map(|w| w.as_str()).collect();
                    println!("warnings:    {}", warnings.join(", "));
                }
                println!("reasoning:   {}", verdict.reasoning);
            }
        }
    }

    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!(
        "{} claims via {} (prompt {}, {} ms)",
        report.claims.len(),
        report.method,
        report.prompt_version,
        report.processing_time_ms
    );
    for claim in &report.claims {
        let claim_type = claim
            .claim_type
            .map_or("UNTYPED".to_string(), |t| t.to_string());
        println!("  [{:.2}] {:<16} {}", claim.confidence, claim_type, claim.text);
    }
    if !report.rejected.is_empty() {
        println!("{} candidates rejected", report.rejected.len());
        for rejected in &report.rejected {
            println!("  - {} ({})", rejected.text, rejected.reasoning);
        }
    }
}
