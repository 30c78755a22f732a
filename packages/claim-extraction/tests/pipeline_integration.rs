//! Integration tests for the claim pipeline.
//!
//! These tests drive the public API end to end:
//! 1. Plan model tier and prompt version
//! 2. Walk the model fallback chain under a shared circuit breaker
//! 3. Fall back to the regex scan when every model fails
//! 4. Validate, classify and band the survivors

use std::sync::Arc;
use std::time::Duration;

use claim_extraction::{
    testing::MockExtractor, CircuitBreaker, CircuitBreakerConfig, CircuitState, ClaimPipeline,
    ClaimType, ClaimValidator, CostTracker, ExtractionError, ExtractionMethod,
    ExtractionOrchestrator, ExtractionRecord, ExtractionResult, ExtractorError, ModelTier,
    OrchestratorConfig, PatternLibrary, PromptPlanner, RequestContext, ResultAssembler,
    RetryConfig, RunOptions, WarningKind,
};

const FLASH: &str = "gemini-1.5-flash";
const PRO: &str = "gemini-1.5-pro";

const DOCUMENT: &str = "XARELTO reduced the risk of stroke by 21% compared to warfarin. \
The ROCKET AF trial demonstrated non-inferiority.";

const LITERAL_SCENARIOS: [&str; 8] = [
    "XARELTO reduced the risk of stroke by 21% compared to warfarin",
    "Well-tolerated in patients 75 years and older",
    "Indicated for the treatment of atrial fibrillation",
    "increase in AUCinf and a 56%",
    "Atrial fibrillation affects 2.7 million Americans",
    "Patients were randomized 1:1 to receive either XARELTO or placebo",
    "Table 3: Adverse Events by Treatment Group",
    "XARELTO is a tablet",
];

fn records(texts: &[&str]) -> ExtractionResult {
    ExtractionResult::new(
        texts
            .iter()
            .map(|t| ExtractionRecord::new(*t).with_confidence(0.9))
            .collect(),
    )
}

/// Pipeline with no retries so failures are counted once per model.
fn pipeline(
    extractor: Arc<MockExtractor>,
    breaker: Arc<CircuitBreaker>,
    tracker: Arc<CostTracker>,
) -> ClaimPipeline {
    let orchestrator = ExtractionOrchestrator::new(extractor, breaker)
        .with_usage_recorder(tracker)
        .with_config(OrchestratorConfig::default().with_retry(RetryConfig::none()));
    ClaimPipeline::from_parts(PromptPlanner::default(), orchestrator, ResultAssembler::default())
}

#[tokio::test]
async fn test_literal_scenarios_through_pipeline() {
    let extractor = Arc::new(MockExtractor::new().with_response(FLASH, records(&LITERAL_SCENARIOS)));
    let tracker = Arc::new(CostTracker::new());
    let pipeline = pipeline(extractor, Arc::new(CircuitBreaker::default()), tracker.clone());

    let report = pipeline
        .run(DOCUMENT, RunOptions::new().with_model(ModelTier::Flash))
        .await
        .unwrap();

    assert_eq!(report.method, ExtractionMethod::Llm(ModelTier::Flash));
    let texts: Vec<&str> = report.claims.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, LITERAL_SCENARIOS[..3].to_vec());

    let first = &report.claims[0];
    assert!(first.is_comparative);
    assert!(first.has_statistics);
    assert!(matches!(
        first.claim_type,
        Some(ClaimType::Efficacy) | Some(ClaimType::Comparative)
    ));
    assert_eq!(report.claims[1].claim_type, Some(ClaimType::Safety));
    assert_eq!(report.claims[2].claim_type, Some(ClaimType::Indication));
    assert!(report.claims.iter().all(|c| (0.0..=1.0).contains(&c.confidence)));

    assert_eq!(report.rejected.len(), 5);
    let background = report
        .rejected
        .iter()
        .find(|r| r.text.starts_with("Atrial"))
        .unwrap();
    assert!(background.warnings.contains(&WarningKind::BackgroundInfo));

    // usage recorded once for the successful model
    let stats = tracker.stats();
    assert_eq!(stats.total_requests, 1);
    assert_eq!(tracker.request_usage(&report.request_id).len(), 1);
    assert!(stats.models.contains_key(FLASH));
}

#[tokio::test]
async fn test_empty_responses_fall_back_to_regex() {
    let extractor = Arc::new(
        MockExtractor::new()
            .with_error(FLASH, ExtractorError::empty_response(FLASH, "no tokens"))
            .with_error(PRO, ExtractorError::empty_response(PRO, "no tokens")),
    );
    let tracker = Arc::new(CostTracker::new());
    let pipeline = pipeline(extractor.clone(), Arc::new(CircuitBreaker::default()), tracker.clone());

    let report = pipeline
        .run(DOCUMENT, RunOptions::new().with_model(ModelTier::Flash))
        .await
        .unwrap();

    assert_eq!(extractor.calls_for(FLASH), 1);
    assert_eq!(extractor.calls_for(PRO), 1);
    assert_eq!(report.method.tag(), "regex_fallback");
    assert_eq!(report.attempts.len(), 2);

    // "reduced the risk of stroke by 21%" survives as a lowercase fragment
    assert_eq!(report.claims.len(), 1);
    assert!(report.claims[0].warnings.contains(&WarningKind::Fragment));
    assert!(report.claims[0].confidence < 0.5);
    assert_eq!(report.bands.low, 1);

    assert_eq!(tracker.stats().total_requests, 0);
}

#[tokio::test]
async fn test_fallback_with_nothing_to_find_is_empty_not_error() {
    let pipeline = pipeline(
        Arc::new(MockExtractor::new()),
        Arc::new(CircuitBreaker::default()),
        Arc::new(CostTracker::new()),
    );

    let report = pipeline
        .run("Atrial fibrillation is common.", RunOptions::new())
        .await
        .unwrap();

    assert!(report.method.is_fallback());
    assert!(report.claims.is_empty());
    assert!(report.rejected.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_breaker_shared_across_pipelines() {
    let breaker = Arc::new(CircuitBreaker::new(
        CircuitBreakerConfig::default()
            .with_failure_threshold(2)
            .with_recovery_timeout(Duration::from_secs(60)),
    ));
    let failing = Arc::new(MockExtractor::new());
    let healthy = Arc::new(MockExtractor::new().with_response(FLASH, records(&LITERAL_SCENARIOS[..1])));

    let a = pipeline(failing.clone(), breaker.clone(), Arc::new(CostTracker::new()));
    let b = pipeline(healthy.clone(), breaker.clone(), Arc::new(CostTracker::new()));
    let options = || RunOptions::new().with_model(ModelTier::Flash);

    // both models fail: two consecutive failures open the circuit
    a.run(DOCUMENT, options()).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);

    // a healthy extractor behind the same breaker is not called
    let report = b.run(DOCUMENT, options()).await.unwrap();
    assert!(report.method.is_fallback());
    assert!(healthy.calls().is_empty());

    // after the recovery timeout one trial goes through and closes the circuit
    tokio::time::advance(Duration::from_secs(61)).await;
    let report = b.run(DOCUMENT, options()).await.unwrap();
    assert_eq!(report.method, ExtractionMethod::Llm(ModelTier::Flash));
    assert_eq!(healthy.calls_for(FLASH), 1);

    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, CircuitState::Closed);
    assert_eq!(snapshot.failure_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_in_flight_call() {
    let extractor = Arc::new(
        MockExtractor::new()
            .with_delay(Duration::from_secs(30))
            .with_response(FLASH, records(&LITERAL_SCENARIOS[..1])),
    );
    let breaker = Arc::new(CircuitBreaker::default());
    let pipeline = pipeline(extractor.clone(), breaker.clone(), Arc::new(CostTracker::new()));

    let ctx = RequestContext::new();
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let result = pipeline
        .run(DOCUMENT, RunOptions::new().with_model(ModelTier::Flash).with_context(ctx))
        .await;

    assert!(matches!(result, Err(ExtractionError::Cancelled)));
    assert_eq!(extractor.calls_for(FLASH), 1);
    assert_eq!(extractor.calls_for(PRO), 0);
    assert_eq!(breaker.snapshot().failure_count, 0);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_trial_is_not_a_success() {
    let breaker = Arc::new(CircuitBreaker::new(
        CircuitBreakerConfig::default().with_failure_threshold(1),
    ));
    breaker.acquire().unwrap().record_failure();
    tokio::time::advance(Duration::from_secs(301)).await;

    let extractor = Arc::new(
        MockExtractor::new()
            .with_delay(Duration::from_secs(30))
            .with_response(FLASH, records(&LITERAL_SCENARIOS[..1])),
    );
    let pipeline = pipeline(extractor, breaker.clone(), Arc::new(CostTracker::new()));

    let ctx = RequestContext::new();
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });
    let result = pipeline
        .run(DOCUMENT, RunOptions::new().with_model(ModelTier::Flash).with_context(ctx))
        .await;

    assert!(matches!(result, Err(ExtractionError::Cancelled)));
    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.failure_count, 1);
    assert!(breaker.acquire().unwrap().is_trial());
}

#[tokio::test]
async fn test_empty_input_makes_no_calls() {
    let extractor = Arc::new(MockExtractor::new());
    let pipeline = pipeline(
        extractor.clone(),
        Arc::new(CircuitBreaker::default()),
        Arc::new(CostTracker::new()),
    );

    let result = pipeline.run(" \t\n ", RunOptions::new()).await;
    assert!(matches!(result, Err(ExtractionError::EmptyInput)));
    assert_eq!(
        result.unwrap_err().to_string(),
        "cannot extract from empty input"
    );
    assert!(extractor.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_record_usage_once_each() {
    let extractor = Arc::new(MockExtractor::new().with_response(FLASH, records(&LITERAL_SCENARIOS[..3])));
    let tracker = Arc::new(CostTracker::new());
    let pipeline = Arc::new(pipeline(
        extractor.clone(),
        Arc::new(CircuitBreaker::default()),
        tracker.clone(),
    ));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                pipeline
                    .run(DOCUMENT, RunOptions::new().with_model(ModelTier::Flash))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.claims.len(), 3);
    }
    assert_eq!(extractor.calls_for(FLASH), 20);
    assert_eq!(tracker.stats().total_requests, 20);
}

#[test]
fn test_pattern_library_swaps_behavior_without_code_changes() {
    let claim = "XARELTO reduced the risk of stroke by 21% compared to warfarin";
    assert!(ClaimValidator::new().validate(claim).is_valid);

    let library = PatternLibrary::from_json(
        r#"{"categories": {"background": [{"label": "comparator", "pattern": "\\bwarfarin\\b"}]}}"#,
    )
    .unwrap();
    let verdict = ClaimValidator::new()
        .with_patterns(Arc::new(library))
        .validate(claim);

    assert!(!verdict.is_valid);
    assert!(verdict.has_warning(WarningKind::BackgroundInfo));
    assert!(!verdict.is_about_drug);
}
