//! Usage recording seam.

/// Consumes one record per successful model extraction.
///
/// Never called for the regex fallback.
#[cfg_attr(test, mockall::automock)]
pub trait UsageRecorder: Send + Sync {
    fn record_usage(&self, request_id: &str, prompt_text: &str, model_id: &str);
}

/// Recorder that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUsageRecorder;

impl UsageRecorder for NoopUsageRecorder {
    fn record_usage(&self, _request_id: &str, _prompt_text: &str, _model_id: &str) {}
}
