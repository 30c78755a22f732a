//! Process-wide circuit breaker for the extraction capability.
//!
//! State lives behind one mutex; every transition happens in a single
//! critical section. Callers take a [`CircuitPermit`] before calling the
//! extractor and report the outcome through it. A permit dropped without
//! an outcome (a cancelled request) never counts as a success.

use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::CircuitOpenError;
use crate::types::config::CircuitBreakerConfig;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub since_last_failure: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    trial_in_flight: bool,
}

impl Inner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure: None,
            trial_in_flight: false,
        }
    }
}

/// Consecutive-failure circuit breaker shared by all requests.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::closed()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ask permission for one call.
    ///
    /// In `Open`, the first call after the recovery timeout becomes the
    /// single half-open trial; everything else is rejected.
    pub fn acquire(&self) -> Result<CircuitPermit<'_>, CircuitOpenError> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(CircuitPermit::new(self, false)),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed > self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    tracing::info!(
                        failure_count = inner.failure_count,
                        "Circuit breaker half-open, allowing trial call"
                    );
                    Ok(CircuitPermit::new(self, true))
                } else {
                    let remaining = self.config.recovery_timeout.saturating_sub(elapsed);
                    Err(CircuitOpenError {
                        retry_in_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(CircuitOpenError { retry_in_ms: 0 })
                } else {
                    inner.trial_in_flight = true;
                    Ok(CircuitPermit::new(self, true))
                }
            }
        }
    }

    /// Run `f` under the breaker.
    ///
    /// Returns `Err` without calling `f` when the circuit rejects the call.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<Result<T, E>, CircuitOpenError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.acquire()?;
        let result = f().await;
        match &result {
            Ok(_) => permit.record_success(),
            Err(_) => permit.record_failure(),
        }
        Ok(result)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            since_last_failure: inner.last_failure.map(|t| t.elapsed()),
        }
    }

    /// Operator reset: back to `Closed` with no failure history.
    pub fn reset(&self) {
        *self.lock() = Inner::closed();
        tracing::info!("Circuit breaker reset");
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        // a slow call that began before the circuit opened does not close it
        if trial || inner.state == CircuitState::Closed {
            if inner.state != CircuitState::Closed {
                tracing::info!("Circuit breaker closed after successful trial");
            }
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            inner.trial_in_flight = false;
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());

        if trial {
            inner.trial_in_flight = false;
        }
        if inner.state != CircuitState::Open
            && (trial || inner.failure_count >= self.config.failure_threshold)
        {
            inner.state = CircuitState::Open;
            tracing::warn!(
                failure_count = inner.failure_count,
                recovery_secs = self.config.recovery_timeout.as_secs(),
                "Circuit breaker opened"
            );
        }
    }

    fn on_abandon(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Open;
            inner.trial_in_flight = false;
            tracing::debug!("Half-open trial abandoned, circuit back to open");
        }
    }
}

/// Permission for one guarded call.
///
/// Report the outcome with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). Dropping the permit without
/// either releases a half-open trial slot without counting an outcome.
#[must_use = "report the call outcome through the permit"]
#[derive(Debug)]
pub struct CircuitPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> CircuitPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            settled: false,
        }
    }

    /// True if this permit is the half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for CircuitPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandon(self.trial);
        }
    }
}
