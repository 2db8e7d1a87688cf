//! The guarded-call wrapper around the breaker state machine.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::BreakerError;
use crate::state::{BreakerConfig, BreakerCore, CircuitState};

/// Called with the new state on every transition.
pub type TransitionListener = Box<dyn Fn(CircuitState) + Send + Sync>;

/// Observable breaker state, for dashboards and operator inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Earliest time an open breaker will allow a probe.
    pub next_attempt: Option<Instant>,
}

/// A circuit breaker guarding one downstream call site.
///
/// State is per-instance and process-local: replicas do not coordinate,
/// each independently learns about a failing dependency, and state is
/// rebuilt empty on process start. The wrapped call may block for its
/// full duration; the breaker observes only completion, not
/// cancellation, and imposes no timeout of its own.
pub struct CircuitBreaker {
    config: BreakerConfig,
    core: Mutex<BreakerCore>,
    listeners: Vec<TransitionListener>,
}

impl CircuitBreaker {
    /// Creates a breaker with the default thresholds (5 failures to
    /// open, 2 successes to close, 60s open timeout).
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts a builder for custom thresholds and transition listeners.
    pub fn builder() -> BreakerBuilder {
        BreakerBuilder::default()
    }

    /// Runs `op` through the breaker.
    ///
    /// While the circuit is open and `next_attempt` has not passed, the
    /// call is rejected with [`BreakerError::Open`] and `op` is never
    /// invoked. Otherwise `op` runs to completion and its outcome drives
    /// the state machine; its own error comes back as
    /// [`BreakerError::Inner`].
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let now = Instant::now();
        let acquired = {
            let mut core = self.core.lock().unwrap();
            core.try_acquire(now)
        };

        match acquired {
            Ok(transition) => {
                if let Some(state) = transition {
                    self.emit(state);
                }
            }
            Err(next_attempt) => {
                metrics::counter!("breaker_rejections_total").increment(1);
                return Err(BreakerError::Open {
                    retry_in: next_attempt.saturating_duration_since(now),
                });
            }
        }

        match op().await {
            Ok(value) => {
                let transition = self.core.lock().unwrap().record_success(&self.config);
                if let Some(state) = transition {
                    self.emit(state);
                }
                Ok(value)
            }
            Err(err) => {
                let transition = self
                    .core
                    .lock()
                    .unwrap()
                    .record_failure(&self.config, Instant::now());
                if let Some(state) = transition {
                    self.emit(state);
                }
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Current state and counters.
    pub fn stats(&self) -> BreakerStats {
        let core = self.core.lock().unwrap();
        BreakerStats {
            state: core.state,
            failure_count: core.failure_count,
            success_count: core.success_count,
            next_attempt: core.next_attempt,
        }
    }

    /// Forces the breaker closed with zeroed counters, for operator
    /// intervention.
    pub fn reset(&self) {
        let transition = self.core.lock().unwrap().reset();
        if let Some(state) = transition {
            self.emit(state);
        }
    }

    fn emit(&self, state: CircuitState) {
        metrics::counter!("breaker_transitions_total").increment(1);
        tracing::info!(%state, "breaker state changed");
        for listener in &self.listeners {
            listener(state);
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`CircuitBreaker`].
#[derive(Default)]
pub struct BreakerBuilder {
    config: BreakerConfig,
    listeners: Vec<TransitionListener>,
}

impl BreakerBuilder {
    /// Consecutive failures that trip the breaker.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Consecutive half-open successes that close it again.
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    /// How long an open breaker rejects before allowing a probe.
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.config.open_timeout = timeout;
        self
    }

    /// Adds a listener invoked with the new state on every transition.
    pub fn on_transition(mut self, listener: impl Fn(CircuitState) + Send + Sync + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Builds the breaker.
    pub fn build(self) -> CircuitBreaker {
        CircuitBreaker {
            config: self.config,
            core: Mutex::new(BreakerCore::new()),
            listeners: self.listeners,
        }
    }
}
