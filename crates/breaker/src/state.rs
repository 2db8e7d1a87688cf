//! Breaker state machine.
//!
//! Transitions are pure functions of the current state, the
//! configuration, and an explicit `now`; nothing here touches the real
//! clock, so every transition is unit-testable without sleeping.

use std::time::{Duration, Instant};

/// The three breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls are attempted; failures are counted.
    Closed,
    /// Calls are rejected fast until `next_attempt`.
    Open,
    /// Probing: calls are attempted; one failure re-opens.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        write!(f, "{name}")
    }
}

/// Breaker thresholds and timing.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures in `Closed` that trip the breaker (default 5).
    pub failure_threshold: u32,

    /// Consecutive successes in `HalfOpen` that close it again (default 2).
    pub success_threshold: u32,

    /// How long an open breaker rejects before allowing a probe (default 60s).
    pub open_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(60),
        }
    }
}

/// Mutable breaker state; process-local, rebuilt empty on every start.
#[derive(Debug)]
pub(crate) struct BreakerCore {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub next_attempt: Option<Instant>,
}

impl BreakerCore {
    pub fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            next_attempt: None,
        }
    }

    /// Decides whether a call may proceed at `now`.
    ///
    /// `Ok(transition)` means proceed, carrying the transition to emit if
    /// the open timeout elapsed and the breaker moved to `HalfOpen`.
    /// `Err(next_attempt)` means reject without invoking the call.
    pub fn try_acquire(&mut self, now: Instant) -> Result<Option<CircuitState>, Instant> {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(None),
            CircuitState::Open => {
                let next_attempt = self.next_attempt.unwrap_or(now);
                if now >= next_attempt {
                    self.state = CircuitState::HalfOpen;
                    self.success_count = 0;
                    Ok(Some(CircuitState::HalfOpen))
                } else {
                    Err(next_attempt)
                }
            }
        }
    }

    /// Records a completed call that succeeded.
    pub fn record_success(&mut self, config: &BreakerConfig) -> Option<CircuitState> {
        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
                None
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.success_threshold {
                    self.state = CircuitState::Closed;
                    self.failure_count = 0;
                    self.success_count = 0;
                    self.next_attempt = None;
                    Some(CircuitState::Closed)
                } else {
                    None
                }
            }
            // A probe completing after another probe already re-opened:
            // the re-open wins.
            CircuitState::Open => None,
        }
    }

    /// Records a completed call that failed.
    pub fn record_failure(&mut self, config: &BreakerConfig, now: Instant) -> Option<CircuitState> {
        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= config.failure_threshold {
                    self.trip(config, now);
                    Some(CircuitState::Open)
                } else {
                    None
                }
            }
            // Single strike while probing
            CircuitState::HalfOpen => {
                self.trip(config, now);
                Some(CircuitState::Open)
            }
            CircuitState::Open => None,
        }
    }

    /// Forces the breaker closed with zeroed counters. Returns the
    /// transition if the state actually changed.
    pub fn reset(&mut self) -> Option<CircuitState> {
        let changed = self.state != CircuitState::Closed;
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.success_count = 0;
        self.next_attempt = None;
        changed.then_some(CircuitState::Closed)
    }

    fn trip(&mut self, config: &BreakerConfig, now: Instant) {
        self.state = CircuitState::Open;
        self.success_count = 0;
        self.next_attempt = Some(now + config.open_timeout);
    }
}
