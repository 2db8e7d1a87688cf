//! Circuit breaker guarding outbound calls.
//!
//! Wraps a single downstream operation (a remote call or a
//! resource-contended local one) in a CLOSED / OPEN / HALF_OPEN state
//! machine that fails fast while the dependency is unhealthy and probes
//! periodically for recovery:
//! - [`CircuitBreaker::call`] — run an operation through the breaker
//! - [`CircuitBreaker::stats`] / [`CircuitBreaker::reset`] — inspection
//!   and operator intervention
//! - transition listeners for observability

pub mod breaker;
pub mod error;
pub mod state;

pub use breaker::{BreakerBuilder, BreakerStats, CircuitBreaker, TransitionListener};
pub use error::BreakerError;
pub use state::{BreakerConfig, CircuitState};
