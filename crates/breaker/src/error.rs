//! Breaker error types.

use std::time::Duration;

use thiserror::Error;

/// Error returned by a guarded call.
///
/// `Open` is the breaker's own fast rejection: the wrapped operation was
/// never invoked. It is a self-protective hint, not a dependency
/// failure, and must be told apart from `Inner` when reported upward.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the call was rejected without being attempted.
    #[error("circuit open, retry in {retry_in:?}")]
    Open { retry_in: Duration },

    /// The wrapped operation ran and failed with its own error.
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// True if this is the breaker's own rejection rather than a failure
    /// of the wrapped operation.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Extracts the wrapped operation's error, if this is one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Open { .. } => None,
            Self::Inner(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_inner_are_distinguishable() {
        let open: BreakerError<std::io::Error> = BreakerError::Open {
            retry_in: Duration::from_secs(30),
        };
        assert!(open.is_open());
        assert!(open.into_inner().is_none());

        let inner: BreakerError<std::io::Error> =
            BreakerError::Inner(std::io::Error::other("downstream"));
        assert!(!inner.is_open());
        assert!(inner.into_inner().is_some());
    }
}
