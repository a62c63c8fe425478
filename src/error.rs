//! Error types shared across the crate.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Errors produced by the combinators themselves, as opposed to errors a
/// promise was rejected with by user code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PromiseError {
    /// The promise was cancelled through its [`CancelContext`](crate::cancel::CancelContext).
    #[error("promise cancelled")]
    Cancelled,

    /// A completion handler was invoked with neither a value nor an error,
    /// or with both.
    #[error("completion handler called with an invalid value/error combination")]
    InvalidCallingConvention,

    /// An aggregate combinator was handed input it cannot operate on,
    /// such as an empty list passed to `race` or a concurrency limit of zero.
    #[error("bad input to combinator")]
    BadInput,

    /// A sequence combinator needed at least one element and got none.
    #[error("empty sequence")]
    EmptySequence,

    /// `compact_map` produced `None`.
    #[error("compact_map transform returned None")]
    CompactMap,

    /// A chaining closure returned the promise it was chained on.
    #[error("chaining closure returned the receiver promise")]
    ReturnedSelf,

    /// Every candidate handed to `race_fulfilled` rejected.
    #[error("no promise was fulfilled")]
    NoWinner,

    /// A timed wait elapsed before the promise settled.
    #[error("timed out waiting for promise")]
    TimedOut,

    /// The `Resolver` for a pending promise was dropped without settling it.
    #[error("resolver dropped before the promise was settled")]
    ResolverDropped,
}

/// Ad-hoc string error used by [`Rejection::message`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageError(String);

/// The error half of a [`Resolution`](crate::Resolution).
///
/// A `Rejection` is a cheaply clonable, type-erased error. Cloning shares the
/// underlying error rather than duplicating it, which is what lets a single
/// rejection fan out to every observer of a settled promise.
#[derive(Clone)]
pub struct Rejection {
    error: Arc<dyn StdError + Send + Sync>,
    cancelled: bool,
}

impl Rejection {
    /// Wraps an error. If the error is [`PromiseError::Cancelled`] the
    /// rejection is marked as a cancellation.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let error: Arc<dyn StdError + Send + Sync> = Arc::new(error);
        let cancelled = matches!(
            error.downcast_ref::<PromiseError>(),
            Some(PromiseError::Cancelled)
        );
        Rejection { error, cancelled }
    }

    /// Wraps a plain message string.
    pub fn message(msg: impl Into<String>) -> Self {
        Rejection::new(MessageError(msg.into()))
    }

    /// The canonical cancellation rejection.
    pub fn cancelled() -> Self {
        Rejection::new(PromiseError::Cancelled)
    }

    /// Wraps an arbitrary error and forces the cancellation mark, for tasks
    /// that surface cancellation through their own error type.
    pub fn cancelled_with<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Rejection { error: Arc::new(error), cancelled: true }
    }

    /// Whether this rejection represents cancellation rather than failure.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Attempts to view the underlying error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    /// Borrows the underlying error.
    pub fn as_error(&self) -> &(dyn StdError + 'static) {
        &*self.error
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl fmt::Debug for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rejection")
            .field("error", &self.error)
            .field("cancelled", &self.cancelled)
            .finish()
    }
}

impl StdError for Rejection {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.error.source()
    }
}

impl From<PromiseError> for Rejection {
    fn from(e: PromiseError) -> Self {
        Rejection::new(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_detected_on_wrap() {
        assert!(Rejection::new(PromiseError::Cancelled).is_cancelled());
        assert!(!Rejection::new(PromiseError::BadInput).is_cancelled());
        assert!(Rejection::cancelled_with(MessageError("shutdown".into())).is_cancelled());
    }

    #[test]
    fn downcast_reaches_the_wrapped_error() {
        let r = Rejection::new(PromiseError::NoWinner);
        assert_eq!(r.downcast_ref::<PromiseError>(), Some(&PromiseError::NoWinner));
        assert!(r.downcast_ref::<MessageError>().is_none());
    }
}
