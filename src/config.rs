//! Process-wide defaults: the dispatcher continuations run on when no
//! explicit one is given, the catch policy, and the diagnostic log sink.

use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::dispatch::{Dispatcher, SerialDispatcher};
use crate::error::Rejection;

/// Diagnostic events emitted by the library.
///
/// None of these are errors in the `Result` sense; they flag usage patterns
/// that are usually bugs in the calling program.
#[derive(Debug)]
#[non_exhaustive]
pub enum LogEvent {
    /// `wait()` was called on a thread named `main`.
    BlockingWait,
    /// A promise was dropped while still pending, with no resolver alive to
    /// settle it.
    PendingDropped,
    /// A resolver was invoked after its promise had already settled; the
    /// second settlement was discarded.
    DoubleSettle,
    /// A rejected promise was dropped without any rejection handler having
    /// observed the error.
    Cauterized(Rejection),
    /// A continuation panicked on a worker dispatcher; the panic was caught
    /// so the queue survives.
    ContinuationPanicked,
}

/// Where [`LogEvent`]s go.
#[derive(Clone, Default)]
pub enum LogSink {
    /// Discard events.
    Silent,
    /// Emit events through `tracing` at warn level.
    #[default]
    Console,
    /// Hand events to a user callback.
    Custom(Arc<dyn Fn(&LogEvent) + Send + Sync>),
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Silent => f.write_str("Silent"),
            LogSink::Console => f.write_str("Console"),
            LogSink::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Which rejections `catch` and `recover` handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatchPolicy {
    /// Handle every rejection, including cancellation.
    AllErrors,
    /// Let cancellation rejections pass through unhandled.
    #[default]
    AllErrorsExceptCancellation,
}

/// The mutable process-wide configuration.
#[derive(Clone)]
pub struct Config {
    /// Dispatcher used by every combinator without an `_on` suffix.
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Default policy for `catch` and `recover`.
    pub catch_policy: CatchPolicy,
    /// Destination for diagnostic events.
    pub log_sink: LogSink,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("catch_policy", &self.catch_policy)
            .field("log_sink", &self.log_sink)
            .finish_non_exhaustive()
    }
}

fn cell() -> &'static RwLock<Config> {
    static CELL: OnceLock<RwLock<Config>> = OnceLock::new();
    CELL.get_or_init(|| {
        RwLock::new(Config {
            dispatcher: Arc::new(SerialDispatcher::named("promissory-default")),
            catch_policy: CatchPolicy::default(),
            log_sink: LogSink::default(),
        })
    })
}

/// Adjusts the process-wide configuration in place.
///
/// Changes apply to combinators attached after the call; work already queued
/// keeps the dispatcher it captured.
pub fn configure(f: impl FnOnce(&mut Config)) {
    f(&mut cell().write());
}

pub(crate) fn default_dispatcher() -> Arc<dyn Dispatcher> {
    cell().read().dispatcher.clone()
}

pub(crate) fn catch_policy() -> CatchPolicy {
    cell().read().catch_policy
}

pub(crate) fn emit(event: LogEvent) {
    let sink = cell().read().log_sink.clone();
    match sink {
        LogSink::Silent => {}
        LogSink::Console => tracing::warn!(?event, "promise diagnostic"),
        LogSink::Custom(f) => f(&event),
    }
}
