//! Execution contexts for promise continuations.
//!
//! Every chaining combinator hands its continuation to a [`Dispatcher`].
//! The default is a process-wide serial queue (see [`crate::configure`]);
//! each combinator also has an `_on` variant taking an explicit dispatcher.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::{self, LogEvent};

mod delay;
mod pool;
mod rate_limited;
mod serial;
mod timer;

pub use self::delay::DelayDispatcher;
pub use self::pool::ThreadPoolDispatcher;
pub use self::rate_limited::RateLimitedDispatcher;
pub use self::serial::SerialDispatcher;

pub(crate) use self::timer::schedule;

/// A unit of deferred work.
pub type Work = Box<dyn FnOnce() + Send>;

/// An execution context continuations can be submitted to.
pub trait Dispatcher: Send + Sync {
    /// Submits `work` for execution. Implementations decide where and when
    /// it runs; they must run it exactly once.
    fn dispatch(&self, work: Work);
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn dispatch(&self, work: Work) {
        (**self).dispatch(work)
    }
}

/// Runs work synchronously on the submitting thread.
///
/// Continuations attached through this dispatcher run inline, either during
/// the `dispatch` call (promise already settled) or during the resolver's
/// settle call. That makes the continuation's execution context depend on
/// timing the caller cannot see, so reserve it for code that is genuinely
/// reentrancy-safe and measured to need it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentThread;

impl Dispatcher for CurrentThread {
    fn dispatch(&self, work: Work) {
        work();
    }
}

/// Worker-side entry point: runs one job, containing panics so a misbehaving
/// continuation cannot take the queue down with it.
pub(crate) fn run_work(work: Work) {
    if catch_unwind(AssertUnwindSafe(work)).is_err() {
        config::emit(LogEvent::ContinuationPanicked);
    }
}
