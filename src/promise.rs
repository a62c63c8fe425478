use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::{self, LogEvent};
use crate::error::{PromiseError, Rejection};
use crate::resolution::{Resolution, ResolutionBox};

/// A value that will settle exactly once, either fulfilled with a `T` or
/// rejected with a [`Rejection`].
///
/// Promises are observed by attaching continuations with the chaining
/// combinators (`map`, `then`, `done`, `catch`, ...). Cloning a promise
/// clones the handle, not the value; every clone observes the same
/// settlement.
#[must_use = "promises do nothing unless observed"]
pub struct Promise<T> {
    pub(crate) inner: Arc<ResolutionBox<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise { inner: self.inner.clone() }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Promise(..)")
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Creates a pending promise together with the resolver that settles it.
    pub fn pending() -> (Promise<T>, Resolver<T>) {
        let inner = Arc::new(ResolutionBox::pending());
        (
            Promise { inner: inner.clone() },
            Resolver { inner, seal_on_drop: true },
        )
    }

    pub(crate) fn pending_parts() -> (Promise<T>, Arc<ResolutionBox<T>>) {
        let inner = Arc::new(ResolutionBox::pending());
        (Promise { inner: inner.clone() }, inner)
    }

    /// A promise already fulfilled with `value`.
    pub fn fulfilled(value: T) -> Promise<T> {
        Promise { inner: Arc::new(ResolutionBox::sealed(Ok(value))) }
    }

    /// A promise already rejected with `error`.
    pub fn rejected(error: impl Into<Rejection>) -> Promise<T> {
        Promise { inner: Arc::new(ResolutionBox::sealed(Err(error.into()))) }
    }

    /// A promise already settled with `resolution`.
    pub fn from_result(resolution: Resolution<T>) -> Promise<T> {
        Promise { inner: Arc::new(ResolutionBox::sealed(resolution)) }
    }

    /// Runs `body` with a resolver for the returned promise. Errors returned
    /// by `body` reject the promise, matching what `body` would have done by
    /// calling [`Resolver::reject`] itself.
    pub fn new<E>(body: impl FnOnce(Resolver<T>) -> Result<(), E>) -> Promise<T>
    where
        E: Into<Rejection>,
    {
        let (promise, inner) = Promise::pending_parts();
        // Drop-sealing is disabled for this resolver so that an error
        // returned by `body` is what rejects the promise, not the resolver
        // going out of scope first.
        let resolver = Resolver { inner, seal_on_drop: false };
        if let Err(e) = body(resolver) {
            // The resolver may have settled the box before body failed, in
            // which case this is a discarded double settle by design.
            promise.inner.seal(Err(e.into()));
        }
        promise
    }

    /// The resolution, if the promise has settled.
    pub fn result(&self) -> Option<Resolution<T>> {
        self.inner.inspect()
    }

    pub fn is_pending(&self) -> bool {
        self.result().is_none()
    }

    pub fn is_resolved(&self) -> bool {
        self.result().is_some()
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self.result(), Some(Ok(_)))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.result(), Some(Err(_)))
    }

    /// The fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match self.result() {
            Some(Ok(v)) => Some(v),
            _ => None,
        }
    }

    /// The rejection, if rejected.
    pub fn error(&self) -> Option<Rejection> {
        match self.result() {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }

    /// Attaches a raw observer that sees the resolution whichever way it
    /// goes. The observer counts as a rejection handler.
    pub fn pipe(&self, f: impl FnOnce(Resolution<T>) + Send + 'static) {
        self.inner.mark_handled();
        self.inner.observe(Box::new(f));
    }

    /// Blocks the calling thread until the promise settles.
    ///
    /// Emits a [`LogEvent::BlockingWait`] diagnostic when called from the
    /// main thread, where blocking usually deadlocks the program it was
    /// meant to drive.
    pub fn wait(&self) -> Resolution<T> {
        if let Some(resolution) = self.result() {
            self.inner.mark_handled();
            return resolution;
        }
        if thread::current().name() == Some("main") {
            config::emit(LogEvent::BlockingWait);
        }
        let gate = Arc::new((Mutex::new(None::<Resolution<T>>), Condvar::new()));
        let signal = gate.clone();
        self.pipe(move |resolution| {
            let (slot, cond) = &*signal;
            *slot.lock() = Some(resolution);
            cond.notify_all();
        });
        let (slot, cond) = &*gate;
        let mut slot = slot.lock();
        loop {
            if let Some(resolution) = slot.take() {
                return resolution;
            }
            cond.wait(&mut slot);
        }
    }

    /// Like [`wait`](Promise::wait), but gives up after `timeout` with
    /// [`PromiseError::TimedOut`]. The promise itself is unaffected and may
    /// still settle later.
    pub fn wait_timeout(&self, timeout: Duration) -> Resolution<T> {
        if let Some(resolution) = self.result() {
            self.inner.mark_handled();
            return resolution;
        }
        if thread::current().name() == Some("main") {
            config::emit(LogEvent::BlockingWait);
        }
        let gate = Arc::new((Mutex::new(None::<Resolution<T>>), Condvar::new()));
        let signal = gate.clone();
        self.pipe(move |resolution| {
            let (slot, cond) = &*signal;
            *slot.lock() = Some(resolution);
            cond.notify_all();
        });
        let deadline = Instant::now() + timeout;
        let (slot, cond) = &*gate;
        let mut slot = slot.lock();
        loop {
            if let Some(resolution) = slot.take() {
                return resolution;
            }
            if cond.wait_until(&mut slot, deadline).timed_out() {
                return slot
                    .take()
                    .unwrap_or_else(|| Err(Rejection::new(PromiseError::TimedOut)));
            }
        }
    }
}

/// The producer half of a pending [`Promise`].
///
/// Settling is first-write-wins; later calls are discarded and reported
/// through [`LogEvent::DoubleSettle`]. Dropping an unused resolver rejects
/// the promise with [`PromiseError::ResolverDropped`].
pub struct Resolver<T: Clone + Send + 'static> {
    inner: Arc<ResolutionBox<T>>,
    seal_on_drop: bool,
}

impl<T: Clone + Send + 'static> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Resolver(..)")
    }
}

impl<T: Clone + Send + 'static> Resolver<T> {
    /// Fulfills the promise with `value`.
    pub fn fulfill(&self, value: T) {
        self.resolve(Ok(value));
    }

    /// Rejects the promise with `error`.
    pub fn reject(&self, error: impl Into<Rejection>) {
        self.resolve(Err(error.into()));
    }

    /// Settles the promise with `resolution`.
    pub fn resolve(&self, resolution: Resolution<T>) {
        if !self.inner.seal(resolution) {
            config::emit(LogEvent::DoubleSettle);
        }
    }

    /// Settles from the `(Option<value>, Option<error>)` convention used by
    /// completion callbacks. An error wins over a value; neither rejects
    /// with [`PromiseError::InvalidCallingConvention`].
    pub fn resolve_completion(&self, value: Option<T>, error: Option<Rejection>) {
        match (value, error) {
            (_, Some(error)) => self.reject(error),
            (Some(value), None) => self.fulfill(value),
            (None, None) => self.reject(PromiseError::InvalidCallingConvention),
        }
    }
}

impl<T: Clone + Send + 'static> Drop for Resolver<T> {
    fn drop(&mut self) {
        if self.seal_on_drop {
            // Silent no-op if the promise was already settled.
            self.inner
                .seal(Err(Rejection::new(PromiseError::ResolverDropped)));
        }
    }
}
