//! Rejection-handling combinators.

use std::sync::Arc;

use crate::config::{self, CatchPolicy};
use crate::dispatch::Dispatcher;
use crate::error::{PromiseError, Rejection};
use crate::promise::Promise;

impl<T: Clone + Send + 'static> Promise<T> {
    /// Terminates a chain, running `body` if the chain rejected.
    ///
    /// Under [`CatchPolicy::AllErrorsExceptCancellation`] (the default) a
    /// cancellation rejection skips `body` and flows into the returned
    /// promise instead.
    pub fn catch(&self, body: impl FnOnce(Rejection) + Send + 'static) -> Promise<()> {
        self.catch_with(config::default_dispatcher(), config::catch_policy(), body)
    }

    pub fn catch_on(
        &self,
        on: impl Dispatcher + 'static,
        body: impl FnOnce(Rejection) + Send + 'static,
    ) -> Promise<()> {
        self.catch_with(on, config::catch_policy(), body)
    }

    pub fn catch_with(
        &self,
        on: impl Dispatcher + 'static,
        policy: CatchPolicy,
        body: impl FnOnce(Rejection) + Send + 'static,
    ) -> Promise<()> {
        let (promise, bx) = Promise::pending_parts();
        self.pipe(move |res| match res {
            Ok(_) => {
                bx.seal(Ok(()));
            }
            Err(e) if skips_handler(&e, policy) => {
                bx.seal(Err(e));
            }
            Err(e) => on.dispatch(Box::new(move || {
                body(e);
                bx.seal(Ok(()));
            })),
        });
        promise
    }

    /// Replaces a rejection with the promise returned by `body`.
    ///
    /// Fulfillment passes through untouched, as does cancellation under
    /// [`CatchPolicy::AllErrorsExceptCancellation`].
    pub fn recover(
        &self,
        body: impl FnOnce(Rejection) -> Promise<T> + Send + 'static,
    ) -> Promise<T> {
        self.recover_with(config::default_dispatcher(), config::catch_policy(), body)
    }

    pub fn recover_on(
        &self,
        on: impl Dispatcher + 'static,
        body: impl FnOnce(Rejection) -> Promise<T> + Send + 'static,
    ) -> Promise<T> {
        self.recover_with(on, config::catch_policy(), body)
    }

    pub fn recover_with(
        &self,
        on: impl Dispatcher + 'static,
        policy: CatchPolicy,
        body: impl FnOnce(Rejection) -> Promise<T> + Send + 'static,
    ) -> Promise<T> {
        let (promise, bx) = Promise::pending_parts();
        let source = Arc::downgrade(&self.inner);
        self.pipe(move |res| match res {
            Ok(value) => {
                bx.seal(Ok(value));
            }
            Err(e) if skips_handler(&e, policy) => {
                bx.seal(Err(e));
            }
            Err(e) => on.dispatch(Box::new(move || {
                let next = body(e);
                if crate::thenable::is_same_box(&source, &next.inner) {
                    bx.seal(Err(Rejection::new(PromiseError::ReturnedSelf)));
                } else {
                    next.pipe(move |r| {
                        bx.seal(r);
                    });
                }
            })),
        });
        promise
    }

    /// Runs `body` whichever way the promise settles, passing the resolution
    /// through unchanged. Useful for releasing resources at the end of a
    /// chain.
    pub fn ensure(&self, body: impl FnOnce() + Send + 'static) -> Promise<T> {
        self.ensure_on(config::default_dispatcher(), body)
    }

    pub fn ensure_on(
        &self,
        on: impl Dispatcher + 'static,
        body: impl FnOnce() + Send + 'static,
    ) -> Promise<T> {
        let (promise, bx) = Promise::pending_parts();
        self.pipe(move |res| {
            on.dispatch(Box::new(move || {
                body();
                bx.seal(res);
            }));
        });
        promise
    }
}

fn skips_handler(rejection: &Rejection, policy: CatchPolicy) -> bool {
    rejection.is_cancelled() && policy == CatchPolicy::AllErrorsExceptCancellation
}
