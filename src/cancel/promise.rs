use std::sync::Arc;

use crate::config;
use crate::dispatch::Dispatcher;
use crate::error::Rejection;
use crate::promise::{Promise, Resolver};
use crate::resolution::Resolution;

use super::{CancelContext, CancellableTask};

/// A promise bound to a [`CancelContext`].
///
/// Cancelling the context rejects this promise (and every promise chained
/// from it) with a cancellation rejection, and tells any registered
/// underlying task to stop. Chaining combinators propagate the context, so
/// one `cancel()` call reaches the whole chain.
#[must_use = "promises do nothing unless observed"]
pub struct CancellablePromise<T: Clone + Send + 'static> {
    promise: Promise<T>,
    context: Arc<CancelContext>,
}

impl<T: Clone + Send + 'static> Clone for CancellablePromise<T> {
    fn clone(&self) -> Self {
        CancellablePromise {
            promise: self.promise.clone(),
            context: self.context.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> std::fmt::Debug for CancellablePromise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellablePromise")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Routes `source` through `context`: the result settles like `source`
/// unless the context cancels first, in which case it rejects immediately
/// with the cancellation rejection.
fn rewire<T: Clone + Send + 'static>(
    source: &Promise<T>,
    context: &Arc<CancelContext>,
    task: Option<Box<dyn CancellableTask>>,
) -> Promise<T> {
    let (promise, bx) = Promise::pending_parts();
    let reject_bx = bx.clone();
    let id = context.register(task, move |rejection| {
        reject_bx.seal(Err(rejection));
    });
    let ctx = context.clone();
    source.pipe(move |res| {
        ctx.deregister(id);
        match ctx.cancelled_error() {
            Some(rejection) => {
                bx.seal(Err(rejection));
            }
            None => {
                bx.seal(res);
            }
        }
    });
    promise
}

impl<T: Clone + Send + 'static> CancellablePromise<T> {
    /// Creates a pending cancellable promise with its resolver. The resolver
    /// still works after cancellation but its settlement is discarded.
    pub fn pending() -> (CancellablePromise<T>, Resolver<T>) {
        let (promise, resolver) = Promise::pending();
        (CancellablePromise::from_promise(promise), resolver)
    }

    /// Binds an existing promise to a fresh context.
    pub fn from_promise(promise: Promise<T>) -> CancellablePromise<T> {
        let context = CancelContext::new();
        let promise = rewire(&promise, &context, None);
        CancellablePromise { promise, context }
    }

    /// Binds an existing promise to a fresh context, registering the task
    /// that produces it so cancellation can stop the work itself.
    pub fn with_task(promise: Promise<T>, task: impl CancellableTask + 'static) -> Self {
        let context = CancelContext::new();
        let promise = rewire(&promise, &context, Some(Box::new(task)));
        CancellablePromise { promise, context }
    }

    /// Cancels the whole chain this promise belongs to.
    pub fn cancel(&self) {
        self.context.cancel();
    }

    /// Cancels with a caller-supplied rejection.
    pub fn cancel_with(&self, rejection: Rejection) {
        self.context.cancel_with(rejection);
    }

    pub fn cancel_attempted(&self) -> bool {
        self.context.cancel_attempted()
    }

    pub fn cancelled_error(&self) -> Option<Rejection> {
        self.context.cancelled_error()
    }

    /// The underlying promise, without cancellation authority.
    pub fn promise(&self) -> &Promise<T> {
        &self.promise
    }

    pub fn context(&self) -> &Arc<CancelContext> {
        &self.context
    }

    pub fn result(&self) -> Option<Resolution<T>> {
        self.promise.result()
    }

    /// Blocks until the promise settles or is cancelled.
    pub fn wait(&self) -> Resolution<T> {
        self.promise.wait()
    }

    /// Transforms the fulfillment value on the default dispatcher. The
    /// transform is skipped if the chain was cancelled before it ran.
    pub fn map<U>(&self, transform: impl FnOnce(T) -> U + Send + 'static) -> CancellablePromise<U>
    where
        U: Clone + Send + 'static,
    {
        self.map_on(config::default_dispatcher(), transform)
    }

    pub fn map_on<U>(
        &self,
        on: impl Dispatcher + 'static,
        transform: impl FnOnce(T) -> U + Send + 'static,
    ) -> CancellablePromise<U>
    where
        U: Clone + Send + 'static,
    {
        let ctx = self.context.clone();
        let mapped = self.promise.try_map_on(on, move |value| match ctx.cancelled_error() {
            Some(rejection) => Err(rejection),
            None => Ok(transform(value)),
        });
        CancellablePromise {
            promise: rewire(&mapped, &self.context, None),
            context: self.context.clone(),
        }
    }

    /// Chains into the cancellable promise returned by `body`, merging its
    /// context into this chain's so cancelling either cancels both.
    pub fn then<U>(
        &self,
        body: impl FnOnce(T) -> CancellablePromise<U> + Send + 'static,
    ) -> CancellablePromise<U>
    where
        U: Clone + Send + 'static,
    {
        self.then_on(config::default_dispatcher(), body)
    }

    pub fn then_on<U>(
        &self,
        on: impl Dispatcher + 'static,
        body: impl FnOnce(T) -> CancellablePromise<U> + Send + 'static,
    ) -> CancellablePromise<U>
    where
        U: Clone + Send + 'static,
    {
        let ctx = self.context.clone();
        let inner = self.promise.then_on(on, move |value| {
            if let Some(rejection) = ctx.cancelled_error() {
                return Promise::rejected(rejection);
            }
            let next = body(value);
            ctx.register_child(next.context.clone());
            next.promise.clone()
        });
        CancellablePromise {
            promise: rewire(&inner, &self.context, None),
            context: self.context.clone(),
        }
    }

    /// Terminates a chain, running `body` with the fulfillment value unless
    /// the chain was cancelled first.
    pub fn done(&self, body: impl FnOnce(T) + Send + 'static) -> CancellablePromise<()> {
        self.map(body)
    }

    /// Terminates a chain, running `body` on rejection. Cancellation skips
    /// `body` under the default catch policy.
    pub fn catch(&self, body: impl FnOnce(Rejection) + Send + 'static) -> CancellablePromise<()> {
        CancellablePromise {
            promise: self.promise.catch(body),
            context: self.context.clone(),
        }
    }

    /// Replaces a rejection with the chain returned by `body`, merging the
    /// two contexts. Cancellation skips `body` under the default policy.
    pub fn recover(
        &self,
        body: impl FnOnce(Rejection) -> CancellablePromise<T> + Send + 'static,
    ) -> CancellablePromise<T> {
        let ctx = self.context.clone();
        let inner = self.promise.recover(move |rejection| {
            let next = body(rejection);
            ctx.register_child(next.context.clone());
            next.promise.clone()
        });
        CancellablePromise {
            promise: inner,
            context: self.context.clone(),
        }
    }

    /// Runs `body` whichever way the chain ends, including cancellation.
    pub fn ensure(&self, body: impl FnOnce() + Send + 'static) -> CancellablePromise<T> {
        CancellablePromise {
            promise: self.promise.ensure(body),
            context: self.context.clone(),
        }
    }
}

/// Cancellable [`when`](crate::when): waits for every member, under a fresh
/// context linked to each member's. A member's real (non-cancellation)
/// rejection rejects the aggregate with that error and then cancels the
/// remaining members.
pub fn when_cancellable<T: Clone + Send + 'static>(
    members: Vec<CancellablePromise<T>>,
) -> CancellablePromise<Vec<T>> {
    let context = CancelContext::new();
    for member in &members {
        context.register_child(member.context.clone());
    }
    let plain = crate::when::when(members.iter().map(|m| m.promise.clone()).collect());
    // Attach the rewire first so a real error seals the aggregate before the
    // sibling cancellation below turns the context cancelled.
    let promise = rewire(&plain, &context, None);
    let ctx = context.clone();
    plain.pipe(move |res| {
        if let Err(e) = res {
            if !e.is_cancelled() {
                ctx.cancel();
            }
        }
    });
    CancellablePromise { promise, context }
}

/// Cancellable [`race`](crate::race): first settlement wins and the losers
/// are cancelled.
pub fn race_cancellable<T: Clone + Send + 'static>(
    members: Vec<CancellablePromise<T>>,
) -> CancellablePromise<(usize, T)> {
    let context = CancelContext::new();
    for member in &members {
        context.register_child(member.context.clone());
    }
    let plain = crate::race::race(members.iter().map(|m| m.promise.clone()).collect());
    let promise = rewire(&plain, &context, None);
    let ctx = context.clone();
    plain.pipe(move |res| {
        // Win or lose, the race is over; stop the remaining contestants.
        let cancelled = match &res {
            Err(e) => e.is_cancelled(),
            Ok(_) => false,
        };
        if !cancelled {
            ctx.cancel();
        }
    });
    CancellablePromise { promise, context }
}
