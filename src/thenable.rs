//! Chaining combinators.
//!
//! Each combinator attaches an observer to the receiver and returns a new
//! promise that settles from the observer's outcome. Value transforms run on
//! a dispatcher (the configured default, or the one given to the `_on`
//! variant); rejections are forwarded to the new promise without touching
//! the dispatcher.

use std::sync::{Arc, Weak};

use crate::config;
use crate::dispatch::Dispatcher;
use crate::error::{PromiseError, Rejection};
use crate::promise::Promise;
use crate::resolution::{Resolution, ResolutionBox};

/// True when `candidate` is the same underlying box the chain started from.
/// The `Weak` dodge keeps the check from extending the source's lifetime: if
/// the source box is already gone, no live promise can be it.
pub(crate) fn is_same_box<T, U>(
    source: &Weak<ResolutionBox<T>>,
    candidate: &Arc<ResolutionBox<U>>,
) -> bool {
    match source.upgrade() {
        Some(source) => Arc::as_ptr(&source) as usize == Arc::as_ptr(candidate) as usize,
        None => false,
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Transforms the fulfillment value on the default dispatcher.
    pub fn map<U>(&self, transform: impl FnOnce(T) -> U + Send + 'static) -> Promise<U>
    where
        U: Clone + Send + 'static,
    {
        self.map_on(config::default_dispatcher(), transform)
    }

    /// Transforms the fulfillment value on `on`.
    pub fn map_on<U>(
        &self,
        on: impl Dispatcher + 'static,
        transform: impl FnOnce(T) -> U + Send + 'static,
    ) -> Promise<U>
    where
        U: Clone + Send + 'static,
    {
        let (promise, bx) = Promise::pending_parts();
        self.pipe(move |res| match res {
            Ok(value) => on.dispatch(Box::new(move || {
                bx.seal(Ok(transform(value)));
            })),
            Err(e) => {
                bx.seal(Err(e));
            }
        });
        promise
    }

    /// Like [`map`](Promise::map), but the transform may reject the chain by
    /// returning an error.
    pub fn try_map<U, E>(
        &self,
        transform: impl FnOnce(T) -> Result<U, E> + Send + 'static,
    ) -> Promise<U>
    where
        U: Clone + Send + 'static,
        E: Into<Rejection>,
    {
        self.try_map_on(config::default_dispatcher(), transform)
    }

    pub fn try_map_on<U, E>(
        &self,
        on: impl Dispatcher + 'static,
        transform: impl FnOnce(T) -> Result<U, E> + Send + 'static,
    ) -> Promise<U>
    where
        U: Clone + Send + 'static,
        E: Into<Rejection>,
    {
        let (promise, bx) = Promise::pending_parts();
        self.pipe(move |res| match res {
            Ok(value) => on.dispatch(Box::new(move || {
                bx.seal(transform(value).map_err(Into::into));
            })),
            Err(e) => {
                bx.seal(Err(e));
            }
        });
        promise
    }

    /// Transforms the fulfillment value, rejecting with
    /// [`PromiseError::CompactMap`] when the transform returns `None`.
    pub fn compact_map<U>(
        &self,
        transform: impl FnOnce(T) -> Option<U> + Send + 'static,
    ) -> Promise<U>
    where
        U: Clone + Send + 'static,
    {
        self.compact_map_on(config::default_dispatcher(), transform)
    }

    pub fn compact_map_on<U>(
        &self,
        on: impl Dispatcher + 'static,
        transform: impl FnOnce(T) -> Option<U> + Send + 'static,
    ) -> Promise<U>
    where
        U: Clone + Send + 'static,
    {
        self.try_map_on(on, |value| {
            transform(value).ok_or(PromiseError::CompactMap)
        })
    }

    /// Chains into the promise returned by `body`.
    ///
    /// The returned promise adopts whatever `body`'s promise settles to.
    /// Returning the receiver itself rejects with
    /// [`PromiseError::ReturnedSelf`] instead of deadlocking the chain.
    pub fn then<U>(&self, body: impl FnOnce(T) -> Promise<U> + Send + 'static) -> Promise<U>
    where
        U: Clone + Send + 'static,
    {
        self.then_on(config::default_dispatcher(), body)
    }

    pub fn then_on<U>(
        &self,
        on: impl Dispatcher + 'static,
        body: impl FnOnce(T) -> Promise<U> + Send + 'static,
    ) -> Promise<U>
    where
        U: Clone + Send + 'static,
    {
        let (promise, bx) = Promise::pending_parts();
        let source = Arc::downgrade(&self.inner);
        self.pipe(move |res| match res {
            Ok(value) => on.dispatch(Box::new(move || {
                let next = body(value);
                if is_same_box(&source, &next.inner) {
                    bx.seal(Err(Rejection::new(PromiseError::ReturnedSelf)));
                } else {
                    next.pipe(move |r| {
                        bx.seal(r);
                    });
                }
            })),
            Err(e) => {
                bx.seal(Err(e));
            }
        });
        promise
    }

    /// Terminates a chain, running `body` with the fulfillment value.
    pub fn done(&self, body: impl FnOnce(T) + Send + 'static) -> Promise<()> {
        self.done_on(config::default_dispatcher(), body)
    }

    pub fn done_on(
        &self,
        on: impl Dispatcher + 'static,
        body: impl FnOnce(T) + Send + 'static,
    ) -> Promise<()> {
        self.map_on(on, body)
    }

    /// Runs `body` with a borrow of the fulfillment value, passing the value
    /// on unchanged.
    pub fn get(&self, body: impl FnOnce(&T) + Send + 'static) -> Promise<T> {
        self.get_on(config::default_dispatcher(), body)
    }

    pub fn get_on(
        &self,
        on: impl Dispatcher + 'static,
        body: impl FnOnce(&T) + Send + 'static,
    ) -> Promise<T> {
        self.map_on(on, |value| {
            body(&value);
            value
        })
    }

    /// Like [`get`](Promise::get), but `body` may reject the chain.
    pub fn try_get<E>(
        &self,
        body: impl FnOnce(&T) -> Result<(), E> + Send + 'static,
    ) -> Promise<T>
    where
        E: Into<Rejection>,
    {
        self.try_map(|value| body(&value).map(|()| value))
    }

    /// Observes the resolution without consuming it. Runs inline when the
    /// promise settles, before any dispatched continuation.
    pub fn tap(&self, body: impl FnOnce(&Resolution<T>) + Send + 'static) -> Promise<T> {
        let (promise, bx) = Promise::pending_parts();
        self.pipe(move |res| {
            body(&res);
            bx.seal(res);
        });
        promise
    }

    /// Discards the fulfillment value.
    pub fn as_void(&self) -> Promise<()> {
        let (promise, bx) = Promise::pending_parts();
        self.pipe(move |res| {
            bx.seal(res.map(|_| ()));
        });
        promise
    }
}

impl<U: Clone + Send + 'static> Promise<Promise<U>> {
    /// Collapses a promise of a promise into the inner promise's outcome.
    pub fn flatten(&self) -> Promise<U> {
        let (promise, bx) = Promise::pending_parts();
        self.pipe(move |res| match res {
            Ok(inner) => inner.pipe(move |r| {
                bx.seal(r);
            }),
            Err(e) => {
                bx.seal(Err(e));
            }
        });
        promise
    }
}

impl<A: Clone + Send + 'static> Promise<Vec<A>> {
    /// Maps each element of the fulfilled vector.
    pub fn map_values<B>(&self, transform: impl FnMut(A) -> B + Send + 'static) -> Promise<Vec<B>>
    where
        B: Clone + Send + 'static,
    {
        self.map(move |values| values.into_iter().map(transform).collect())
    }

    /// Keeps the elements the predicate accepts.
    pub fn filter_values(
        &self,
        mut predicate: impl FnMut(&A) -> bool + Send + 'static,
    ) -> Promise<Vec<A>> {
        self.map(move |values| values.into_iter().filter(|v| predicate(v)).collect())
    }

    /// Maps each element, dropping the ones that map to `None`.
    pub fn compact_map_values<B>(
        &self,
        transform: impl FnMut(A) -> Option<B> + Send + 'static,
    ) -> Promise<Vec<B>>
    where
        B: Clone + Send + 'static,
    {
        self.map(move |values| values.into_iter().filter_map(transform).collect())
    }

    /// Maps each element into a promise and waits for all of them.
    pub fn then_map<B>(
        &self,
        mut transform: impl FnMut(A) -> Promise<B> + Send + 'static,
    ) -> Promise<Vec<B>>
    where
        B: Clone + Send + 'static,
    {
        self.then(move |values| crate::when::when(values.into_iter().map(&mut transform).collect()))
    }

    /// The first element, or [`PromiseError::EmptySequence`].
    pub fn first_value(&self) -> Promise<A> {
        self.try_map(|values| values.into_iter().next().ok_or(PromiseError::EmptySequence))
    }

    /// The last element, or [`PromiseError::EmptySequence`].
    pub fn last_value(&self) -> Promise<A> {
        self.try_map(|values| values.into_iter().last().ok_or(PromiseError::EmptySequence))
    }
}

impl<A: Clone + Send + Ord + 'static> Promise<Vec<A>> {
    /// Sorts the fulfilled vector.
    pub fn sorted_values(&self) -> Promise<Vec<A>> {
        self.map(|mut values| {
            values.sort();
            values
        })
    }
}
