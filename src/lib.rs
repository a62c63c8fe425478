//! Callback-based promises for Rust.
//!
//! A [`Promise<T>`] settles exactly once, either fulfilled with a value or
//! rejected with a [`Rejection`]. Work is chained onto promises with
//! combinators; the continuations run on an injectable [`Dispatcher`]
//! (a process-wide serial queue by default).
//!
//! ```
//! use promissory::Promise;
//!
//! let (promise, resolver) = Promise::pending();
//! let doubled = promise.map(|n: i32| n * 2);
//! resolver.fulfill(21);
//! assert_eq!(doubled.wait().unwrap(), 42);
//! ```
//!
//! Aggregates live in free functions: [`when`] waits for everything,
//! [`race`] for the first settlement, [`after`] turns a duration into a
//! promise. Cancellation is opt-in through
//! [`CancellablePromise`](cancel::CancellablePromise), which ties a chain to
//! a [`CancelContext`](cancel::CancelContext).

pub mod cancel;
pub mod config;
pub mod dispatch;

mod after;
mod catchable;
mod error;
mod promise;
mod race;
mod resolution;
mod thenable;
mod when;

pub use crate::after::after;
pub use crate::cancel::{
    race_cancellable, when_cancellable, CancelContext, CancellablePromise, CancellableTask,
};
pub use crate::config::{configure, CatchPolicy, Config, LogEvent, LogSink};
pub use crate::dispatch::{
    CurrentThread, DelayDispatcher, Dispatcher, RateLimitedDispatcher, SerialDispatcher,
    ThreadPoolDispatcher,
};
pub use crate::error::{PromiseError, Rejection};
pub use crate::promise::{Promise, Resolver};
pub use crate::race::{race, race_fulfilled};
pub use crate::resolution::Resolution;
pub use crate::when::{join, when, when2, when3, when4, when_concurrent};
