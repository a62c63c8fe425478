use std::time::Duration;

use crate::dispatch;
use crate::promise::Promise;

/// A promise that fulfills with `()` once `delay` has elapsed.
///
/// Backed by the crate's shared timer thread; it cannot reject.
pub fn after(delay: Duration) -> Promise<()> {
    let (promise, resolver) = Promise::pending();
    dispatch::schedule(delay, Box::new(move || resolver.fulfill(())));
    promise
}
