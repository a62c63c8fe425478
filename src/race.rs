//! Racing combinators: first settlement wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::PromiseError;
use crate::promise::Promise;

/// Settles with the first member to settle, fulfilled as the member's input
/// index paired with its value. A rejection that arrives first rejects the
/// race with the loser's error unchanged.
///
/// An empty input rejects with [`PromiseError::BadInput`], since a race with
/// no contestants would never settle.
pub fn race<T: Clone + Send + 'static>(promises: Vec<Promise<T>>) -> Promise<(usize, T)> {
    if promises.is_empty() {
        return Promise::rejected(PromiseError::BadInput);
    }
    let (promise, bx) = Promise::pending_parts();
    for (index, member) in promises.into_iter().enumerate() {
        let bx = bx.clone();
        member.pipe(move |res| {
            bx.seal(res.map(|value| (index, value)));
        });
    }
    promise
}

/// Like [`race`], but rejections only drop a contestant out. Settles with
/// the first fulfillment, or rejects with [`PromiseError::NoWinner`] once
/// every member has rejected.
pub fn race_fulfilled<T: Clone + Send + 'static>(promises: Vec<Promise<T>>) -> Promise<(usize, T)> {
    if promises.is_empty() {
        return Promise::rejected(PromiseError::BadInput);
    }
    let (promise, bx) = Promise::pending_parts();
    let remaining = Arc::new(AtomicUsize::new(promises.len()));
    for (index, member) in promises.into_iter().enumerate() {
        let bx = bx.clone();
        let remaining = remaining.clone();
        member.pipe(move |res| match res {
            Ok(value) => {
                bx.seal(Ok((index, value)));
            }
            Err(_) => {
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    bx.seal(Err(PromiseError::NoWinner.into()));
                }
            }
        });
    }
    promise
}
