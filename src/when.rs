//! Aggregate combinators that wait on several promises at once.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::PromiseError;
use crate::promise::Promise;
use crate::resolution::{Resolution, ResolutionBox};

/// Waits for every promise to fulfill, yielding the values in input order.
///
/// The first rejection observed rejects the aggregate immediately; later
/// settlements of the other members are discarded. An empty input fulfills
/// with an empty vector.
pub fn when<T: Clone + Send + 'static>(promises: Vec<Promise<T>>) -> Promise<Vec<T>> {
    if promises.is_empty() {
        return Promise::fulfilled(Vec::new());
    }
    let (promise, bx) = Promise::pending_parts();
    let state = Arc::new(Mutex::new(Aggregate {
        slots: vec![None; promises.len()],
        remaining: promises.len(),
    }));
    for (index, member) in promises.into_iter().enumerate() {
        let state = state.clone();
        let bx = bx.clone();
        member.pipe(move |res| match res {
            Ok(value) => {
                let done = {
                    let mut state = state.lock();
                    state.slots[index] = Some(value);
                    state.remaining -= 1;
                    state.remaining == 0
                };
                if done {
                    bx.seal(Ok(drain_slots(&mut state.lock().slots)));
                }
            }
            Err(e) => {
                bx.seal(Err(e));
            }
        });
    }
    promise
}

struct Aggregate<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
}

fn drain_slots<T>(slots: &mut Vec<Option<T>>) -> Vec<T> {
    slots
        .iter_mut()
        .map(|slot| match slot.take() {
            Some(value) => value,
            // remaining hit zero, so every slot was filled.
            None => unreachable!(),
        })
        .collect()
}

/// Waits for two promises of different types.
pub fn when2<A, B>(a: &Promise<A>, b: &Promise<B>) -> Promise<(A, B)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
{
    let (va, vb) = (a.clone(), b.clone());
    when(vec![a.as_void(), b.as_void()]).map(move |_| match (va.value(), vb.value()) {
        (Some(a), Some(b)) => (a, b),
        _ => unreachable!(),
    })
}

/// Waits for three promises of different types.
pub fn when3<A, B, C>(a: &Promise<A>, b: &Promise<B>, c: &Promise<C>) -> Promise<(A, B, C)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
{
    let (va, vb, vc) = (a.clone(), b.clone(), c.clone());
    when(vec![a.as_void(), b.as_void(), c.as_void()]).map(move |_| {
        match (va.value(), vb.value(), vc.value()) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => unreachable!(),
        }
    })
}

/// Waits for four promises of different types.
pub fn when4<A, B, C, D>(
    a: &Promise<A>,
    b: &Promise<B>,
    c: &Promise<C>,
    d: &Promise<D>,
) -> Promise<(A, B, C, D)>
where
    A: Clone + Send + 'static,
    B: Clone + Send + 'static,
    C: Clone + Send + 'static,
    D: Clone + Send + 'static,
{
    let (va, vb, vc, vd) = (a.clone(), b.clone(), c.clone(), d.clone());
    when(vec![a.as_void(), b.as_void(), c.as_void(), d.as_void()]).map(move |_| {
        match (va.value(), vb.value(), vc.value(), vd.value()) {
            (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
            _ => unreachable!(),
        }
    })
}

/// Like [`when`], but draws promises from `thunks` lazily, keeping at most
/// `limit` of them in flight at a time.
///
/// The iterator is advanced under an internal lock, so it must terminate; a
/// concurrency limit of zero rejects with [`PromiseError::BadInput`].
pub fn when_concurrent<T, I>(thunks: I, limit: usize) -> Promise<Vec<T>>
where
    T: Clone + Send + 'static,
    I: Iterator<Item = Promise<T>> + Send + 'static,
{
    if limit == 0 {
        return Promise::rejected(PromiseError::BadInput);
    }
    let (promise, bx) = Promise::pending_parts();
    let driver = Arc::new(Mutex::new(Driver {
        iter: thunks,
        in_flight: 0,
        slots: Vec::new(),
        exhausted: false,
        failed: false,
    }));
    pump(&driver, &bx, limit);
    promise
}

struct Driver<T, I> {
    iter: I,
    in_flight: usize,
    slots: Vec<Option<T>>,
    exhausted: bool,
    failed: bool,
}

fn pump<T, I>(driver: &Arc<Mutex<Driver<T, I>>>, bx: &Arc<ResolutionBox<Vec<T>>>, limit: usize)
where
    T: Clone + Send + 'static,
    I: Iterator<Item = Promise<T>> + Send + 'static,
{
    loop {
        let member;
        let index;
        {
            let mut d = driver.lock();
            if d.failed || (!d.exhausted && d.in_flight >= limit) {
                return;
            }
            if d.exhausted {
                if d.in_flight == 0 {
                    let values = drain_slots(&mut d.slots);
                    drop(d);
                    bx.seal(Ok(values));
                }
                return;
            }
            match d.iter.next() {
                None => {
                    d.exhausted = true;
                    continue;
                }
                Some(p) => {
                    index = d.slots.len();
                    d.slots.push(None);
                    d.in_flight += 1;
                    member = p;
                }
            }
        }
        let driver = driver.clone();
        let bx = bx.clone();
        member.pipe(move |res| match res {
            Ok(value) => {
                {
                    let mut d = driver.lock();
                    d.slots[index] = Some(value);
                    d.in_flight -= 1;
                }
                pump(&driver, &bx, limit);
            }
            Err(e) => {
                driver.lock().failed = true;
                bx.seal(Err(e));
            }
        });
    }
}

/// Waits for every promise to settle, fulfilled or not, yielding the
/// individual resolutions in input order. Never rejects.
pub fn join<T: Clone + Send + 'static>(
    promises: Vec<Promise<T>>,
) -> Promise<Vec<Resolution<T>>> {
    if promises.is_empty() {
        return Promise::fulfilled(Vec::new());
    }
    let (promise, bx) = Promise::pending_parts();
    let state = Arc::new(Mutex::new(Aggregate {
        slots: vec![None; promises.len()],
        remaining: promises.len(),
    }));
    for (index, member) in promises.into_iter().enumerate() {
        let state = state.clone();
        let bx = bx.clone();
        member.pipe(move |res| {
            let done = {
                let mut state = state.lock();
                state.slots[index] = Some(res);
                state.remaining -= 1;
                state.remaining == 0
            };
            if done {
                bx.seal(Ok(drain_slots(&mut state.lock().slots)));
            }
        });
    }
    promise
}
