use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use promissory::{CatchPolicy, CurrentThread, Promise, PromiseError, Rejection};

#[test]
fn first_settlement_wins() {
    let promise = Promise::new(|resolver| {
        resolver.fulfill(1);
        Err(PromiseError::BadInput)
    });
    assert_eq!(promise.wait().unwrap(), 1);
}

#[test]
fn double_settle_is_discarded() {
    let promise = Promise::new(|resolver| {
        resolver.fulfill(1);
        resolver.fulfill(2);
        Ok::<_, PromiseError>(())
    });
    assert_eq!(promise.wait().unwrap(), 1);
}

#[test]
fn observers_flush_in_attach_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let (promise, resolver) = Promise::pending();
    for i in 0..3 {
        let order = order.clone();
        promise.pipe(move |_| order.lock().unwrap().push(i));
    }
    resolver.fulfill(());
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn late_observer_sees_the_resolution() {
    let promise = Promise::fulfilled(7usize);
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = seen.clone();
    promise.pipe(move |res| sink.store(res.unwrap(), Ordering::SeqCst));
    assert_eq!(seen.load(Ordering::SeqCst), 7);
}

#[test]
fn state_accessors() {
    let (promise, resolver) = Promise::pending();
    assert!(promise.is_pending());
    assert!(!promise.is_resolved());
    resolver.fulfill(2);
    assert!(promise.is_fulfilled());
    assert_eq!(promise.value(), Some(2));
    assert!(promise.error().is_none());

    let rejected: Promise<i32> = Promise::rejected(PromiseError::BadInput);
    assert!(rejected.is_rejected());
    assert!(rejected.error().is_some());
    rejected.catch(|_| {}).wait().unwrap();
}

#[test]
fn map_chain() {
    let (promise, resolver) = Promise::pending();
    let result = promise.map(|n: i32| n + 1).map(|n| n * 10);
    resolver.fulfill(4);
    assert_eq!(result.wait().unwrap(), 50);
}

#[test]
fn rejection_skips_transforms() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let promise: Promise<i32> = Promise::rejected(PromiseError::BadInput);
    let mapped = promise.map(move |n| {
        counter.fetch_add(1, Ordering::SeqCst);
        n
    });
    let err = mapped.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::BadInput));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn try_map_can_reject() {
    let promise = Promise::fulfilled("not a number".to_owned());
    let parsed = promise.try_map(|s| {
        s.parse::<i32>().map_err(|_| PromiseError::BadInput)
    });
    let err = parsed.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::BadInput));
}

#[test]
fn compact_map_none_rejects() {
    let promise = Promise::fulfilled("12a".to_owned());
    let parsed = promise.compact_map(|s| s.parse::<i32>().ok());
    let err = parsed.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::CompactMap));

    let promise = Promise::fulfilled("12".to_owned());
    assert_eq!(promise.compact_map(|s| s.parse::<i32>().ok()).wait().unwrap(), 12);
}

#[test]
fn then_adopts_the_inner_promise() {
    let (inner, inner_resolver) = Promise::pending();
    let (outer, outer_resolver) = Promise::pending();
    let chained = outer.then(move |_: i32| inner);
    outer_resolver.fulfill(1);
    inner_resolver.fulfill(9);
    assert_eq!(chained.wait().unwrap(), 9);
}

#[test]
fn then_rejects_when_body_returns_the_receiver() {
    let (promise, resolver) = Promise::pending();
    let me = promise.clone();
    let chained = promise.then_on(CurrentThread, move |_: i32| me);
    resolver.fulfill(1);
    let err = chained.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::ReturnedSelf));
}

#[test]
fn flatten_collapses_nesting() {
    let promise = Promise::fulfilled(Promise::fulfilled(5));
    assert_eq!(promise.flatten().wait().unwrap(), 5);
}

#[test]
fn side_channel_combinators_pass_the_value_through() {
    let got = Arc::new(AtomicUsize::new(0));
    let tapped = Arc::new(AtomicUsize::new(0));
    let ensured = Arc::new(AtomicUsize::new(0));
    let (got2, tapped2, ensured2) = (got.clone(), tapped.clone(), ensured.clone());

    let out = Promise::fulfilled(3usize)
        .get(move |v| got2.store(*v, Ordering::SeqCst))
        .tap(move |res| tapped2.store(*res.as_ref().unwrap(), Ordering::SeqCst))
        .ensure(move || {
            ensured2.fetch_add(1, Ordering::SeqCst);
        });
    assert_eq!(out.wait().unwrap(), 3);
    assert_eq!(got.load(Ordering::SeqCst), 3);
    assert_eq!(tapped.load(Ordering::SeqCst), 3);
    assert_eq!(ensured.load(Ordering::SeqCst), 1);
}

#[test]
fn ensure_runs_on_rejection() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let promise: Promise<i32> = Promise::rejected(PromiseError::BadInput);
    let out = promise.ensure(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(out.wait().is_err());
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn recover_replaces_the_rejection() {
    let promise: Promise<i32> = Promise::rejected(PromiseError::BadInput);
    let out = promise.recover(|_| Promise::fulfilled(99));
    assert_eq!(out.wait().unwrap(), 99);
}

#[test]
fn recover_passes_fulfillment_through() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();
    let out = Promise::fulfilled(1).recover(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Promise::fulfilled(2)
    });
    assert_eq!(out.wait().unwrap(), 1);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn catch_sees_the_error() {
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let promise: Promise<i32> = Promise::rejected(PromiseError::NoWinner);
    let done = promise.catch(move |e| {
        *sink.lock().unwrap() = Some(e.to_string());
    });
    done.wait().unwrap();
    assert_eq!(seen.lock().unwrap().as_deref(), Some("no promise was fulfilled"));
}

#[test]
fn catch_with_an_explicit_policy_handles_cancellation() {
    let seen = Arc::new(AtomicUsize::new(0));
    let sink = seen.clone();
    let promise: Promise<i32> = Promise::rejected(Rejection::cancelled());
    let done = promise.catch_with(CurrentThread, CatchPolicy::AllErrors, move |e| {
        sink.store(usize::from(e.is_cancelled()), Ordering::SeqCst);
    });
    done.wait().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_the_resolver_rejects() {
    let (promise, resolver) = Promise::<i32>::pending();
    drop(resolver);
    let err = promise.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::ResolverDropped));
}

#[test]
fn completion_adapter_conventions() {
    let (value_only, resolver) = Promise::pending();
    resolver.resolve_completion(Some(5), None);
    assert_eq!(value_only.wait().unwrap(), 5);

    let (error_wins, resolver) = Promise::<i32>::pending();
    resolver.resolve_completion(Some(5), Some(PromiseError::BadInput.into()));
    let err = error_wins.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::BadInput));

    let (neither, resolver) = Promise::<i32>::pending();
    resolver.resolve_completion(None, None);
    let err = neither.wait().unwrap_err();
    assert_eq!(
        err.downcast_ref::<PromiseError>(),
        Some(&PromiseError::InvalidCallingConvention)
    );
}

#[test]
fn constructor_body_error_rejects() {
    let promise: Promise<i32> = Promise::new(|_resolver| Err(PromiseError::BadInput));
    let err = promise.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::BadInput));
}

#[test]
fn vector_combinators() {
    let promise = Promise::fulfilled(vec![3, 1, 2]);
    assert_eq!(promise.sorted_values().wait().unwrap(), vec![1, 2, 3]);
    assert_eq!(promise.map_values(|n| n * 2).wait().unwrap(), vec![6, 2, 4]);
    assert_eq!(promise.filter_values(|n| *n > 1).wait().unwrap(), vec![3, 2]);
    assert_eq!(promise.first_value().wait().unwrap(), 3);
    assert_eq!(promise.last_value().wait().unwrap(), 2);

    let empty = Promise::fulfilled(Vec::<i32>::new());
    let err = empty.first_value().wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::EmptySequence));
}

#[test]
fn two_ensures_each_fire_exactly_once() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let (first2, second2) = (first.clone(), second.clone());
    let (promise, resolver) = Promise::pending();
    let out = promise
        .ensure(move || {
            first2.fetch_add(1, Ordering::SeqCst);
        })
        .map(|n: i32| n + 1)
        .ensure(move || {
            second2.fetch_add(1, Ordering::SeqCst);
        });
    resolver.fulfill(1);
    assert_eq!(out.wait().unwrap(), 2);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn wait_timeout_gives_up_on_a_stuck_promise() {
    use std::time::Duration;

    let (promise, resolver) = Promise::<i32>::pending();
    let err = promise.wait_timeout(Duration::from_millis(30)).unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::TimedOut));
    resolver.fulfill(8);
    assert_eq!(promise.wait_timeout(Duration::from_millis(30)).unwrap(), 8);
}

#[test]
fn then_map_awaits_each_element() {
    let promise = Promise::fulfilled(vec![1, 2, 3]);
    let out = promise.then_map(|n| Promise::fulfilled(n * 10));
    assert_eq!(out.wait().unwrap(), vec![10, 20, 30]);
}
