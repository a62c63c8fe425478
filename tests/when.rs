use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use promissory::{after, join, when, when2, when3, when4, when_concurrent, Promise, PromiseError};

#[test]
fn when_collects_in_input_order() {
    let (pa, ra) = Promise::pending();
    let (pb, rb) = Promise::pending();
    let (pc, rc) = Promise::pending();
    let all = when(vec![pa, pb, pc]);
    rb.fulfill(2);
    rc.fulfill(3);
    ra.fulfill(1);
    assert_eq!(all.wait().unwrap(), vec![1, 2, 3]);
}

#[test]
fn when_rejects_with_the_first_failure() {
    let (pa, ra) = Promise::<i32>::pending();
    let (pb, rb) = Promise::<i32>::pending();
    let all = when(vec![pa, pb]);
    rb.reject(PromiseError::BadInput);
    ra.fulfill(1);
    let err = all.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::BadInput));
}

#[test]
fn when_of_nothing_fulfills_immediately() {
    let all = when(Vec::<Promise<i32>>::new());
    assert_eq!(all.wait().unwrap(), Vec::<i32>::new());
}

#[test]
fn heterogeneous_when() {
    let a = Promise::fulfilled(1i32);
    let b = Promise::fulfilled("two".to_owned());
    let c = Promise::fulfilled(3.5f64);
    let d = Promise::fulfilled(true);

    assert_eq!(when2(&a, &b).wait().unwrap(), (1, "two".to_owned()));
    assert_eq!(when3(&a, &b, &c).wait().unwrap(), (1, "two".to_owned(), 3.5));
    assert_eq!(when4(&a, &b, &c, &d).wait().unwrap(), (1, "two".to_owned(), 3.5, true));
}

#[test]
fn heterogeneous_when_rejects_on_any_failure() {
    let a = Promise::fulfilled(1i32);
    let b: Promise<String> = Promise::rejected(PromiseError::BadInput);
    let err = when2(&a, &b).wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::BadInput));
}

#[test]
fn when_concurrent_caps_in_flight_work() {
    let live = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (live2, peak2) = (live.clone(), peak.clone());

    let out = when_concurrent(
        (0..8usize).map(move |i| {
            let now = live2.fetch_add(1, Ordering::SeqCst) + 1;
            peak2.fetch_max(now, Ordering::SeqCst);
            let live3 = live2.clone();
            after(Duration::from_millis(20)).map(move |_| {
                live3.fetch_sub(1, Ordering::SeqCst);
                i
            })
        }),
        3,
    );

    assert_eq!(out.wait().unwrap(), (0..8).collect::<Vec<_>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[test]
fn when_concurrent_rejects_a_zero_limit() {
    let out = when_concurrent(std::iter::empty::<Promise<i32>>(), 0);
    let err = out.wait().unwrap_err();
    assert_eq!(err.downcast_ref::<PromiseError>(), Some(&PromiseError::BadInput));
}

#[test]
fn when_concurrent_with_no_input_fulfills() {
    let out = when_concurrent(std::iter::empty::<Promise<i32>>(), 2);
    assert_eq!(out.wait().unwrap(), Vec::<i32>::new());
}

#[test]
fn when_concurrent_stops_pulling_after_a_failure() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let out = when_concurrent(
        (0..100).map(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            if i == 0 {
                Promise::rejected(PromiseError::BadInput)
            } else {
                Promise::fulfilled(i)
            }
        }),
        1,
    );
    assert!(out.wait().is_err());
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
}

#[test]
fn join_reports_every_outcome() {
    let (pa, ra) = Promise::<i32>::pending();
    let (pb, rb) = Promise::<i32>::pending();
    let all = join(vec![pa, pb]);
    ra.fulfill(1);
    rb.reject(PromiseError::BadInput);
    let outcomes = all.wait().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].as_ref().unwrap(), &1);
    assert!(outcomes[1].is_err());
}
