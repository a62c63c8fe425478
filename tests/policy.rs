//! Exercises the process-wide catch policy. Kept as a single test because
//! the policy is process-wide state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use promissory::{configure, CancellablePromise, CatchPolicy};

#[test]
fn all_errors_policy_lets_catch_handle_cancellation() {
    configure(|config| config.catch_policy = CatchPolicy::AllErrors);

    let seen = Arc::new(AtomicBool::new(false));
    let flag = seen.clone();
    let (promise, _resolver) = CancellablePromise::<i32>::pending();
    let caught = promise.catch(move |e| {
        flag.store(e.is_cancelled(), Ordering::SeqCst);
    });
    promise.cancel();
    caught.wait().unwrap();
    assert!(seen.load(Ordering::SeqCst));
}
