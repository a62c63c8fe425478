use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use super::{run_work, Dispatcher, Work};

/// A dispatcher backed by a fixed pool of worker threads.
///
/// Jobs are handed to whichever worker reaches the queue first, so jobs may
/// run concurrently and completion order is not submission order.
#[derive(Debug)]
pub struct ThreadPoolDispatcher {
    tx: Mutex<mpsc::Sender<Work>>,
}

impl ThreadPoolDispatcher {
    /// Spawns `workers` threads. Panics if `workers` is zero.
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0, "thread pool needs at least one worker");
        let (tx, rx) = mpsc::channel::<Work>();
        let rx = Arc::new(Mutex::new(rx));
        for i in 0..workers {
            let rx = rx.clone();
            thread::Builder::new()
                .name(format!("promissory-pool-{i}"))
                .spawn(move || loop {
                    // Release the receiver lock before running the job so the
                    // other workers can pull from the queue meanwhile.
                    let work = {
                        let rx = rx.lock();
                        match rx.recv() {
                            Ok(work) => work,
                            Err(_) => break,
                        }
                    };
                    run_work(work);
                })
                .expect("failed to spawn dispatcher thread");
        }
        ThreadPoolDispatcher { tx: Mutex::new(tx) }
    }
}

impl Dispatcher for ThreadPoolDispatcher {
    fn dispatch(&self, work: Work) {
        self.tx
            .lock()
            .send(work)
            .expect("thread pool workers terminated");
    }
}
