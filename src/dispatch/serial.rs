use std::sync::mpsc;
use std::thread;

use parking_lot::Mutex;

use super::{run_work, Dispatcher, Work};

/// A dispatcher backed by a single worker thread.
///
/// Jobs run one at a time in submission order. Dropping the dispatcher closes
/// the queue; the worker finishes what was already submitted and exits.
#[derive(Debug)]
pub struct SerialDispatcher {
    tx: Mutex<mpsc::Sender<Work>>,
}

impl SerialDispatcher {
    /// Spawns the worker thread with the given name.
    pub fn named(name: &str) -> Self {
        let (tx, rx) = mpsc::channel::<Work>();
        thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                while let Ok(work) = rx.recv() {
                    run_work(work);
                }
            })
            .expect("failed to spawn dispatcher thread");
        SerialDispatcher { tx: Mutex::new(tx) }
    }
}

impl Default for SerialDispatcher {
    fn default() -> Self {
        SerialDispatcher::named("promissory-serial")
    }
}

impl Dispatcher for SerialDispatcher {
    fn dispatch(&self, work: Work) {
        // The worker only exits once the sender is dropped, so send cannot
        // fail while `self` is alive.
        self.tx
            .lock()
            .send(work)
            .expect("serial dispatcher worker terminated");
    }
}
