//! Cooperative cancellation.
//!
//! A [`CancelContext`] tracks everything a chain of cancellable promises is
//! waiting on: underlying tasks that can be told to stop, reject hooks that
//! settle derived promises, and linked child contexts. Cancelling the
//! context fires all of them and remembers the rejection so later
//! registrations fire immediately.

use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::Rejection;

mod promise;

pub use self::promise::{race_cancellable, when_cancellable, CancellablePromise};

/// An underlying unit of work that can be told to stop early.
pub trait CancellableTask: Send {
    /// Requests that the task stop. Must be safe to call more than once.
    fn cancel(&self);
    /// Whether [`cancel`](CancellableTask::cancel) has been requested.
    fn is_cancelled(&self) -> bool;
}

type RejectHook = Box<dyn FnOnce(Rejection) + Send>;

/// A link to a merged context. The backward half of a cross-link is weak so
/// two merged contexts do not keep each other alive forever; a context no
/// one else references has nothing left to cancel.
enum ChildLink {
    Strong(Arc<CancelContext>),
    Weak(Weak<CancelContext>),
}

struct CancelItem {
    id: u64,
    task: Option<Box<dyn CancellableTask>>,
    reject: Option<RejectHook>,
    child: Option<ChildLink>,
}

impl CancelItem {
    fn fire(self, rejection: &Rejection) {
        if let Some(task) = self.task {
            task.cancel();
        }
        if let Some(reject) = self.reject {
            reject(rejection.clone());
        }
        match self.child {
            Some(ChildLink::Strong(child)) => child.cancel_with(rejection.clone()),
            Some(ChildLink::Weak(child)) => {
                if let Some(child) = child.upgrade() {
                    child.cancel_with(rejection.clone());
                }
            }
            None => {}
        }
    }
}

#[derive(Default)]
struct ContextInner {
    cancelled: Option<Rejection>,
    items: Vec<CancelItem>,
    next_id: u64,
}

/// The shared cancellation state behind a chain of cancellable promises.
pub struct CancelContext {
    inner: Mutex<ContextInner>,
}

impl fmt::Debug for CancelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CancelContext")
            .field("cancelled", &inner.cancelled)
            .field("items", &inner.items.len())
            .finish()
    }
}

impl CancelContext {
    pub fn new() -> Arc<CancelContext> {
        Arc::new(CancelContext {
            inner: Mutex::new(ContextInner {
                cancelled: None,
                items: Vec::new(),
                // Id zero is reserved for registrations that fired
                // immediately and were never stored.
                next_id: 1,
            }),
        })
    }

    /// Cancels with the canonical cancellation rejection.
    pub fn cancel(&self) {
        self.cancel_with(Rejection::cancelled());
    }

    /// Cancels with a caller-supplied rejection. Idempotent; only the first
    /// call's rejection is kept.
    pub fn cancel_with(&self, rejection: Rejection) {
        let items = {
            let mut inner = self.inner.lock();
            if inner.cancelled.is_some() {
                return;
            }
            // The flag is written before any item fires, so cross-linked
            // contexts firing back into this one hit the early return above
            // instead of recursing forever.
            inner.cancelled = Some(rejection.clone());
            mem::take(&mut inner.items)
        };
        for item in items {
            item.fire(&rejection);
        }
    }

    /// Whether cancellation has been requested.
    pub fn cancel_attempted(&self) -> bool {
        self.inner.lock().cancelled.is_some()
    }

    /// The rejection cancellation was requested with, if any.
    pub fn cancelled_error(&self) -> Option<Rejection> {
        self.inner.lock().cancelled.clone()
    }

    /// Registers a task/reject pair. If the context is already cancelled the
    /// pair fires immediately and nothing is stored.
    pub(crate) fn register(
        &self,
        task: Option<Box<dyn CancellableTask>>,
        reject: impl FnOnce(Rejection) + Send + 'static,
    ) -> u64 {
        let mut inner = self.inner.lock();
        match inner.cancelled.clone() {
            Some(rejection) => {
                drop(inner);
                let item = CancelItem {
                    id: 0,
                    task,
                    reject: Some(Box::new(reject)),
                    child: None,
                };
                item.fire(&rejection);
                0
            }
            None => {
                let id = inner.next_id;
                inner.next_id += 1;
                inner.items.push(CancelItem {
                    id,
                    task,
                    reject: Some(Box::new(reject)),
                    child: None,
                });
                id
            }
        }
    }

    /// Links two contexts so cancelling either cancels both.
    pub(crate) fn register_child(self: &Arc<Self>, child: Arc<CancelContext>) {
        link(&child, ChildLink::Weak(Arc::downgrade(self)));
        link(self, ChildLink::Strong(child));
    }

    /// Forgets a registration once the work it guarded has settled.
    pub(crate) fn deregister(&self, id: u64) {
        if id == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.items.iter().position(|item| item.id == id) {
            inner.items.swap_remove(pos);
        }
    }
}

fn link(from: &Arc<CancelContext>, to: ChildLink) {
    let mut inner = from.inner.lock();
    match inner.cancelled.clone() {
        Some(rejection) => {
            drop(inner);
            CancelItem {
                id: 0,
                task: None,
                reject: None,
                child: Some(to),
            }
            .fire(&rejection);
        }
        None => {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.items.push(CancelItem {
                id,
                task: None,
                reject: None,
                child: Some(to),
            });
        }
    }
}
