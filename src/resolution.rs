//! The settle-once core every promise is built on.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::config::{self, LogEvent};
use crate::error::Rejection;

/// The outcome of a settled promise.
pub type Resolution<T> = Result<T, Rejection>;

/// A callback waiting on a resolution.
pub(crate) type Observer<T> = Box<dyn FnOnce(Resolution<T>) + Send>;

enum Sealant<T> {
    Pending(Vec<Observer<T>>),
    Sealed(Resolution<T>),
}

/// A one-shot slot that transitions from pending (accumulating observers) to
/// sealed (holding the resolution) exactly once.
pub(crate) struct ResolutionBox<T> {
    sealant: Mutex<Sealant<T>>,
    /// Set once any rejection handler has been attached; a rejected box that
    /// drops with this unset gets reported as a swallowed error.
    handled: AtomicBool,
}

impl<T> ResolutionBox<T> {
    pub(crate) fn pending() -> Self {
        ResolutionBox {
            sealant: Mutex::new(Sealant::Pending(Vec::new())),
            handled: AtomicBool::new(false),
        }
    }

    pub(crate) fn sealed(resolution: Resolution<T>) -> Self {
        ResolutionBox {
            sealant: Mutex::new(Sealant::Sealed(resolution)),
            handled: AtomicBool::new(false),
        }
    }

    /// The resolution, if the box has been sealed.
    pub(crate) fn inspect(&self) -> Option<Resolution<T>>
    where
        T: Clone,
    {
        match &*self.sealant.lock() {
            Sealant::Pending(_) => None,
            Sealant::Sealed(r) => Some(r.clone()),
        }
    }

    pub(crate) fn mark_handled(&self) {
        self.handled.store(true, Ordering::Relaxed);
    }

    /// Seals the box and flushes the accumulated observers. Returns `false`
    /// without side effects if the box was already sealed.
    ///
    /// Observers run on the sealing thread, outside the lock, in the order
    /// they were attached.
    pub(crate) fn seal(&self, resolution: Resolution<T>) -> bool
    where
        T: Clone,
    {
        let observers = {
            let mut sealant = self.sealant.lock();
            match &mut *sealant {
                Sealant::Sealed(_) => return false,
                Sealant::Pending(observers) => {
                    let observers = mem::take(observers);
                    *sealant = Sealant::Sealed(resolution.clone());
                    observers
                }
            }
        };
        for observer in observers {
            observer(resolution.clone());
        }
        true
    }

    /// Attaches `observer`: queued if pending, invoked immediately (outside
    /// the lock) if already sealed.
    pub(crate) fn observe(&self, observer: Observer<T>)
    where
        T: Clone,
    {
        let mut observer = Some(observer);
        let sealed = {
            let mut sealant = self.sealant.lock();
            match &mut *sealant {
                Sealant::Pending(observers) => {
                    observers.push(observer.take().unwrap());
                    None
                }
                Sealant::Sealed(r) => Some(r.clone()),
            }
        };
        if let Some(resolution) = sealed {
            (observer.take().unwrap())(resolution);
        }
    }
}

impl<T> Drop for ResolutionBox<T> {
    fn drop(&mut self) {
        match self.sealant.get_mut() {
            Sealant::Pending(_) => config::emit(LogEvent::PendingDropped),
            Sealant::Sealed(Err(rejection)) => {
                if !self.handled.load(Ordering::Relaxed) && !rejection.is_cancelled() {
                    config::emit(LogEvent::Cauterized(rejection.clone()));
                }
            }
            Sealant::Sealed(Ok(_)) => {}
        }
    }
}
