use std::sync::Arc;
use std::time::Duration;

use crate::config;

use super::{timer, Dispatcher, Work};

/// A dispatcher that holds every job for a fixed delay before forwarding it
/// to a downstream dispatcher.
#[derive(Clone)]
pub struct DelayDispatcher {
    delay: Duration,
    downstream: Arc<dyn Dispatcher>,
}

impl DelayDispatcher {
    /// Delays jobs by `delay`, then runs them on the configured default
    /// dispatcher.
    pub fn new(delay: Duration) -> Self {
        DelayDispatcher {
            delay,
            downstream: config::default_dispatcher(),
        }
    }

    /// Delays jobs by `delay`, then runs them on `downstream`.
    pub fn with_downstream(delay: Duration, downstream: Arc<dyn Dispatcher>) -> Self {
        DelayDispatcher { delay, downstream }
    }
}

impl Dispatcher for DelayDispatcher {
    fn dispatch(&self, work: Work) {
        let downstream = self.downstream.clone();
        timer::schedule(self.delay, Box::new(move || downstream.dispatch(work)));
    }
}
