use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config;

use super::{timer, Dispatcher, Work};

/// A dispatcher that lets at most `max` jobs start per sliding `interval`.
///
/// Jobs over the limit queue up in submission order and start as earlier
/// jobs age out of the window.
#[derive(Clone)]
pub struct RateLimitedDispatcher {
    inner: Arc<Shared>,
}

struct Shared {
    max: usize,
    interval: Duration,
    downstream: Arc<dyn Dispatcher>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    in_window: usize,
    backlog: VecDeque<Work>,
}

impl RateLimitedDispatcher {
    /// At most `max` jobs per `interval`, forwarded to the configured default
    /// dispatcher. Panics if `max` is zero.
    pub fn new(max: usize, interval: Duration) -> Self {
        Self::with_downstream(max, interval, config::default_dispatcher())
    }

    /// At most `max` jobs per `interval`, forwarded to `downstream`.
    pub fn with_downstream(
        max: usize,
        interval: Duration,
        downstream: Arc<dyn Dispatcher>,
    ) -> Self {
        assert!(max > 0, "rate limit must allow at least one job");
        RateLimitedDispatcher {
            inner: Arc::new(Shared {
                max,
                interval,
                downstream,
                state: Mutex::new(State::default()),
            }),
        }
    }
}

impl Shared {
    fn submit(self: &Arc<Self>, work: Work) {
        {
            let mut state = self.state.lock();
            if state.in_window >= self.max {
                state.backlog.push_back(work);
                return;
            }
            state.in_window += 1;
        }
        self.arm_window_slot();
        self.downstream.dispatch(work);
    }

    /// Schedules the expiry of one window slot. When it fires, the slot is
    /// either handed to the oldest backlogged job or released.
    fn arm_window_slot(self: &Arc<Self>) {
        let this = self.clone();
        timer::schedule(
            self.interval,
            Box::new(move || {
                let next = {
                    let mut state = this.state.lock();
                    match state.backlog.pop_front() {
                        Some(work) => Some(work),
                        None => {
                            state.in_window -= 1;
                            if state.in_window == 0 {
                                state.backlog.shrink_to_fit();
                            }
                            None
                        }
                    }
                };
                if let Some(work) = next {
                    this.arm_window_slot();
                    this.downstream.dispatch(work);
                }
            }),
        );
    }
}

impl Dispatcher for RateLimitedDispatcher {
    fn dispatch(&self, work: Work) {
        self.inner.submit(work);
    }
}
