//! One shared timer thread for everything time-based in the crate:
//! [`after`](crate::after), [`DelayDispatcher`](super::DelayDispatcher) and
//! the rate limiter's window ticks.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{run_work, Work};

struct Entry {
    at: Instant,
    seq: u64,
    work: Work,
}

// The heap is a max-heap; invert the ordering so the earliest deadline pops
// first, with the sequence number breaking ties in submission order.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Entry {}

#[derive(Default)]
struct TimerState {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

struct Timer {
    state: Mutex<TimerState>,
    cond: Condvar,
}

impl Timer {
    fn run_loop(&self) {
        let mut state = self.state.lock();
        loop {
            let now = Instant::now();
            let next_due = state.heap.peek().map(|entry| entry.at);
            match next_due {
                Some(at) if at <= now => {
                    if let Some(entry) = state.heap.pop() {
                        drop(state);
                        run_work(entry.work);
                        state = self.state.lock();
                    }
                }
                Some(at) => {
                    self.cond.wait_until(&mut state, at);
                }
                None => {
                    self.cond.wait(&mut state);
                }
            }
        }
    }
}

fn shared() -> &'static Timer {
    static TIMER: OnceLock<Timer> = OnceLock::new();
    TIMER.get_or_init(|| {
        thread::Builder::new()
            .name("promissory-timer".to_owned())
            // shared() blocks here until get_or_init publishes the cell.
            .spawn(|| shared().run_loop())
            .expect("failed to spawn timer thread");
        Timer {
            state: Mutex::new(TimerState::default()),
            cond: Condvar::new(),
        }
    })
}

/// Runs `work` on the timer thread once `delay` has elapsed.
pub(crate) fn schedule(delay: Duration, work: Work) {
    let timer = shared();
    let mut state = timer.state.lock();
    let seq = state.seq;
    state.seq += 1;
    state.heap.push(Entry {
        at: Instant::now() + delay,
        seq,
        work,
    });
    drop(state);
    timer.cond.notify_one();
}
