use std::{
    thread,
    time::{Duration, Instant},
};

use crate::cancel::Cancellation;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// The full duration passed.
    Elapsed,
    /// The cancellation fired before the duration passed.
    Cancelled,
}

/// Source of the delays between transitions.
pub trait Clock {
    /// Blocks for `duration`, returning early once `cancel` fires.
    fn sleep(&mut self, duration: Duration, cancel: &Cancellation) -> Wait;
}

/// Sleeps on the calling thread, waking up every `poll_interval` to check
/// for cancellation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    poll_interval: Duration,
}

impl SystemClock {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(20))
    }
}

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration, cancel: &Cancellation) -> Wait {
        let deadline = Instant::now() + duration;
        loop {
            if cancel.is_cancelled() {
                return Wait::Cancelled;
            }

            let now = Instant::now();
            if now >= deadline {
                return Wait::Elapsed;
            }

            thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}
