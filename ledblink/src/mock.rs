//! An in-memory GPIO backend and clock for tests and dry runs.
#![allow(missing_docs)]

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::{
    cancel::Cancellation,
    clock::{Clock, Wait},
    error::BackendError,
    pin::{Gpio, Level, OutputPin},
};

/// One call made against the mock, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Claim(u32),
    SetOutput(Level),
    Write(Level),
    Release,
    Sleep(Duration),
}

#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum MockError {
    /// Line {0} is already claimed.
    Busy(u32),
    /// Claiming line {0} was configured to fail.
    ClaimRefused(u32),
    /// Setting the mode of line {0} was configured to fail.
    ModeRefused(u32),
    /// Writing line {0} was configured to fail.
    WriteFailed(u32),
    /// Releasing line {0} was configured to fail.
    ReleaseFailed(u32),
}

#[derive(Debug, Default)]
struct Shared {
    operations: Vec<Operation>,
    claimed: BTreeSet<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    claim: bool,
    set_output: bool,
    release: bool,
    write_after: Option<usize>,
}

/// A GPIO backend that records every operation.
///
/// Clones share the same record, so a test can keep one handle while the
/// blinker owns another.
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    shared: Arc<Mutex<Shared>>,
    faults: Faults,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every claim fails, as if the process lacked permission.
    pub fn failing_claim(mut self) -> Self {
        self.faults.claim = true;
        self
    }

    /// Claims succeed but switching to output mode fails.
    pub fn failing_set_output(mut self) -> Self {
        self.faults.set_output = true;
        self
    }

    /// The first `writes` writes succeed, every later one fails.
    pub fn failing_write_after(mut self, writes: usize) -> Self {
        self.faults.write_after = Some(writes);
        self
    }

    pub fn failing_release(mut self) -> Self {
        self.faults.release = true;
        self
    }

    /// A clock that records its sleeps into this mock's operation log.
    pub fn clock(&self) -> FakeClock {
        FakeClock {
            shared: self.shared.clone(),
            sleeps: 0,
            cancel_on_sleep: None,
        }
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operations.clone()
    }

    /// The levels written by the blink loop, excluding the initial mode setup.
    pub fn writes(&self) -> Vec<Level> {
        self.lock()
            .operations
            .iter()
            .filter_map(|operation| match operation {
                Operation::Write(level) => Some(*level),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|recorded| **recorded == operation)
            .count()
    }

    pub fn releases(&self) -> usize {
        self.count(Operation::Release)
    }

    pub fn is_claimed(&self, line: u32) -> bool {
        self.lock().claimed.contains(&line)
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        // A panicking test thread must not hide the record from the others.
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Gpio for MockGpio {
    type Pin = MockPin;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn claim(&mut self, line: u32) -> Result<MockPin, BackendError> {
        let mut shared = self.lock();
        shared.operations.push(Operation::Claim(line));

        if self.faults.claim {
            return Err(MockError::ClaimRefused(line).into());
        }
        if !shared.claimed.insert(line) {
            return Err(MockError::Busy(line).into());
        }

        Ok(MockPin {
            line,
            gpio: self.clone(),
            writes: 0,
        })
    }
}

/// A line claimed from a [`MockGpio`].
#[derive(Debug)]
pub struct MockPin {
    line: u32,
    gpio: MockGpio,
    writes: usize,
}

impl MockPin {
    fn record(&self, operation: Operation) {
        self.gpio.lock().operations.push(operation);
    }
}

impl OutputPin for MockPin {
    fn set_output(&mut self, initial: Level) -> Result<(), BackendError> {
        self.record(Operation::SetOutput(initial));
        if self.gpio.faults.set_output {
            return Err(MockError::ModeRefused(self.line).into());
        }
        Ok(())
    }

    fn write(&mut self, level: Level) -> Result<(), BackendError> {
        self.record(Operation::Write(level));
        if let Some(limit) = self.gpio.faults.write_after {
            if self.writes >= limit {
                return Err(MockError::WriteFailed(self.line).into());
            }
        }
        self.writes += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), BackendError> {
        let mut shared = self.gpio.lock();
        shared.operations.push(Operation::Release);
        shared.claimed.remove(&self.line);

        if self.gpio.faults.release {
            return Err(MockError::ReleaseFailed(self.line).into());
        }
        Ok(())
    }
}

/// A clock that never blocks.
///
/// Every sleep is recorded as [`Operation::Sleep`]. With
/// [`FakeClock::cancel_on_sleep`] the clock simulates an interrupt arriving
/// in the middle of the given sleep.
#[derive(Debug)]
pub struct FakeClock {
    shared: Arc<Mutex<Shared>>,
    sleeps: usize,
    cancel_on_sleep: Option<usize>,
}

impl FakeClock {
    /// Fires the cancellation during the `nth` sleep (counting from 1).
    pub fn cancel_on_sleep(mut self, nth: usize) -> Self {
        self.cancel_on_sleep = Some(nth);
        self
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps
    }
}

impl Clock for FakeClock {
    fn sleep(&mut self, duration: Duration, cancel: &Cancellation) -> Wait {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .operations
            .push(Operation::Sleep(duration));
        self.sleeps += 1;

        if self.cancel_on_sleep == Some(self.sleeps) {
            cancel.cancel();
        }

        if cancel.is_cancelled() {
            Wait::Cancelled
        } else {
            Wait::Elapsed
        }
    }
}
