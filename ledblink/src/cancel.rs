use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A flag telling the blink loop to stop.
///
/// The flag is a plain [`AtomicBool`] so a signal handler can set it
/// (see `signal_hook::flag::register`). Setting it more than once has no
/// further effect.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing flag, e.g. one already handed to a signal handler.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// The underlying flag, for registering with a signal handler.
    pub fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
