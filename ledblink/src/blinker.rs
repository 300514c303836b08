use std::{fmt, time::Duration};

use crate::{
    cancel::Cancellation,
    clock::{Clock, Wait},
    error::Error,
    pin::{Gpio, Level, OutputPin, PinGuard, PinId},
};

/// Time between two transitions.
pub const BLINK_INTERVAL: Duration = Duration::from_secs(1);

/// The LED line used when nothing else is configured.
pub const DEFAULT_PIN: PinId = PinId::bcm(17);

/// Lifecycle of a [`Blinker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkerState {
    Uninitialized,
    OutputHigh,
    OutputLow,
    /// Terminal; the pin has been released.
    Shutdown,
}

impl From<Level> for BlinkerState {
    fn from(level: Level) -> Self {
        match level {
            Level::High => BlinkerState::OutputHigh,
            Level::Low => BlinkerState::OutputLow,
        }
    }
}

/// Something the operator is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlinkEvent {
    SetupStarted,
    SetupComplete { line: u32 },
    LoopStarted,
    Transition(Level),
    Interrupted,
    CleanupComplete,
}

impl fmt::Display for BlinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlinkEvent::SetupStarted => f.write_str("Setting up GPIO..."),
            BlinkEvent::SetupComplete { line } => write!(f, "GPIO {line} set as OUTPUT."),
            BlinkEvent::LoopStarted => {
                f.write_str("Starting LED blink loop. Press Ctrl+C to stop.")
            }
            BlinkEvent::Transition(Level::High) => f.write_str("LED ON"),
            BlinkEvent::Transition(Level::Low) => f.write_str("LED OFF"),
            BlinkEvent::Interrupted => f.write_str("Interrupted by user. Cleaning up GPIO..."),
            BlinkEvent::CleanupComplete => f.write_str("GPIO cleanup complete. Exiting."),
        }
    }
}

/// Receives the [`BlinkEvent`]s of a [`Blinker`].
pub trait Reporter {
    fn report(&mut self, event: &BlinkEvent);
}

impl<F> Reporter for F
where
    F: FnMut(&BlinkEvent),
{
    fn report(&mut self, event: &BlinkEvent) {
        self(event)
    }
}

/// What a finished blink loop did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of levels driven onto the pin by the loop.
    pub transitions: u64,
    pub final_state: BlinkerState,
}

/// Blinks one pin until cancelled.
pub struct Blinker<P: OutputPin, C: Clock, R: Reporter> {
    pin: PinGuard<P>,
    clock: C,
    reporter: R,
    interval: Duration,
    state: BlinkerState,
    transitions: u64,
}

impl<P, C, R> Blinker<P, C, R>
where
    P: OutputPin,
    C: Clock,
    R: Reporter,
{
    /// Claims `pin` from `gpio` and sets it up as an output driving low.
    pub fn initialize<G>(gpio: &mut G, pin: PinId, clock: C, mut reporter: R) -> Result<Self, Error>
    where
        G: Gpio<Pin = P> + ?Sized,
    {
        reporter.report(&BlinkEvent::SetupStarted);

        let line = pin.line()?;
        let guard = PinGuard::claim(gpio, pin)?;
        tracing::info!("{} claimed through the {} backend", pin, gpio.name());

        reporter.report(&BlinkEvent::SetupComplete { line });

        Ok(Self {
            pin: guard,
            clock,
            reporter,
            interval: BLINK_INTERVAL,
            state: BlinkerState::OutputLow,
            transitions: 0,
        })
    }

    /// Replaces the delay between transitions.
    #[cfg(any(test, feature = "test"))]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> BlinkerState {
        self.state
    }

    pub fn pin(&self) -> PinId {
        self.pin.id()
    }

    /// Alternates the pin between high and low until `cancel` fires.
    ///
    /// The pin is released before this returns, whether the loop was
    /// cancelled or a write failed.
    pub fn run(mut self, cancel: &Cancellation) -> Result<RunSummary, Error> {
        self.reporter.report(&BlinkEvent::LoopStarted);

        let outcome = self.blink(cancel);

        if outcome.is_ok() {
            self.reporter.report(&BlinkEvent::Interrupted);
        }
        let released = self.shutdown();

        // A failed write is the more interesting error.
        outcome?;
        released?;

        Ok(RunSummary {
            transitions: self.transitions,
            final_state: self.state,
        })
    }

    fn blink(&mut self, cancel: &Cancellation) -> Result<(), Error> {
        let mut level = Level::High;
        while !cancel.is_cancelled() {
            self.pin.write(level)?;
            self.state = level.into();
            self.transitions += 1;
            tracing::trace!("{} is {}", self.pin.id(), level);
            self.reporter.report(&BlinkEvent::Transition(level));

            if self.clock.sleep(self.interval, cancel) == Wait::Cancelled {
                break;
            }
            level = level.toggled();
        }

        tracing::debug!("blink loop cancelled after {} transitions", self.transitions);
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), Error> {
        self.state = BlinkerState::Shutdown;
        let result = self.pin.release().map(|_| ());
        self.reporter.report(&BlinkEvent::CleanupComplete);
        result
    }
}

impl<P: OutputPin, C: Clock, R: Reporter> fmt::Debug for Blinker<P, C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blinker")
            .field("pin", &self.pin)
            .field("interval", &self.interval)
            .field("state", &self.state)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}
