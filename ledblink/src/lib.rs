//! # Blink an LED on a single GPIO line
//!
//! # Prerequisites
//!
//! - A Linux single-board computer with the LED wired to a GPIO line
//! - Access to `/dev/gpiomem` (rppal backend) or `/sys/class/gpio` (sysfs backend)
//!
//! # Examples
//!
//! ## Blinking BCM 17 until Ctrl-C
//! ```no_run
//! # #[cfg(all(target_os = "linux", feature = "rppal"))]
//! # fn main() -> Result<(), ledblink::Error> {
//! use ledblink::{Blinker, Cancellation, PinId, SystemClock};
//! use ledblink::backend::rppal::RppalGpio;
//!
//! let mut gpio = RppalGpio::new()?;
//! let cancel = Cancellation::new();
//!
//! let blinker = Blinker::initialize(
//!     &mut gpio,
//!     PinId::bcm(17),
//!     SystemClock::default(),
//!     |event: &ledblink::BlinkEvent| println!("{event}"),
//! )?;
//!
//! // Returns once `cancel` fires; the pin is released on every exit path.
//! let summary = blinker.run(&cancel)?;
//! println!("{} transitions", summary.transitions);
//! # Ok(())
//! # }
//! # #[cfg(not(all(target_os = "linux", feature = "rppal")))]
//! # fn main() {}
//! ```
//!
//! ledblink is built around the [OutputPin] and [Gpio] traits, the [PinGuard]
//! that owns a claimed line, and the [Blinker] state machine driving it.

pub mod backend;
mod blinker;
mod cancel;
mod clock;
mod error;
#[cfg(any(test, feature = "test"))]
pub mod mock;
mod pin;

pub use crate::blinker::{
    BlinkEvent, Blinker, BlinkerState, Reporter, RunSummary, BLINK_INTERVAL, DEFAULT_PIN,
};
pub use crate::cancel::Cancellation;
pub use crate::clock::{Clock, SystemClock, Wait};
pub use crate::error::{BackendError, Error, InitializationError};
pub use crate::pin::{
    board_to_bcm, Gpio, Level, NumberingScheme, OutputPin, PinGuard, PinId, BOARD_HEADER,
};
