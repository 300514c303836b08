use rppal::gpio;

use crate::{
    error::{BackendError, Error, InitializationError},
    pin::{Gpio, Level, OutputPin},
};

#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum RppalError {
    /// Line {0} is not a Raspberry Pi GPIO line.
    LineOutOfRange(u32),
    /// BCM {0} has not been configured as an output.
    NotAnOutput(u8),
    /// BCM {0} has already been released.
    Released(u8),
    /// GPIO access failed.
    Gpio(#[from] gpio::Error),
}

/// The Raspberry Pi's GPIO peripheral, addressed by BCM line number.
pub struct RppalGpio {
    gpio: gpio::Gpio,
}

impl RppalGpio {
    /// Opens `/dev/gpiomem` (or `/dev/mem` as root).
    pub fn new() -> Result<Self, Error> {
        let gpio = gpio::Gpio::new().map_err(|source| InitializationError::Backend {
            backend: "rppal",
            source: Box::new(RppalError::from(source)),
        })?;
        Ok(Self { gpio })
    }
}

impl Gpio for RppalGpio {
    type Pin = RppalPin;

    fn name(&self) -> &'static str {
        "rppal"
    }

    fn claim(&mut self, line: u32) -> Result<RppalPin, BackendError> {
        let bcm = u8::try_from(line).map_err(|_| RppalError::LineOutOfRange(line))?;
        // Fails with `PinUsed` if this process already holds the line.
        let pin = self.gpio.get(bcm).map_err(RppalError::from)?;

        Ok(RppalPin {
            bcm,
            mode: Mode::Claimed(pin),
        })
    }
}

enum Mode {
    Claimed(gpio::Pin),
    Output(gpio::OutputPin),
    Released,
}

/// A BCM line held by this process.
///
/// Releasing drops the rppal handle, which restores the mode the line had
/// before it was claimed.
pub struct RppalPin {
    bcm: u8,
    mode: Mode,
}

fn to_rppal(level: Level) -> gpio::Level {
    match level {
        Level::High => gpio::Level::High,
        Level::Low => gpio::Level::Low,
    }
}

impl OutputPin for RppalPin {
    fn set_output(&mut self, initial: Level) -> Result<(), BackendError> {
        let mode = std::mem::replace(&mut self.mode, Mode::Released);
        let output = match mode {
            Mode::Claimed(pin) => match initial {
                Level::High => pin.into_output_high(),
                Level::Low => pin.into_output_low(),
            },
            Mode::Output(mut output) => {
                output.write(to_rppal(initial));
                output
            }
            Mode::Released => return Err(RppalError::Released(self.bcm).into()),
        };
        self.mode = Mode::Output(output);
        Ok(())
    }

    fn write(&mut self, level: Level) -> Result<(), BackendError> {
        match &mut self.mode {
            Mode::Output(output) => {
                output.write(to_rppal(level));
                Ok(())
            }
            Mode::Claimed(_) => Err(RppalError::NotAnOutput(self.bcm).into()),
            Mode::Released => Err(RppalError::Released(self.bcm).into()),
        }
    }

    fn release(&mut self) -> Result<(), BackendError> {
        match std::mem::replace(&mut self.mode, Mode::Released) {
            Mode::Released => Err(RppalError::Released(self.bcm).into()),
            _ => Ok(()),
        }
    }
}
