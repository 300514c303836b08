use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BackendError, Error, InitializationError};

/// Logical output level of a pin.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    High,
    #[default]
    Low,
}

impl Level {
    /// The opposite level.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Level::High => Level::Low,
            Level::Low => Level::High,
        }
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::High => f.write_str("HIGH"),
            Level::Low => f.write_str("LOW"),
        }
    }
}

/// How a pin number is interpreted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingScheme {
    /// The SoC's GPIO line number (Broadcom numbering on a Raspberry Pi).
    #[default]
    Bcm,
    /// The physical pin on the 40-pin header.
    Board,
}

impl FromStr for NumberingScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase()[..] {
            "bcm" | "gpio" => Ok(Self::Bcm),
            "board" | "physical" => Ok(Self::Board),
            _ => Err(format!("Numbering scheme '{s}' is unknown.")),
        }
    }
}

impl fmt::Display for NumberingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberingScheme::Bcm => f.write_str("BCM"),
            NumberingScheme::Board => f.write_str("BOARD"),
        }
    }
}

/// Physical header pin to BCM line, for every header pin that carries a GPIO.
///
/// Pins missing from this table are power or ground.
pub const BOARD_HEADER: [(u8, u8); 28] = [
    (3, 2),
    (5, 3),
    (7, 4),
    (8, 14),
    (10, 15),
    (11, 17),
    (12, 18),
    (13, 27),
    (15, 22),
    (16, 23),
    (18, 24),
    (19, 10),
    (21, 9),
    (22, 25),
    (23, 11),
    (24, 8),
    (26, 7),
    (27, 0),
    (28, 1),
    (29, 5),
    (31, 6),
    (32, 12),
    (33, 13),
    (35, 19),
    (36, 16),
    (37, 26),
    (38, 20),
    (40, 21),
];

/// Translates a physical header pin into its BCM line.
pub fn board_to_bcm(physical: u32) -> Option<u32> {
    BOARD_HEADER
        .iter()
        .find(|(board, _)| u32::from(*board) == physical)
        .map(|(_, bcm)| u32::from(*bcm))
}

/// A pin number together with the scheme it is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinId {
    pub scheme: NumberingScheme,
    pub number: u32,
}

impl PinId {
    pub const fn bcm(number: u32) -> Self {
        Self {
            scheme: NumberingScheme::Bcm,
            number,
        }
    }

    pub const fn board(number: u32) -> Self {
        Self {
            scheme: NumberingScheme::Board,
            number,
        }
    }

    /// Resolves the line number the backend has to claim.
    pub fn line(&self) -> Result<u32, Error> {
        match self.scheme {
            NumberingScheme::Bcm => Ok(self.number),
            NumberingScheme::Board => board_to_bcm(self.number)
                .ok_or_else(|| InitializationError::InvalidPin(*self).into()),
        }
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.scheme, self.number)
    }
}

/// A single GPIO line claimed from a [`Gpio`] backend.
pub trait OutputPin {
    /// Switches the line to output mode, driving `initial`.
    fn set_output(&mut self, initial: Level) -> Result<(), BackendError>;

    /// Drives the line to `level`. Only valid after [`OutputPin::set_output`].
    fn write(&mut self, level: Level) -> Result<(), BackendError>;

    /// Hands the line back to the system.
    fn release(&mut self) -> Result<(), BackendError>;
}

/// A source of GPIO lines.
pub trait Gpio {
    type Pin: OutputPin;

    /// Short name of the backend, used in log messages.
    fn name(&self) -> &'static str;

    /// Claims exclusive use of `line`.
    fn claim(&mut self, line: u32) -> Result<Self::Pin, BackendError>;
}

/// Exclusive ownership of a claimed output pin.
///
/// The line is driven low and released when the guard is dropped, unless
/// [`PinGuard::release`] already did so.
pub struct PinGuard<P: OutputPin> {
    pin: P,
    id: PinId,
    level: Level,
    configured: bool,
    released: bool,
}

impl<P: OutputPin> PinGuard<P> {
    /// Claims `id` from `gpio` and configures it as an output driving low.
    ///
    /// If the mode cannot be set the already claimed line is released again.
    pub fn claim<G>(gpio: &mut G, id: PinId) -> Result<Self, Error>
    where
        G: Gpio<Pin = P> + ?Sized,
    {
        let line = id.line()?;
        tracing::debug!("claiming {} (line {}) from {}", id, line, gpio.name());

        let pin = gpio
            .claim(line)
            .map_err(|source| InitializationError::Claim { pin: id, source })?;

        let mut guard = Self {
            pin,
            id,
            level: Level::Low,
            configured: false,
            released: false,
        };

        guard
            .pin
            .set_output(Level::Low)
            .map_err(|source| InitializationError::SetMode { pin: id, source })?;
        guard.configured = true;

        Ok(guard)
    }

    pub fn id(&self) -> PinId {
        self.id
    }

    /// The level last driven onto the line.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Drives the line to `level`.
    pub fn write(&mut self, level: Level) -> Result<(), Error> {
        self.pin.write(level).map_err(|source| Error::Transition {
            pin: self.id,
            level,
            source,
        })?;
        self.level = level;
        Ok(())
    }

    /// Drives the line low and hands it back to the system.
    ///
    /// Returns `Ok(false)` if the pin had already been released.
    pub fn release(&mut self) -> Result<bool, Error> {
        if self.released {
            return Ok(false);
        }
        self.released = true;

        if self.configured && self.level != Level::Low {
            if let Err(error) = self.pin.write(Level::Low) {
                tracing::warn!("failed to drive {} low before release: {}", self.id, error);
            } else {
                self.level = Level::Low;
            }
        }

        tracing::debug!("releasing {}", self.id);
        self.pin.release().map_err(|source| Error::Release {
            pin: self.id,
            source,
        })?;

        Ok(true)
    }
}

impl<P: OutputPin> Drop for PinGuard<P> {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            tracing::warn!("{}", error);
        }
    }
}

impl<P: OutputPin> fmt::Debug for PinGuard<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinGuard")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::mock::{MockGpio, Operation};

    #[test_case(PinId::bcm(17), Some(17); "bcm is passed through")]
    #[test_case(PinId::board(11), Some(17); "board 11 is bcm 17")]
    #[test_case(PinId::board(40), Some(21); "last header pin")]
    #[test_case(PinId::board(1), None; "3v3 power")]
    #[test_case(PinId::board(6), None; "ground")]
    #[test_case(PinId::board(41), None; "past the header")]
    fn resolves_lines(id: PinId, expected: Option<u32>) {
        assert_eq!(id.line().ok(), expected);
    }

    #[test]
    fn invalid_board_pin_is_an_initialization_error() {
        let error = PinId::board(2).line().unwrap_err();
        assert!(error.is_initialization());
        assert_eq!(error.to_string(), "The pin could not be initialized.");
    }

    #[test]
    fn level_toggles() {
        assert_eq!(Level::High.toggled(), Level::Low);
        assert_eq!(Level::Low.toggled(), Level::High);
        assert_eq!(Level::default(), Level::Low);
    }

    #[test_case("bcm", NumberingScheme::Bcm)]
    #[test_case("BOARD", NumberingScheme::Board)]
    #[test_case("physical", NumberingScheme::Board)]
    fn parses_numbering_schemes(input: &str, expected: NumberingScheme) {
        assert_eq!(input.parse::<NumberingScheme>(), Ok(expected));
    }

    #[test]
    fn unknown_numbering_scheme_is_rejected() {
        assert!("wiringpi".parse::<NumberingScheme>().is_err());
    }

    #[test]
    fn pin_id_display() {
        assert_eq!(PinId::bcm(17).to_string(), "BCM 17");
        assert_eq!(PinId::board(11).to_string(), "BOARD 11");
    }

    #[test]
    fn claim_sets_output_low() {
        let mut gpio = MockGpio::new();
        let guard = PinGuard::claim(&mut gpio, PinId::bcm(17)).unwrap();

        assert_eq!(guard.level(), Level::Low);
        assert_eq!(
            gpio.operations(),
            vec![Operation::Claim(17), Operation::SetOutput(Level::Low)]
        );
    }

    #[test]
    fn drop_releases_once() {
        let mut gpio = MockGpio::new();
        {
            let mut guard = PinGuard::claim(&mut gpio, PinId::bcm(4)).unwrap();
            guard.write(Level::High).unwrap();
        }

        assert_eq!(
            gpio.operations(),
            vec![
                Operation::Claim(4),
                Operation::SetOutput(Level::Low),
                Operation::Write(Level::High),
                Operation::Write(Level::Low),
                Operation::Release,
            ]
        );
        assert!(!gpio.is_claimed(4));
    }

    #[test]
    fn explicit_release_is_idempotent() {
        let mut gpio = MockGpio::new();
        let mut guard = PinGuard::claim(&mut gpio, PinId::bcm(4)).unwrap();

        assert!(guard.release().unwrap());
        assert!(!guard.release().unwrap());
        drop(guard);

        assert_eq!(gpio.releases(), 1);
    }

    #[test]
    fn second_claim_of_the_same_line_fails() {
        let mut gpio = MockGpio::new();
        let _first = PinGuard::claim(&mut gpio, PinId::bcm(17)).unwrap();

        let error = PinGuard::claim(&mut gpio, PinId::board(11)).unwrap_err();
        assert!(matches!(
            error,
            Error::Initialization(InitializationError::Claim { .. })
        ));
    }

    #[test]
    fn failed_set_mode_releases_the_claimed_line() {
        let mut gpio = MockGpio::new().failing_set_output();

        let error = PinGuard::claim(&mut gpio, PinId::bcm(17)).unwrap_err();

        assert!(matches!(
            error,
            Error::Initialization(InitializationError::SetMode { .. })
        ));
        assert_eq!(
            gpio.operations(),
            vec![
                Operation::Claim(17),
                Operation::SetOutput(Level::Low),
                Operation::Release,
            ]
        );
    }
}
