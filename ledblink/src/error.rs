use crate::pin::{Level, PinId};

/// Error reported by a GPIO backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// The error type for everything the blinker does with its pin.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// The pin could not be initialized.
    Initialization(#[from] InitializationError),
    /// Failed to drive {pin} {level}.
    Transition {
        pin: PinId,
        level: Level,
        #[source]
        source: BackendError,
    },
    /// Failed to release {pin}.
    Release {
        pin: PinId,
        #[source]
        source: BackendError,
    },
}

impl Error {
    /// Returns `true` if the error happened before the pin was ready.
    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization(_))
    }
}

/// Setup of the pin failed. Always fatal, never retried.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum InitializationError {
    /// Could not open the {backend} GPIO backend.
    Backend {
        backend: &'static str,
        #[source]
        source: BackendError,
    },
    /// {0} does not map to a GPIO line.
    InvalidPin(PinId),
    /// Could not claim {pin} (is the process allowed to access GPIO?).
    Claim {
        pin: PinId,
        #[source]
        source: BackendError,
    },
    /// Could not configure {pin} as an output.
    SetMode {
        pin: PinId,
        #[source]
        source: BackendError,
    },
}
