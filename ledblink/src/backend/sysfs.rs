use std::{
    collections::BTreeSet,
    sync::{Mutex, MutexGuard},
    thread,
    time::Duration,
};

use sysfs_gpio::{Direction, Pin};

use crate::{
    error::BackendError,
    pin::{Gpio, Level, OutputPin},
};

/// Time udev needs to fix up permissions of a freshly exported line.
const EXPORT_SETTLE_TIME: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum SysfsError {
    /// Line {0} is already claimed by this process.
    Busy(u32),
    /// Access to /sys/class/gpio failed.
    Sysfs(#[from] sysfs_gpio::Error),
}

/// Lines currently held by any [`SysfsGpio`] of this process.
static CLAIMED: Mutex<BTreeSet<u32>> = Mutex::new(BTreeSet::new());

fn claimed() -> MutexGuard<'static, BTreeSet<u32>> {
    CLAIMED.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// GPIO lines exported through `/sys/class/gpio`.
///
/// The kernel does not stop two processes from driving the same exported
/// line, so exclusivity is only enforced within this process. Every
/// instance shares the same record of claimed lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsGpio;

impl SysfsGpio {
    pub fn new() -> Self {
        Self
    }
}

impl Gpio for SysfsGpio {
    type Pin = SysfsPin;

    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn claim(&mut self, line: u32) -> Result<SysfsPin, BackendError> {
        let mut claimed = claimed();
        if claimed.contains(&line) {
            return Err(SysfsError::Busy(line).into());
        }

        let pin = Pin::new(u64::from(line));
        if pin.is_exported() {
            tracing::debug!("gpio{} is already exported, reusing it", line);
        } else {
            pin.export().map_err(SysfsError::from)?;
            thread::sleep(EXPORT_SETTLE_TIME);
        }

        claimed.insert(line);
        Ok(SysfsPin { line, pin })
    }
}

/// An exported sysfs line.
///
/// Releasing unexports the line.
#[derive(Debug)]
pub struct SysfsPin {
    line: u32,
    pin: Pin,
}

impl OutputPin for SysfsPin {
    fn set_output(&mut self, initial: Level) -> Result<(), BackendError> {
        let direction = match initial {
            Level::High => Direction::High,
            Level::Low => Direction::Low,
        };
        self.pin
            .set_direction(direction)
            .map_err(SysfsError::from)?;
        Ok(())
    }

    fn write(&mut self, level: Level) -> Result<(), BackendError> {
        self.pin
            .set_value(u8::from(level.is_high()))
            .map_err(SysfsError::from)?;
        Ok(())
    }

    fn release(&mut self) -> Result<(), BackendError> {
        claimed().remove(&self.line);
        self.pin.unexport().map_err(SysfsError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_busy(error: &BackendError, line: u32) -> bool {
        matches!(error.downcast_ref::<SysfsError>(), Some(SysfsError::Busy(busy)) if *busy == line)
    }

    #[test]
    fn claims_are_shared_between_instances() {
        // Far above any real line, so sysfs is never touched.
        let line = 60_017;
        claimed().insert(line);

        let first = SysfsGpio::new().claim(line).unwrap_err();
        let second = SysfsGpio::new().claim(line).unwrap_err();

        claimed().remove(&line);
        assert!(is_busy(&first, line));
        assert!(is_busy(&second, line));
    }
}
