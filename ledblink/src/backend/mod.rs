//! Hardware implementations of [`Gpio`](crate::Gpio).
//!
//! Both backends are Linux only. `rppal` talks to the Raspberry Pi's GPIO
//! registers through `/dev/gpiomem`; `sysfs` uses the kernel's legacy
//! `/sys/class/gpio` interface and works on any board exposing it.

#[cfg(all(target_os = "linux", feature = "rppal"))]
pub mod rppal;
#[cfg(all(target_os = "linux", feature = "sysfs"))]
pub mod sysfs;
