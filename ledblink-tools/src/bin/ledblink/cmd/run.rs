use std::ffi::c_int;

use anyhow::{Context, Result};
use ledblink::{Blinker, Cancellation, Gpio, NumberingScheme, PinId, SystemClock};
use signal_hook::{consts::signal, SigId};

use crate::util::{
    config::{BackendKind, Config, Configs},
    console::ConsoleReporter,
};

#[derive(clap::Parser, Debug, Default)]
pub struct Cmd {
    /// Number of the pin the LED is wired to.
    #[clap(long, help_heading = "GPIO CONFIGURATION")]
    pub pin: Option<u32>,

    /// How `--pin` is interpreted: BCM line number or physical header pin.
    #[clap(long, help_heading = "GPIO CONFIGURATION")]
    pub numbering: Option<NumberingScheme>,

    /// The GPIO backend to drive the pin with.
    #[clap(long, value_enum, help_heading = "GPIO CONFIGURATION")]
    pub backend: Option<BackendKind>,

    /// Also clean up and exit on SIGTERM, not only on Ctrl-C.
    #[clap(long)]
    pub handle_sigterm: bool,
}

impl Cmd {
    /// Applies the options given on the command line on top of the config files.
    pub fn override_config(&self, configs: &mut Configs) {
        if let Some(pin) = self.pin {
            configs.set("gpio.pin", pin);
        }
        if let Some(numbering) = self.numbering {
            configs.set("gpio.numbering", numbering);
        }
        if let Some(backend) = self.backend {
            configs.set("gpio.backend", backend);
        }
        if self.handle_sigterm {
            configs.set("general.handle_sigterm", true);
        }
    }

    pub fn run(self, config: &Config) -> Result<()> {
        let pin = config.gpio.pin_id();
        let cancel = Cancellation::new();

        // Registered before the pin is claimed, so an early Ctrl-C still
        // leads to a clean release. They stay registered until the pin is
        // released; a second Ctrl-C during cleanup is absorbed.
        let signals = register_signals(&cancel, config.general.handle_sigterm)?;

        let result = match config.gpio.backend {
            #[cfg(target_os = "linux")]
            BackendKind::Rppal => ledblink::backend::rppal::RppalGpio::new()
                .context("Failed to open the Raspberry Pi GPIO peripheral.")
                .and_then(|mut gpio| blink(&mut gpio, pin, &cancel)),
            #[cfg(target_os = "linux")]
            BackendKind::Sysfs => {
                blink(&mut ledblink::backend::sysfs::SysfsGpio::new(), pin, &cancel)
            }
            #[cfg(not(target_os = "linux"))]
            backend => Err(anyhow::anyhow!(
                "The {backend:?} backend is only available on Linux."
            )),
        };

        for id in signals {
            signal_hook::low_level::unregister(id);
        }
        // The pin is released; another Ctrl-C terminates right away.
        let restored = restore_default_handlers(&cancel, config.general.handle_sigterm);

        result?;
        restored?;
        Ok(())
    }
}

fn handled_signals(handle_sigterm: bool) -> Vec<c_int> {
    let mut signals = vec![signal::SIGINT];
    if handle_sigterm {
        signals.push(signal::SIGTERM);
    }
    signals
}

fn register_signals(cancel: &Cancellation, handle_sigterm: bool) -> Result<Vec<SigId>> {
    handled_signals(handle_sigterm)
        .into_iter()
        .map(|signal| {
            signal_hook::flag::register(signal, cancel.flag())
                .with_context(|| format!("Failed to install the handler for signal {signal}."))
        })
        .collect()
}

fn restore_default_handlers(cancel: &Cancellation, handle_sigterm: bool) -> Result<Vec<SigId>> {
    handled_signals(handle_sigterm)
        .into_iter()
        .map(|signal| {
            signal_hook::flag::register_conditional_default(signal, cancel.flag())
                .with_context(|| format!("Failed to restore the handler for signal {signal}."))
        })
        .collect()
}

fn blink<G: Gpio>(gpio: &mut G, pin: PinId, cancel: &Cancellation) -> Result<()> {
    let blinker = Blinker::initialize(
        gpio,
        pin,
        SystemClock::default(),
        ConsoleReporter::stdout(),
    )
    .with_context(|| {
        format!(
            "Failed to set up {pin}. Make sure you have proper permissions (try running with sudo)."
        )
    })?;

    let summary = blinker.run(cancel)?;
    tracing::info!("{} stopped after {} transitions", pin, summary.transitions);

    Ok(())
}
