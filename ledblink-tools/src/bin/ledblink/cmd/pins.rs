use std::fmt::Write as _;

use anyhow::Result;
use colored::Colorize;
use ledblink::{board_to_bcm, PinId};

use crate::util::config::Config;

/// Header pins that carry power or ground instead of a GPIO line.
const SUPPLY_PINS: [(u32, &str); 12] = [
    (1, "3V3"),
    (2, "5V"),
    (4, "5V"),
    (6, "GND"),
    (9, "GND"),
    (14, "GND"),
    (17, "3V3"),
    (20, "GND"),
    (25, "GND"),
    (30, "GND"),
    (34, "GND"),
    (39, "GND"),
];

#[derive(clap::Parser, Debug)]
pub struct Cmd {
    /// Do not mark the configured LED pin.
    #[clap(long)]
    pub no_highlight: bool,
}

impl Cmd {
    pub fn run(self, config: &Config) -> Result<()> {
        let highlight = if self.no_highlight {
            None
        } else {
            // An invalid configured pin is simply not marked.
            config.gpio.pin_id().line().ok()
        };

        print!("{}", render(highlight));
        Ok(())
    }
}

fn label(physical: u32) -> String {
    match board_to_bcm(physical) {
        Some(bcm) => format!("GPIO{bcm}"),
        None => SUPPLY_PINS
            .iter()
            .find(|(pin, _)| *pin == physical)
            .map(|(_, name)| (*name).to_string())
            .unwrap_or_default(),
    }
}

/// Renders the 40-pin header as two columns, odd pins on the left.
fn render(highlight: Option<u32>) -> String {
    let mut out = String::new();
    let marked = |physical: u32, text: String| match highlight {
        Some(line) if board_to_bcm(physical) == Some(line) => text.green().bold().to_string(),
        _ => text,
    };

    for row in 0..20 {
        let left = 2 * row + 1;
        let right = left + 1;
        let _ = writeln!(
            out,
            "{} {:>2} | {:<2} {}",
            marked(left, format!("{:>7}", label(left))),
            left,
            right,
            marked(right, format!("{:<7}", label(right))),
        );
    }

    if let Some(line) = highlight {
        let _ = writeln!(out, "LED: {}", PinId::bcm(line));
    }
    out
}
