use std::io::{self, Write};

use colored::Colorize;
use ledblink::{BlinkEvent, Level, Reporter};

/// Prints the blinker's status lines, one per event.
pub struct ConsoleReporter<W: Write> {
    sink: W,
    color: bool,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), true)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(sink: W, color: bool) -> Self {
        Self { sink, color }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn report(&mut self, event: &BlinkEvent) {
        let line = event.to_string();
        let line = match event {
            _ if !self.color => line,
            BlinkEvent::Transition(Level::High) => line.green().bold().to_string(),
            BlinkEvent::Transition(Level::Low) => line.dimmed().to_string(),
            BlinkEvent::Interrupted => line.yellow().to_string(),
            _ => line,
        };

        // Flush per line so the output keeps up when piped into a log collector.
        if let Err(error) = writeln!(self.sink, "{line}").and_then(|()| self.sink.flush()) {
            tracing::debug!("failed to write status line: {}", error);
        }
    }
}
