mod cmd;
mod util;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::util::config::Configs;
use crate::util::logging::{setup_logging, LevelFilter};

#[derive(clap::Parser)]
#[clap(
    name = "ledblink",
    about = "Blink an LED on a GPIO pin until Ctrl-C is pressed",
    version = env!("LEDBLINK_VERSION"),
    long_version = env!("LEDBLINK_LONG_VERSION")
)]
struct Cli {
    /// Location for log file
    #[clap(long, global = true, help_heading = "LOG CONFIGURATION")]
    log_file: Option<PathBuf>,
    /// Log level for stderr. Falls back to the config file, then to `RUST_LOG`.
    #[clap(long, global = true, value_enum, help_heading = "LOG CONFIGURATION")]
    log_level: Option<LevelFilter>,

    /// Additional TOML config file, merged over `ledblink.toml` in the working directory
    #[clap(long, global = true, value_name = "PATH", help_heading = "CONFIGURATION")]
    config: Option<PathBuf>,
    /// Config profile to use
    #[clap(
        long,
        global = true,
        default_value = "default",
        help_heading = "CONFIGURATION"
    )]
    profile: String,

    #[clap(subcommand)]
    subcommand: Option<Subcommand>,

    /// Options of `run`, which is what happens without a subcommand
    #[clap(flatten)]
    run: cmd::run::Cmd,
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Blink the configured pin until interrupted (the default)
    Run(cmd::run::Cmd),
    /// Print the 40-pin header layout
    Pins(cmd::pins::Cmd),
}

impl Cli {
    fn load_config(&self) -> Result<util::config::Config> {
        let conf_dir = std::env::current_dir()?;
        let mut configs = Configs::new(&conf_dir);
        if let Some(path) = &self.config {
            configs.merge(path.clone())?;
        }
        configs.merge_env();

        if let Some(log_file) = &self.log_file {
            configs.set("general.log_file", log_file);
        }
        if let Some(level) = self.log_level {
            configs.set("general.log_level", level);
        }
        // Options given before the subcommand apply to every subcommand,
        // the ones given after `run` take precedence.
        self.run.override_config(&mut configs);
        if let Some(Subcommand::Run(cmd)) = &self.subcommand {
            cmd.override_config(&mut configs);
        }

        configs.select_defined(&self.profile)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = cli
        .load_config()
        .context("Failed to load configuration.")?;

    let log_path = config.general.log_file.as_deref();
    let _logger_guard = setup_logging(log_path, config.general.log_level)
        .context("Failed to set up logging.")?;
    tracing::debug!("using {:?}", config);

    match cli.subcommand {
        Some(Subcommand::Run(cmd)) => cmd.run(&config),
        Some(Subcommand::Pins(cmd)) => cmd.run(&config),
        None => cli.run.run(&config),
    }
}
