use anyhow::bail;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use ledblink::{NumberingScheme, PinId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::util::logging::LevelFilter;

/// All configuration sources, merged in order of increasing priority.
#[derive(Debug, Clone)]
pub struct Configs {
    figment: Figment,
}

/// The main struct holding all the possible config options.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub gpio: Gpio,
    pub general: General,
}

/// The LED's line and how to reach it.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Gpio {
    pub pin: u32,
    pub numbering: NumberingScheme,
    pub backend: BackendKind,
}

impl Gpio {
    pub fn pin_id(&self) -> PinId {
        PinId {
            scheme: self.numbering,
            number: self.pin,
        }
    }
}

/// The general config struct holding all the possible general options.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct General {
    pub log_level: Option<LevelFilter>,
    pub log_file: Option<PathBuf>,
    pub handle_sigterm: bool,
}

/// The GPIO backends the tool can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Raspberry Pi GPIO registers via /dev/gpiomem.
    Rppal,
    /// The kernel's /sys/class/gpio interface.
    Sysfs,
}

/// Environment variables override files, e.g. `LEDBLINK_GPIO__PIN=4`.
const ENV_PREFIX: &str = "LEDBLINK_";

/// Config sections reachable through the environment. Other `LEDBLINK_*`
/// variables (such as the version cargo exports at build time) are ignored.
const ENV_SECTIONS: [&str; 2] = ["gpio__", "general__"];

impl Configs {
    pub fn new(conf_dir: &Path) -> Configs {
        // Start off by merging in the default configuration file.
        let mut figments =
            Figment::new().merge(Toml::string(include_str!("default.toml")).nested());

        // The first file is meant to be committed next to the wiring notes of a project,
        // the second one holds settings of a single machine.
        for file in ["ledblink", "ledblink.local"] {
            figments = figments.merge(Toml::file(conf_dir.join(format!("{file}.toml"))).nested());
        }

        Configs { figment: figments }
    }

    /// Merges an explicitly requested config file on top of the discovered ones.
    pub fn merge(&mut self, conf_file: PathBuf) -> anyhow::Result<()> {
        let original = self.figment.clone();
        self.figment = match conf_file.extension().and_then(|e| e.to_str()) {
            Some("toml") => original.merge(Toml::file(conf_file).nested()),
            _ => bail!("File format not recognized from extension (supported: .toml)"),
        };
        Ok(())
    }

    /// Applies `LEDBLINK_*` environment variables to every profile.
    pub fn merge_env(&mut self) {
        self.figment = self
            .figment
            .clone()
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .filter(|key| {
                        let key = key.as_str().to_ascii_lowercase();
                        ENV_SECTIONS.iter().any(|section| key.starts_with(section))
                    })
                    .split("__")
                    .global(),
            );
    }

    /// Applies a value given on the command line, e.g. `("gpio.pin", 4)`.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        self.figment = self
            .figment
            .clone()
            .merge(Serialized::global(key, value));
    }

    pub fn prof_names(&self) -> Vec<String> {
        self.figment
            .profiles()
            .map(|p| String::from(p.as_str().as_str()))
            .collect()
    }

    /// Extract the requested config, but only if the profile has been explicitly defined in the
    /// configuration files etc. (selecting an arbitrary undefined profile with Figment will coerce
    /// it into existence - inheriting from the default config).
    pub fn select_defined(self: Configs, name: &str) -> anyhow::Result<Config> {
        let defined_profiles = self.prof_names();
        let requested_profile_defined: bool = defined_profiles
            .iter()
            .any(|p| p.to_lowercase() == name.to_lowercase());

        let figext: figment::error::Result<Config> = self.figment.select(name).extract();
        match figext {
            Err(figerr) => {
                // Join all the figment errors into a multiline string.
                bail!(
                    "Failed to parse supplied configuration:\n{}",
                    figerr
                        .into_iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<String>>()
                        .join("\n")
                );
            }
            Ok(config) => {
                if !requested_profile_defined {
                    bail!(
                        "the requested configuration profile \"{}\" hasn't been defined (defined profiles: {})",
                        name,
                        defined_profiles.join(", ")
                    );
                }
                Ok(config)
            }
        }
    }
}
