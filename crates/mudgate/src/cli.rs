//! Command-line interface handling for the mudgate server.
//!
//! This module provides command-line argument parsing using the `clap` crate.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// Every option except the config path overrides the matching setting from
/// the configuration file.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the game listener address
    pub bind_address: Option<String>,
    /// Optional override for the stats listener address
    pub stats_bind_address: Option<String>,
    /// Whether to disable the stats service
    pub no_stats: bool,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses the process arguments.
    ///
    /// Exits the process with usage information on invalid input, as clap does.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            bind_address: matches.get_one::<String>("bind").cloned(),
            stats_bind_address: matches.get_one::<String>("stats-bind").cloned(),
            no_stats: matches.get_flag("no-stats"),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

fn command() -> Command {
    Command::new("mudgate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Telnet front-end for text game servers")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("bind")
                .short('b')
                .long("bind")
                .value_name("ADDRESS")
                .help("Game listener address (e.g., 0.0.0.0:4111)"),
        )
        .arg(
            Arg::new("stats-bind")
                .long("stats-bind")
                .value_name("ADDRESS")
                .help("Stats listener address (e.g., 0.0.0.0:4112)"),
        )
        .arg(
            Arg::new("no-stats")
                .long("no-stats")
                .help("Do not bind the stats service")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
}
