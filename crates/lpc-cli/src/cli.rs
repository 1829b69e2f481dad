//! Command-line definition

use crate::logging::LogFormat;
use clap::{value_parser, Arg, ArgAction, Command};
use std::path::PathBuf;

fn state_arg() -> Arg {
    Arg::new("state")
        .long("state")
        .short('s')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Cluster state file (.json, .yaml or .yml)")
}

/// Build the `lpc` command
#[must_use]
pub fn command() -> Command {
    Command::new("lpc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Latency profile reconciler")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Reconciler configuration (TOML); defaults apply when absent"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(value_parser!(LogFormat))
                .help("Log output format"),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Run one reconciliation pass and print the result")
                .arg(state_arg()),
        )
        .subcommand(
            Command::new("watch")
                .about("Run reconciliation passes on the resync interval")
                .arg(state_arg())
                .arg(
                    Arg::new("max-passes")
                        .long("max-passes")
                        .value_parser(value_parser!(u64))
                        .help("Stop after this many passes"),
                ),
        )
        .subcommand(
            Command::new("observe")
                .about("Print the config patch the current profile requires")
                .arg(state_arg())
                .arg(
                    Arg::new("existing")
                        .long("existing")
                        .short('e')
                        .value_parser(value_parser!(PathBuf))
                        .help("Existing server config (JSON); empty when absent"),
                ),
        )
        .subcommand(
            Command::new("resolve")
                .about("Print the server arguments for a profile")
                .arg(
                    Arg::new("profile")
                        .required(true)
                        .allow_hyphen_values(true)
                        .help("Profile value, e.g. Default or LowUpdateSlowReaction"),
                ),
        )
        .subcommand(
            Command::new("validate-config")
                .about("Load and check a configuration file")
                .arg(
                    Arg::new("print")
                        .long("print")
                        .action(ArgAction::SetTrue)
                        .help("Print the effective configuration"),
                ),
        )
}
