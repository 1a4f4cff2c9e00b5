// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use log::LevelFilter;

pub const USAGE: &str = "Usage: dd-agentctl {start|stop|restart|force-reload|info|status|reload|configcheck|configtest|jmx|flare}";

#[derive(Debug, Parser)]
#[command(name = "dd-agentctl", version, about = "Start, stop and check the Datadog Agent under supervisord")]
pub struct Cli {
    /// Shell-style defaults file overriding paths and the DATADOG_ENABLED flag
    /// [default: $DD_AGENTCTL_DEFAULTS or /etc/default/datadog-agent]
    #[arg(long, global = true)]
    pub defaults_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "info")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub verb: Verb,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Verb {
    /// Launch supervisord and wait for the essential processes
    Start,
    /// Stop supervisord and every agent process
    Stop,
    /// Stop, then start
    Restart,
    /// Same as restart
    ForceReload,
    /// Show the collector, dogstatsd and forwarder info
    Info,
    /// Check the supervised processes (scope: all, essential or optional)
    Status { scope: Option<String> },
    /// Send SIGHUP to the collector
    Reload,
    /// Validate the agent configuration
    Configcheck,
    /// Same as configcheck
    Configtest,
    /// Run an agent JMX command
    Jmx {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Send a flare to Datadog support
    Flare {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

pub enum Parsed {
    Run(Cli),
    /// Help or version output, printed and exited by clap.
    Display(clap::Error),
    /// Unknown verb or bad arguments.
    Usage(clap::Error),
}

pub fn parse<I, T>(args: I) -> Parsed
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Parsed::Run(cli),
        Err(e)
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) =>
        {
            Parsed::Display(e)
        }
        Err(e) => Parsed::Usage(e),
    }
}
