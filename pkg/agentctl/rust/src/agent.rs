// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use log::debug;
use nix::unistd::Uid;
use tokio::process::Command;

use crate::config::ControllerConfig;
use crate::errors::Error;

/// Exit code reported when a command cannot be spawned at all.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// One agent command line, e.g. `agent.py info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Discard the command's standard output.
    pub quiet: bool,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            quiet: false,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// The invocation as a single `sh -c` command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .map(|s| shell_quote(&s))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs agent self-commands and reports their exit codes.
#[allow(async_fn_in_trait)]
pub trait AgentRunner {
    async fn run(&self, invocation: &Invocation) -> Result<i32, Error>;
}

/// Runs agent commands as the configured agent user when invoked as root.
#[derive(Debug, Clone)]
pub struct AgentBinary {
    user: Option<String>,
}

impl AgentBinary {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            user: config.agent_user.clone(),
        }
    }

    fn command(&self, invocation: &Invocation) -> Command {
        match &self.user {
            Some(user) if Uid::effective().is_root() => {
                let mut cmd = Command::new("su");
                cmd.arg(user).arg("-c").arg(invocation.command_line());
                cmd
            }
            _ => {
                let mut cmd = Command::new(&invocation.program);
                cmd.args(&invocation.args);
                cmd
            }
        }
    }
}

impl AgentRunner for AgentBinary {
    async fn run(&self, invocation: &Invocation) -> Result<i32, Error> {
        let mut cmd = self.command(invocation);
        if invocation.quiet {
            cmd.stdout(Stdio::null());
        }
        debug!("running {}", invocation.command_line());
        let status = cmd.status().await.map_err(|source| Error::Spawn {
            program: invocation.program.display().to_string(),
            source,
        })?;
        Ok(exit_code(status))
    }
}

/// Shell convention: the exit code, or 128 + signal number when killed.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,@%+".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
