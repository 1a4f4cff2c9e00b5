// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! The narrow interface the controller uses to drive the supervisor daemon.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info};
use nix::sys::signal::Signal;
use tokio::process::Command;

use crate::classify::ProcessName;
use crate::config::ControllerConfig;
use crate::errors::Error;
use crate::health::{ProcessState, ProcessStatus};
use crate::pidfile;
use crate::retry::RetryPolicy;

/// Capabilities the lifecycle controller needs from a process manager.
#[allow(async_fn_in_trait)]
pub trait ProcessManager {
    /// Whether the manager's control socket exists.
    fn is_reachable(&self) -> bool;

    /// Live per-program states.
    async fn process_states(&self) -> Result<Vec<ProcessStatus>, Error>;

    /// Programs declared in the manager's configuration. Read on every call.
    fn expected_programs(&self) -> Result<Vec<ProcessName>, Error>;

    /// Start the manager daemon.
    async fn launch(&self) -> Result<(), Error>;

    /// Stop the manager daemon, returning the stop primitive's exit code.
    async fn shutdown(&self, policy: &RetryPolicy) -> i32;

    /// Signal one managed process through its pidfile.
    fn signal_process(&self, pidfile: &Path, sig: Signal) -> Result<(), Error>;
}

/// `supervisord` driven through `supervisorctl`, its socket and its pidfile.
#[derive(Debug, Clone)]
pub struct Supervisord {
    ctl_path: PathBuf,
    daemon_path: PathBuf,
    conf: PathBuf,
    socket: PathBuf,
    pidfile: PathBuf,
    group: Option<String>,
}

impl Supervisord {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            ctl_path: config.supervisorctl_path.clone(),
            daemon_path: config.supervisord_path.clone(),
            conf: config.supervisor_conf.clone(),
            socket: config.supervisor_socket.clone(),
            pidfile: config.supervisor_pidfile.clone(),
            group: config.program_group.clone(),
        }
    }
}

impl ProcessManager for Supervisord {
    fn is_reachable(&self) -> bool {
        self.socket.exists()
    }

    async fn process_states(&self) -> Result<Vec<ProcessStatus>, Error> {
        let output = Command::new(&self.ctl_path)
            .arg("-c")
            .arg(&self.conf)
            .arg("status")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| Error::Spawn {
                program: self.ctl_path.display().to_string(),
                source,
            })?;
        // supervisorctl exits non-zero whenever a program is not RUNNING, so
        // the exit status carries no information here.
        debug!("supervisorctl status exited with {}", output.status);

        let text = String::from_utf8_lossy(&output.stdout);
        let statuses = parse_status_output(&text)
            .into_iter()
            .filter(|s| match &self.group {
                Some(group) => s.name.group.as_deref() == Some(group.as_str()),
                None => true,
            })
            .collect();
        Ok(statuses)
    }

    fn expected_programs(&self) -> Result<Vec<ProcessName>, Error> {
        let contents = std::fs::read_to_string(&self.conf).map_err(|source| Error::Read {
            path: self.conf.clone(),
            source,
        })?;
        Ok(parse_program_sections(&contents))
    }

    async fn launch(&self) -> Result<(), Error> {
        info!("launching {}", self.daemon_path.display());
        // `shutdown` reads this pidfile.
        let status = Command::new(&self.daemon_path)
            .arg("-c")
            .arg(&self.conf)
            .arg("--pidfile")
            .arg(&self.pidfile)
            .stdin(Stdio::null())
            .status()
            .await
            .map_err(|source| Error::Spawn {
                program: self.daemon_path.display().to_string(),
                source,
            })?;
        if !status.success() {
            return Err(Error::LaunchFailed {
                program: self.daemon_path.display().to_string(),
                code: crate::agent::exit_code(status),
            });
        }
        Ok(())
    }

    async fn shutdown(&self, policy: &RetryPolicy) -> i32 {
        pidfile::terminate(&self.pidfile, policy).await
    }

    fn signal_process(&self, pidfile: &Path, sig: Signal) -> Result<(), Error> {
        pidfile::signal_pidfile(pidfile, sig)
    }
}

/// Parse `supervisorctl status` output. Lines whose second column is not an
/// upper-case state word (connection errors, banners) are dropped.
pub fn parse_status_output(output: &str) -> Vec<ProcessStatus> {
    output.lines().filter_map(parse_status_line).collect()
}

fn parse_status_line(line: &str) -> Option<ProcessStatus> {
    let line = line.trim();
    let (name, rest) = line.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (state, description) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if state.is_empty() || !state.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    Some(ProcessStatus {
        name: ProcessName::parse(name),
        state: ProcessState::parse(state),
        description: description.trim().to_string(),
    })
}

/// Program names declared as `[program:NAME]` sections.
pub fn parse_program_sections(conf: &str) -> Vec<ProcessName> {
    conf.lines()
        .filter_map(|line| {
            line.trim()
                .strip_prefix("[program:")?
                .strip_suffix(']')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(ProcessName::new)
        })
        .collect()
}
