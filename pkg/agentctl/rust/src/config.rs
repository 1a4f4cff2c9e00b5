// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, info};

use crate::classify::{Classifier, DEFAULT_OPTIONAL_PROGRAMS};
use crate::env::parse_defaults_file;
use crate::kernel::{DEFAULT_STATUS_FALLBACK, KernelVersion};
use crate::retry::{
    DEFAULT_RETRY_INTERVAL, DEFAULT_START_ATTEMPTS, DEFAULT_STOP_ATTEMPTS, RetryPolicy,
};

pub const DEFAULT_DEFAULTS_FILE: &str = "/etc/default/datadog-agent";
pub const DEFAULTS_FILE_ENV: &str = "DD_AGENTCTL_DEFAULTS";

/// Everything the controller needs to locate the agent and its supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Where the overrides below were read from.
    pub defaults_file: PathBuf,
    pub enabled: bool,

    pub agent_path: PathBuf,
    pub agent_conf: PathBuf,
    pub agent_user: Option<String>,
    pub dogstatsd_path: PathBuf,
    pub forwarder_path: PathBuf,
    pub collector_pidfile: PathBuf,

    pub supervisor_conf: PathBuf,
    pub supervisor_socket: PathBuf,
    pub supervisor_pidfile: PathBuf,
    pub supervisorctl_path: PathBuf,
    pub supervisord_path: PathBuf,
    /// Only observed programs of this supervisor group are counted.
    pub program_group: Option<String>,
    pub optional_programs: Vec<String>,

    pub start_policy: RetryPolicy,
    pub stop_policy: RetryPolicy,
    pub status_fallback_kernel: KernelVersion,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            defaults_file: PathBuf::from(DEFAULT_DEFAULTS_FILE),
            enabled: true,
            agent_path: PathBuf::from("/opt/datadog-agent/agent/agent.py"),
            agent_conf: PathBuf::from("/etc/dd-agent/datadog.conf"),
            agent_user: Some("dd-agent".to_string()),
            dogstatsd_path: PathBuf::from("/opt/datadog-agent/agent/dogstatsd.py"),
            forwarder_path: PathBuf::from("/opt/datadog-agent/agent/ddagent.py"),
            collector_pidfile: PathBuf::from("/opt/datadog-agent/run/dd-agent.pid"),
            supervisor_conf: PathBuf::from("/etc/dd-agent/supervisor.conf"),
            supervisor_socket: PathBuf::from("/opt/datadog-agent/run/datadog-supervisor.sock"),
            supervisor_pidfile: PathBuf::from("/opt/datadog-agent/run/datadog-supervisord.pid"),
            supervisorctl_path: PathBuf::from("/opt/datadog-agent/bin/supervisorctl"),
            supervisord_path: PathBuf::from("/opt/datadog-agent/bin/supervisord"),
            program_group: Some("datadog-agent".to_string()),
            optional_programs: DEFAULT_OPTIONAL_PROGRAMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            start_policy: RetryPolicy::new(DEFAULT_RETRY_INTERVAL, DEFAULT_START_ATTEMPTS),
            stop_policy: RetryPolicy::new(DEFAULT_RETRY_INTERVAL, DEFAULT_STOP_ATTEMPTS),
            status_fallback_kernel: DEFAULT_STATUS_FALLBACK,
        }
    }
}

/// The defaults file named by `DD_AGENTCTL_DEFAULTS`, or the packaged location.
pub fn defaults_file() -> PathBuf {
    std::env::var(DEFAULTS_FILE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DEFAULTS_FILE))
}

impl ControllerConfig {
    /// Built-in defaults overlaid with the assignments in `path`.
    /// A missing defaults file is not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = ControllerConfig {
            defaults_file: path.to_path_buf(),
            ..Default::default()
        };

        if !path.exists() {
            debug!("defaults file {} not found, using built-in defaults", path.display());
            return Ok(config);
        }

        let vars = parse_defaults_file(path)?;
        config
            .apply(&vars)
            .with_context(|| format!("invalid defaults file {}", path.display()))?;
        info!("loaded {} setting(s) from {}", vars.len(), path.display());
        Ok(config)
    }

    fn apply(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        for (key, value) in vars {
            match key.as_str() {
                "DATADOG_ENABLED" => self.enabled = !is_disabled(value),
                "AGENTPATH" => self.agent_path = PathBuf::from(value),
                "AGENTCONF" => self.agent_conf = PathBuf::from(value),
                "AGENTUSER" => self.agent_user = non_empty(value),
                "DOGSTATSDPATH" => self.dogstatsd_path = PathBuf::from(value),
                "FORWARDERPATH" => self.forwarder_path = PathBuf::from(value),
                "COLLECTOR_PIDFILE" => self.collector_pidfile = PathBuf::from(value),
                "SUPERVISOR_FILE" => self.supervisor_conf = PathBuf::from(value),
                "SUPERVISOR_SOCK" => self.supervisor_socket = PathBuf::from(value),
                "SUPERVISOR_PIDFILE" => self.supervisor_pidfile = PathBuf::from(value),
                "SUPERVISORCTL_PATH" => self.supervisorctl_path = PathBuf::from(value),
                "SUPERVISORD_PATH" => self.supervisord_path = PathBuf::from(value),
                "PROGRAM_GROUP" => self.program_group = non_empty(value),
                "OPTIONAL_PROGRAMS" => self.optional_programs = split_tokens(value),
                "START_RETRIES" => self.start_policy.max_attempts = parse_number(key, value)?,
                "STOP_RETRIES" => self.stop_policy.max_attempts = parse_number(key, value)?,
                "RETRY_INTERVAL_SECS" => {
                    let interval = std::time::Duration::from_secs(parse_number(key, value)?);
                    self.start_policy.interval = interval;
                    self.stop_policy.interval = interval;
                }
                "STATUS_FALLBACK_KERNEL" => {
                    self.status_fallback_kernel = KernelVersion::parse(value).ok_or_else(|| {
                        anyhow!("STATUS_FALLBACK_KERNEL must look like 4.4, got {value:?}")
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::with_optional(&self.optional_programs)
    }
}

fn is_disabled(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "no" | "false" | "0")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn split_tokens(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a non-negative integer, got {value:?}"))
}
