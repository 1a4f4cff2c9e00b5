// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

use crate::classify::{Classifier, Group, ProcessName};

/// Program state as reported by `supervisorctl status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    Unknown,
    Other(String),
}

impl ProcessState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "STOPPED" => ProcessState::Stopped,
            "STARTING" => ProcessState::Starting,
            "RUNNING" => ProcessState::Running,
            "BACKOFF" => ProcessState::Backoff,
            "STOPPING" => ProcessState::Stopping,
            "EXITED" => ProcessState::Exited,
            "FATAL" => ProcessState::Fatal,
            "UNKNOWN" => ProcessState::Unknown,
            other => ProcessState::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        *self == ProcessState::Running
    }

    pub fn is_fatal(&self) -> bool {
        *self == ProcessState::Fatal
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Stopped => write!(f, "STOPPED"),
            ProcessState::Starting => write!(f, "STARTING"),
            ProcessState::Running => write!(f, "RUNNING"),
            ProcessState::Backoff => write!(f, "BACKOFF"),
            ProcessState::Stopping => write!(f, "STOPPING"),
            ProcessState::Exited => write!(f, "EXITED"),
            ProcessState::Fatal => write!(f, "FATAL"),
            ProcessState::Unknown => write!(f, "UNKNOWN"),
            ProcessState::Other(s) => write!(f, "{s}"),
        }
    }
}

/// One line of the supervisor's live report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    pub name: ProcessName,
    pub state: ProcessState,
    pub description: String,
}

impl ProcessStatus {
    pub fn new(name: ProcessName, state: ProcessState) -> Self {
        Self {
            name,
            state,
            description: String::new(),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{:<32} {}", self.name.to_string(), self.state)
        } else {
            write!(
                f,
                "{:<32} {:<9} {}",
                self.name.to_string(),
                self.state.to_string(),
                self.description
            )
        }
    }
}

/// Observed and expected programs captured by a single status query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub observed: Vec<ProcessStatus>,
    pub expected: Vec<ProcessName>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthSignal {
    pub essential_degraded: bool,
    pub optional_degraded: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupCount {
    pub observed: usize,
    pub expected: usize,
}

impl GroupCount {
    pub fn is_degraded(self) -> bool {
        self.observed != self.expected
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Health {
    pub essential: GroupCount,
    pub optional: GroupCount,
}

impl Health {
    pub fn signal(&self) -> HealthSignal {
        HealthSignal {
            essential_degraded: self.essential.is_degraded(),
            optional_degraded: self.optional.is_degraded(),
        }
    }
}

/// Compare observed against expected programs per group.
///
/// Essential programs count only when RUNNING; optional programs count unless
/// FATAL, so a STARTING or BACKOFF optional program is not a degradation.
pub fn evaluate(snapshot: &Snapshot, classifier: &Classifier) -> Health {
    let mut health = Health::default();

    for status in &snapshot.observed {
        match classifier.classify(&status.name) {
            Group::Essential if status.state.is_running() => health.essential.observed += 1,
            Group::Optional if !status.state.is_fatal() => health.optional.observed += 1,
            _ => {}
        }
    }

    for name in &snapshot.expected {
        match classifier.classify(name) {
            Group::Essential => health.essential.expected += 1,
            Group::Optional => health.optional.expected += 1,
        }
    }

    health
}
