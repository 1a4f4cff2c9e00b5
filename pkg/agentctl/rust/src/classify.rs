// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Partitioning of supervised programs into essential and optional groups.
//!
//! The same [`Classifier`] is applied to the programs the supervisor reports
//! and to the programs declared in its configuration, so that the two counts
//! compared by the health evaluator always agree on group membership.

use std::fmt;

/// Programs whose failure degrades the agent without taking it down.
pub const DEFAULT_OPTIONAL_PROGRAMS: &[&str] = &["dogstatsd", "jmxfetch", "go-metro", "process-agent"];

/// A supervisor program name, split into its optional group and program parts.
///
/// `supervisorctl status` reports grouped programs as `group:program`, while
/// the configuration declares them as `[program:program]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessName {
    pub group: Option<String>,
    pub program: String,
}

impl ProcessName {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            group: None,
            program: program.into(),
        }
    }

    pub fn grouped(group: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            program: program.into(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((group, program)) if !group.is_empty() => Self::grouped(group, program),
            _ => Self::new(raw),
        }
    }
}

impl fmt::Display for ProcessName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{group}:{}", self.program),
            None => write!(f, "{}", self.program),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Group {
    Essential,
    Optional,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Essential => write!(f, "essential"),
            Group::Optional => write!(f, "optional"),
        }
    }
}

/// How a rule token is compared against a program name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatcher {
    Exact(String),
    Glob(String),
}

impl NameMatcher {
    /// Tokens containing glob metacharacters become globs, everything else is
    /// compared literally.
    pub fn from_token(token: &str) -> Self {
        if token.contains(['*', '?', '[', '{']) {
            NameMatcher::Glob(token.to_string())
        } else {
            NameMatcher::Exact(token.to_string())
        }
    }

    pub fn matches(&self, program: &str) -> bool {
        match self {
            NameMatcher::Exact(name) => name == program,
            NameMatcher::Glob(pattern) => glob_match::glob_match(pattern, program),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRule {
    pub matcher: NameMatcher,
    pub group: Group,
}

/// Ordered membership rules over the program field; the first match wins and
/// unmatched programs are essential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    rules: Vec<MembershipRule>,
}

impl Classifier {
    pub fn new(rules: Vec<MembershipRule>) -> Self {
        Self { rules }
    }

    pub fn with_optional<S: AsRef<str>>(tokens: &[S]) -> Self {
        let rules = tokens
            .iter()
            .map(|t| MembershipRule {
                matcher: NameMatcher::from_token(t.as_ref()),
                group: Group::Optional,
            })
            .collect();
        Self::new(rules)
    }

    pub fn classify(&self, name: &ProcessName) -> Group {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&name.program))
            .map_or(Group::Essential, |rule| rule.group)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_optional(DEFAULT_OPTIONAL_PROGRAMS)
    }
}
