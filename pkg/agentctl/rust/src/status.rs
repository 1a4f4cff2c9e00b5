// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use thiserror::Error;

use crate::classify::Classifier;
use crate::errors::Error;
use crate::health::{Health, HealthSignal, Snapshot, evaluate};
use crate::supervisor::ProcessManager;

pub const SERVICE_DESC: &str = "Datadog Agent";

/// Which health signals decide a status verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryScope {
    #[default]
    All,
    Essential,
    Optional,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid status scope {0:?}, expected one of: all, essential, optional")]
pub struct ScopeError(pub String);

impl FromStr for QueryScope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(QueryScope::All),
            "essential" => Ok(QueryScope::Essential),
            "optional" => Ok(QueryScope::Optional),
            other => Err(ScopeError(other.to_string())),
        }
    }
}

impl fmt::Display for QueryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryScope::All => write!(f, "all"),
            QueryScope::Essential => write!(f, "essential"),
            QueryScope::Optional => write!(f, "optional"),
        }
    }
}

impl QueryScope {
    /// Parse a user-supplied scope, falling back to [`QueryScope::All`] with a
    /// warning when the text is not a known scope.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::parse::<QueryScope>) {
            None => QueryScope::All,
            Some(Ok(scope)) => scope,
            Some(Err(e)) => {
                warn!("{e}; using scope all");
                QueryScope::All
            }
        }
    }

    /// Under `All` both signals must be healthy and must agree.
    pub fn accepts(self, signal: HealthSignal) -> bool {
        match self {
            QueryScope::Essential => !signal.essential_degraded,
            QueryScope::Optional => !signal.optional_degraded,
            QueryScope::All => {
                signal.essential_degraded == signal.optional_degraded && !signal.essential_degraded
            }
        }
    }

    fn subject(self) -> &'static str {
        match self {
            QueryScope::All => "all child processes",
            QueryScope::Essential => "all essential child processes",
            QueryScope::Optional => "all optional child processes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub verdict: Verdict,
    pub health: Option<Health>,
    pub lines: Vec<String>,
}

impl StatusReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    fn not_running() -> Self {
        Self {
            verdict: Verdict::Fail,
            health: None,
            lines: vec![format!("{SERVICE_DESC} (supervisor) is not running")],
        }
    }

    fn unreadable(err: &Error) -> Self {
        Self {
            verdict: Verdict::Fail,
            health: None,
            lines: vec![format!(
                "{SERVICE_DESC} (supervisor) status could not be read: {err}"
            )],
        }
    }
}

/// Collect the live process report and the configured programs.
pub async fn snapshot<M: ProcessManager>(manager: &M) -> Result<Snapshot, Error> {
    let observed = manager.process_states().await?;
    let expected = manager.expected_programs()?;
    Ok(Snapshot { observed, expected })
}

/// Judge an already collected snapshot under `scope`.
pub fn judge(snapshot: &Snapshot, classifier: &Classifier, scope: QueryScope) -> StatusReport {
    let health = evaluate(snapshot, classifier);
    debug!(
        "essential {}/{} optional {}/{}",
        health.essential.observed,
        health.essential.expected,
        health.optional.observed,
        health.optional.expected
    );

    if scope.accepts(health.signal()) {
        return StatusReport {
            verdict: Verdict::Pass,
            health: Some(health),
            lines: vec![format!(
                "{SERVICE_DESC} (supervisor) is running {}",
                scope.subject()
            )],
        };
    }

    let mut lines: Vec<String> = snapshot.observed.iter().map(|s| s.to_string()).collect();
    lines.push(format!(
        "{SERVICE_DESC} (supervisor) is NOT running {}",
        scope.subject()
    ));
    StatusReport {
        verdict: Verdict::Fail,
        health: Some(health),
        lines,
    }
}

/// Query the process manager and judge the result under `scope`.
///
/// An unreachable manager fails immediately without reading any state.
pub async fn query<M: ProcessManager>(
    manager: &M,
    classifier: &Classifier,
    scope: QueryScope,
) -> StatusReport {
    query_snapshot(manager, classifier, scope).await.0
}

/// Like [`query`], also returning the snapshot the verdict was based on.
pub async fn query_snapshot<M: ProcessManager>(
    manager: &M,
    classifier: &Classifier,
    scope: QueryScope,
) -> (StatusReport, Option<Snapshot>) {
    if !manager.is_reachable() {
        return (StatusReport::not_running(), None);
    }
    match snapshot(manager).await {
        Ok(snapshot) => (judge(&snapshot, classifier, scope), Some(snapshot)),
        Err(e) => {
            warn!("reading supervisor status: {e}");
            (StatusReport::unreadable(&e), None)
        }
    }
}
