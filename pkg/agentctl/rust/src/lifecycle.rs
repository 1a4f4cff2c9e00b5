// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Service verbs built on the status query and a process manager handle.
//!
//! No state survives between invocations: every verb re-derives whether the
//! agent is running from the process manager.

use log::{debug, error, info, warn};
use nix::sys::signal::Signal;

use crate::agent::{AgentRunner, EXIT_SPAWN_FAILED, Invocation};
use crate::classify::Classifier;
use crate::config::ControllerConfig;
use crate::errors::Error;
use crate::kernel::KernelVersion;
use crate::status::{self, QueryScope, SERVICE_DESC, StatusReport};
use crate::supervisor::ProcessManager;

pub const SERVICE_NAME: &str = "datadog-agent";

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_MISSING: i32 = 3;

/// Exit code of a verb and the text to show the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub code: i32,
    pub report: Vec<String>,
}

impl Outcome {
    pub fn new(code: i32) -> Self {
        Self {
            code,
            report: Vec::new(),
        }
    }

    fn line(mut self, line: impl Into<String>) -> Self {
        self.report.push(line.into());
        self
    }

    pub fn success(&self) -> bool {
        self.code == EXIT_OK
    }
}

impl From<StatusReport> for Outcome {
    fn from(report: StatusReport) -> Self {
        Self {
            code: if report.passed() { EXIT_OK } else { EXIT_FAILURE },
            report: report.lines,
        }
    }
}

pub struct Controller<M, A> {
    config: ControllerConfig,
    classifier: Classifier,
    manager: M,
    agent: A,
    kernel: Option<KernelVersion>,
}

impl<M: ProcessManager, A: AgentRunner> Controller<M, A> {
    pub fn new(config: ControllerConfig, manager: M, agent: A) -> Self {
        let classifier = config.classifier();
        Self {
            config,
            classifier,
            manager,
            agent,
            kernel: None,
        }
    }

    /// Kernel version used to pick the `status` strategy; `None` always
    /// queries the supervisor.
    pub fn with_kernel(mut self, kernel: Option<KernelVersion>) -> Self {
        self.kernel = kernel;
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub async fn query(&self, scope: QueryScope) -> StatusReport {
        status::query(&self.manager, &self.classifier, scope).await
    }

    pub async fn start(&self) -> Outcome {
        let conf = &self.config.agent_conf;
        if !conf.exists() {
            error!("{} not found", conf.display());
            return Outcome::new(EXIT_CONFIG_MISSING)
                .line(format!("{} not found. Exiting.", conf.display()));
        }

        if !self.config.enabled {
            info!("disabled via {}", self.config.defaults_file.display());
            return Outcome::new(EXIT_OK).line(format!(
                "{SERVICE_DESC} is disabled via {}. Exiting.",
                self.config.defaults_file.display()
            ));
        }

        if self.query(QueryScope::Essential).await.passed() {
            return Outcome::new(EXIT_OK).line(format!("{SERVICE_DESC} already running."));
        }

        info!("Starting {SERVICE_DESC} (using supervisord)");

        // Clears a half-dead supervisor left behind by a previous run.
        let code = self.shutdown().await;
        if code != EXIT_OK {
            debug!("pre-start stop exited with {code}, starting anyway");
        }

        self.check_configuration().await;

        // A failed launch surfaces through the confirmation loop below.
        if let Err(e) = self.manager.launch().await {
            error!("launching the process manager: {e}");
        }

        let polled = self
            .config
            .start_policy
            .poll(|attempt| self.probe_essential(attempt))
            .await;

        match polled.outcome {
            Ok(_) => {
                info!("{SERVICE_DESC} started after {} check(s)", polled.attempts);
                Outcome::new(EXIT_OK).line(format!(
                    "Starting {SERVICE_DESC} (using supervisord): {SERVICE_NAME}."
                ))
            }
            Err(diagnostic) => {
                error!(
                    "{SERVICE_DESC} did not become healthy after {} check(s)",
                    polled.attempts
                );
                let mut outcome = Outcome::new(EXIT_FAILURE);
                outcome.report.extend(diagnostic.lines);
                outcome
                    .report
                    .push(format!("{SERVICE_DESC} failed to start."));
                self.shutdown().await;
                outcome
            }
        }
    }

    /// One confirmation poll: pass on the essential scope, or the full
    /// all-scope diagnostic for the same observation.
    async fn probe_essential(&self, attempt: u32) -> Result<StatusReport, StatusReport> {
        let (report, snapshot) =
            status::query_snapshot(&self.manager, &self.classifier, QueryScope::Essential).await;
        if report.passed() {
            return Ok(report);
        }
        debug!("check {attempt}: essential processes not running yet");
        Err(match snapshot {
            Some(snapshot) => status::judge(&snapshot, &self.classifier, QueryScope::All),
            None => report,
        })
    }

    async fn check_configuration(&self) {
        let check = Invocation::new(&self.config.agent_path, ["configcheck"]).quiet();
        match self.agent.run(&check).await {
            Ok(EXIT_OK) => {}
            Ok(code) => warn!(
                "Invalid check configuration (configcheck exited with {code}). \
                 Please run {} configtest for more details.",
                self.config.agent_path.display()
            ),
            Err(e) => warn!("could not validate the agent configuration: {e}"),
        }
    }

    async fn shutdown(&self) -> i32 {
        self.manager.shutdown(&self.config.stop_policy).await
    }

    pub async fn stop(&self) -> Outcome {
        info!("Stopping {SERVICE_DESC} (stopping supervisord)");
        let code = self.shutdown().await;
        let result = if code == EXIT_OK {
            format!("{SERVICE_NAME}.")
        } else {
            format!("failed (exit code {code})")
        };
        Outcome::new(code).line(format!(
            "Stopping {SERVICE_DESC} (stopping supervisord): {result}"
        ))
    }

    /// `stop` then `start`; a failed stop does not prevent the start.
    pub async fn restart(&self) -> Outcome {
        let stopped = self.stop().await;
        if !stopped.success() {
            warn!("stop exited with {}, starting anyway", stopped.code);
        }
        let started = self.start().await;
        Outcome {
            code: started.code,
            report: stopped.report.into_iter().chain(started.report).collect(),
        }
    }

    /// Ask the collector to reload by signalling it directly. No health check follows.
    pub async fn reload(&self) -> Outcome {
        let pidfile = &self.config.collector_pidfile;
        match self.manager.signal_process(pidfile, Signal::SIGHUP) {
            Ok(()) => Outcome::new(EXIT_OK)
                .line(format!("Reloading {SERVICE_DESC}: {SERVICE_NAME}.")),
            Err(e) => {
                error!("reloading the collector: {e}");
                Outcome::new(EXIT_FAILURE).line(format!("Reloading {SERVICE_DESC}: failed ({e})"))
            }
        }
    }

    /// Self-reported info of the collector, dogstatsd and the forwarder.
    /// The exit code is the sum of the three.
    pub async fn info(&self) -> Outcome {
        let components = [
            &self.config.agent_path,
            &self.config.dogstatsd_path,
            &self.config.forwarder_path,
        ];
        let mut total = 0;
        for program in components {
            let code = self.run_agent(Invocation::new(program, ["info"])).await;
            if code != EXIT_OK {
                warn!("[{}] info exited with {code}", program.display());
            }
            total += code;
        }
        Outcome::new(total)
    }

    /// Health of the process group. On kernels where the supervisor socket is
    /// unusable the agents' own `info` is reported instead.
    pub async fn status(&self, scope: QueryScope) -> Outcome {
        if let Some(kernel) = self.kernel
            && kernel < self.config.status_fallback_kernel
        {
            info!(
                "kernel {kernel} is older than {}, using info instead of the supervisor socket",
                self.config.status_fallback_kernel
            );
            return self.info().await;
        }
        self.query(scope).await.into()
    }

    pub async fn configcheck(&self) -> Outcome {
        let code = self
            .run_agent(Invocation::new(&self.config.agent_path, ["configcheck"]))
            .await;
        Outcome::new(code)
    }

    pub async fn jmx(&self, args: &[String]) -> Outcome {
        self.forward("jmx", args).await
    }

    pub async fn flare(&self, args: &[String]) -> Outcome {
        self.forward("flare", args).await
    }

    async fn forward(&self, command: &str, args: &[String]) -> Outcome {
        let invocation = Invocation::new(
            &self.config.agent_path,
            std::iter::once(command.to_string()).chain(args.iter().cloned()),
        );
        Outcome::new(self.run_agent(invocation).await)
    }

    async fn run_agent(&self, invocation: Invocation) -> i32 {
        match self.agent.run(&invocation).await {
            Ok(code) => code,
            Err(e @ Error::Spawn { .. }) => {
                error!("{e}");
                EXIT_SPAWN_FAILED
            }
            Err(e) => {
                error!("{e}");
                EXIT_FAILURE
            }
        }
    }
}
