// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use dd_agentctl::agent::{AgentRunner, Invocation};
use dd_agentctl::classify::ProcessName;
use dd_agentctl::config::ControllerConfig;
use dd_agentctl::errors::Error;
use dd_agentctl::health::{ProcessState, ProcessStatus};
use dd_agentctl::retry::RetryPolicy;
use dd_agentctl::supervisor::ProcessManager;
use nix::sys::signal::Signal;
use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;

pub const AGENT: &str = "/fake/agent/agent.py";
pub const DOGSTATSD: &str = "/fake/agent/dogstatsd.py";
pub const FORWARDER: &str = "/fake/agent/ddagent.py";

// ===========================================================================
// In-memory process manager and agent
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Query,
    Launch,
    Shutdown,
    Signal(PathBuf, Signal),
}

struct FakeState {
    reachable: bool,
    healthy_on_poll: Option<u32>,
    polls_since_launch: u32,
    healthy: Vec<ProcessStatus>,
    unhealthy: Vec<ProcessStatus>,
    expected: Vec<ProcessName>,
    shutdown_code: i32,
    launch_fails: bool,
    signal_fails: bool,
    events: Vec<Event>,
}

/// A scripted supervisor. It becomes reachable when launched and reports the
/// healthy process list from the configured poll onwards.
pub struct FakeManager {
    state: Mutex<FakeState>,
}

pub fn grouped(program: &str, state: ProcessState) -> ProcessStatus {
    ProcessStatus::new(ProcessName::grouped("datadog-agent", program), state)
}

impl FakeManager {
    /// Supervisor not running; expected programs collector, forwarder, dogstatsd.
    pub fn stopped() -> Self {
        let expected = ["collector", "forwarder", "dogstatsd"]
            .iter()
            .map(|p| ProcessName::new(*p))
            .collect();
        Self {
            state: Mutex::new(FakeState {
                reachable: false,
                healthy_on_poll: Some(1),
                polls_since_launch: 0,
                healthy: vec![
                    grouped("collector", ProcessState::Running),
                    grouped("forwarder", ProcessState::Running),
                    grouped("dogstatsd", ProcessState::Running),
                ],
                unhealthy: vec![
                    grouped("collector", ProcessState::Running),
                    grouped("forwarder", ProcessState::Fatal),
                    grouped("dogstatsd", ProcessState::Starting),
                ],
                expected,
                shutdown_code: 0,
                launch_fails: false,
                signal_fails: false,
                events: Vec::new(),
            }),
        }
    }

    /// Supervisor already up and healthy.
    pub fn running() -> Self {
        let manager = Self::stopped();
        manager.state.lock().unwrap().reachable = true;
        manager
    }

    pub fn healthy_on_poll(self, poll: u32) -> Self {
        self.state.lock().unwrap().healthy_on_poll = Some(poll);
        self
    }

    pub fn never_healthy(self) -> Self {
        self.state.lock().unwrap().healthy_on_poll = None;
        self
    }

    /// Replace the live report and the declared programs.
    pub fn reporting(self, observed: Vec<ProcessStatus>, expected: &[&str]) -> Self {
        {
            let mut s = self.state.lock().unwrap();
            s.healthy = observed.clone();
            s.unhealthy = observed;
            s.expected = expected.iter().map(|p| ProcessName::new(*p)).collect();
        }
        self
    }

    pub fn shutdown_code(self, code: i32) -> Self {
        self.state.lock().unwrap().shutdown_code = code;
        self
    }

    pub fn failing_launch(self) -> Self {
        self.state.lock().unwrap().launch_fails = true;
        self
    }

    pub fn failing_signal(self) -> Self {
        self.state.lock().unwrap().signal_fails = true;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    /// Events recorded after the last launch.
    pub fn events_after_launch(&self) -> Vec<Event> {
        let events = self.events();
        match events.iter().rposition(|e| *e == Event::Launch) {
            Some(i) => events[i + 1..].to_vec(),
            None => Vec::new(),
        }
    }
}

impl ProcessManager for FakeManager {
    fn is_reachable(&self) -> bool {
        self.state.lock().unwrap().reachable
    }

    async fn process_states(&self) -> Result<Vec<ProcessStatus>, Error> {
        let mut s = self.state.lock().unwrap();
        s.events.push(Event::Query);
        s.polls_since_launch += 1;
        let healthy = s
            .healthy_on_poll
            .is_some_and(|poll| s.polls_since_launch >= poll);
        Ok(if healthy {
            s.healthy.clone()
        } else {
            s.unhealthy.clone()
        })
    }

    fn expected_programs(&self) -> Result<Vec<ProcessName>, Error> {
        Ok(self.state.lock().unwrap().expected.clone())
    }

    async fn launch(&self) -> Result<(), Error> {
        let mut s = self.state.lock().unwrap();
        s.events.push(Event::Launch);
        s.reachable = true;
        s.polls_since_launch = 0;
        if s.launch_fails {
            return Err(Error::LaunchFailed {
                program: "supervisord".to_string(),
                code: 2,
            });
        }
        Ok(())
    }

    async fn shutdown(&self, _policy: &RetryPolicy) -> i32 {
        let mut s = self.state.lock().unwrap();
        s.events.push(Event::Shutdown);
        s.reachable = false;
        s.shutdown_code
    }

    fn signal_process(&self, pidfile: &Path, sig: Signal) -> Result<(), Error> {
        let mut s = self.state.lock().unwrap();
        s.events.push(Event::Signal(pidfile.to_path_buf(), sig));
        if s.signal_fails {
            return Err(Error::MissingPid {
                path: pidfile.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Records agent invocations and answers with a per-program exit code.
#[derive(Default)]
pub struct FakeAgent {
    codes: HashMap<PathBuf, i32>,
    missing: Vec<PathBuf>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeAgent {
    pub fn with_code(mut self, program: &str, code: i32) -> Self {
        self.codes.insert(PathBuf::from(program), code);
        self
    }

    pub fn with_missing(mut self, program: &str) -> Self {
        self.missing.push(PathBuf::from(program));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

impl AgentRunner for FakeAgent {
    async fn run(&self, invocation: &Invocation) -> Result<i32, Error> {
        self.invocations.lock().unwrap().push(invocation.clone());
        if self.missing.contains(&invocation.program) {
            return Err(Error::Spawn {
                program: invocation.program.display().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(self.codes.get(&invocation.program).copied().unwrap_or(0))
    }
}

/// Controller settings rooted in `dir`, with an existing agent config file.
pub fn test_config(dir: &Path) -> ControllerConfig {
    let agent_conf = dir.join("datadog.conf");
    std::fs::write(&agent_conf, "[Main]\napi_key: abc\n").unwrap();
    ControllerConfig {
        defaults_file: dir.join("defaults"),
        agent_path: PathBuf::from(AGENT),
        dogstatsd_path: PathBuf::from(DOGSTATSD),
        forwarder_path: PathBuf::from(FORWARDER),
        agent_conf,
        collector_pidfile: dir.join("dd-agent.pid"),
        ..Default::default()
    }
}

// ===========================================================================
// Binary fixtures
// ===========================================================================

/// Write an executable shell script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A sandbox with a defaults file pointing every path at `dir`, a
/// `supervisorctl` that prints `status.txt`, and agent scripts that exit 0.
pub struct Sandbox {
    pub dir: tempfile::TempDir,
    extra: Vec<String>,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("datadog.conf"), "[Main]\n").unwrap();
        std::fs::write(
            root.join("supervisor.conf"),
            "[program:collector]\n[program:forwarder]\n[program:dogstatsd]\n",
        )
        .unwrap();
        std::fs::write(root.join("status.txt"), "").unwrap();
        write_script(
            root,
            "supervisorctl",
            &format!("cat {}; exit 3", root.join("status.txt").display()),
        );
        write_script(root, "supervisord", "exit 0");
        for name in ["agent.py", "dogstatsd.py", "ddagent.py"] {
            write_script(root, name, "exit 0");
        }
        Self {
            dir,
            extra: Vec::new(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn set_status(&self, status: &str) {
        std::fs::write(self.path("status.txt"), status).unwrap();
    }

    /// Make the supervisor socket appear.
    pub fn open_socket(&self) {
        std::fs::write(self.path("supervisor.sock"), "").unwrap();
    }

    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        write_script(self.dir.path(), name, body)
    }

    pub fn setting(mut self, line: &str) -> Self {
        self.extra.push(line.to_string());
        self
    }

    fn write_defaults(&self) -> PathBuf {
        let p = |n: &str| self.path(n).display().to_string();
        let mut lines = vec![
            format!("AGENTPATH={}", p("agent.py")),
            format!("DOGSTATSDPATH={}", p("dogstatsd.py")),
            format!("FORWARDERPATH={}", p("ddagent.py")),
            format!("AGENTCONF={}", p("datadog.conf")),
            "AGENTUSER=".to_string(),
            format!("SUPERVISOR_FILE={}", p("supervisor.conf")),
            format!("SUPERVISOR_SOCK={}", p("supervisor.sock")),
            format!("SUPERVISOR_PIDFILE={}", p("supervisord.pid")),
            format!("SUPERVISORCTL_PATH={}", p("supervisorctl")),
            format!("SUPERVISORD_PATH={}", p("supervisord")),
            format!("COLLECTOR_PIDFILE={}", p("dd-agent.pid")),
            "STATUS_FALLBACK_KERNEL=0.0".to_string(),
        ];
        lines.extend(self.extra.iter().cloned());
        let path = self.path("defaults");
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    /// Run `dd-agentctl` with `args` against this sandbox, logging warnings only.
    pub fn run(&self, args: &[&str]) -> Output {
        let mut full = vec!["--log-level", "warn"];
        full.extend_from_slice(args);
        self.run_with(&full)
    }

    /// Run `dd-agentctl` with `args` and the binary's default log level.
    pub fn run_with(&self, args: &[&str]) -> Output {
        let defaults = self.write_defaults();
        let bin = env!("CARGO_BIN_EXE_dd-agentctl");
        let output = Command::new(bin)
            .arg("--defaults-file")
            .arg(&defaults)
            .args(args)
            .output()
            .expect("failed to run dd-agentctl");
        eprintln!(
            "[dd-agentctl {args:?}] exit={:?}\n{}{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
