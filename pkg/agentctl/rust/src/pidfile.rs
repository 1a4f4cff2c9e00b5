// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::Path;

use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::errors::Error;
use crate::retry::RetryPolicy;

/// Exit code when the process is still alive after the stop schedule.
pub const STOP_TIMED_OUT: i32 = 2;

/// Read the pid stored in `path`. Missing, empty or non-numeric files yield `None`.
pub fn read_pid(path: &Path) -> Option<Pid> {
    let contents = std::fs::read_to_string(path).ok()?;
    match contents.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => Some(Pid::from_raw(pid)),
        _ => {
            debug!("ignoring unparsable pidfile {}", path.display());
            None
        }
    }
}

/// Probe `pid` with signal 0. A permission error still means the process exists.
pub fn is_alive(pid: Pid) -> bool {
    match signal::kill(pid, None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

fn remove_stale(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("failed to remove pidfile {}: {e}", path.display());
    }
}

/// Deliver `sig` to the process whose pid is stored in `path`.
pub fn signal_pidfile(path: &Path, sig: Signal) -> Result<(), Error> {
    let pid = read_pid(path).ok_or_else(|| Error::MissingPid {
        path: path.to_path_buf(),
    })?;
    signal::kill(pid, sig).map_err(|source| Error::Signal {
        signal: sig,
        pid: pid.as_raw(),
        source,
    })
}

/// Send SIGTERM to the pid in `path` and wait for it to go away.
///
/// Returns 0 when the process stopped or was not running, [`STOP_TIMED_OUT`]
/// when it outlived `policy`, and 1 when the signal could not be delivered.
pub async fn terminate(path: &Path, policy: &RetryPolicy) -> i32 {
    let Some(pid) = read_pid(path) else {
        info!("pidfile {} does not exist. Not running?", path.display());
        remove_stale(path);
        return 0;
    };

    if !is_alive(pid) {
        info!(
            "pidfile {} contains pid {pid}, but no running process could be found",
            path.display()
        );
        remove_stale(path);
        return 0;
    }

    info!("[{pid}] sending SIGTERM");
    match signal::kill(pid, Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => {
            remove_stale(path);
            return 0;
        }
        Err(e) => {
            warn!("[{pid}] failed to send SIGTERM: {e}");
            return 1;
        }
    }

    let polled = policy
        .poll(|_| async move {
            if is_alive(pid) {
                Err(())
            } else {
                Ok(())
            }
        })
        .await;
    match polled.outcome {
        Ok(()) => {
            info!("[{pid}] stopped after {} check(s)", polled.attempts);
            0
        }
        Err(()) => {
            warn!(
                "[{pid}] still running after {} check(s), giving up",
                polled.attempts
            );
            STOP_TIMED_OUT
        }
    }
}
