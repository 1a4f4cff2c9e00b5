// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::future::Future;

use tokio::time::{Duration, sleep};

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_START_ATTEMPTS: u32 = 10;
pub const DEFAULT_STOP_ATTEMPTS: u32 = 30;

/// A fixed-interval polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Result of [`RetryPolicy::poll`]: how many probes ran and the value of the
/// last one, `Ok` on success and `Err` when the schedule ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub attempts: u32,
    pub outcome: Result<T, T>,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Run `probe` until it returns `Ok` or `max_attempts` probes have run,
    /// sleeping `interval` between probes (never after the last one).
    ///
    /// A policy with zero attempts still probes once.
    pub async fn poll<T, F, Fut>(&self, mut probe: F) -> Polled<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, T>>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match probe(attempt).await {
                Ok(value) => {
                    return Polled {
                        attempts: attempt,
                        outcome: Ok(value),
                    };
                }
                Err(value) if attempt >= max => {
                    return Polled {
                        attempts: attempt,
                        outcome: Err(value),
                    };
                }
                Err(_) => {}
            }
            sleep(self.interval).await;
            attempt += 1;
        }
    }
}
