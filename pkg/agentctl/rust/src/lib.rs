// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Service controller for the Datadog Agent running under supervisord.
//!
//! Implements the init-script verbs (`start`, `stop`, `restart`, `status`, ...)
//! on top of a [`supervisor::ProcessManager`] handle, judging health by
//! comparing the programs the supervisor reports against the programs its
//! configuration declares.
//!
//! Unix only: supervisord, pidfiles and signals have no Windows counterpart.

#[cfg(not(unix))]
compile_error!("dd-agentctl drives supervisord through Unix signals and only builds on Unix");

pub mod agent;
pub mod classify;
pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod health;
pub mod kernel;
pub mod lifecycle;
pub mod pidfile;
pub mod retry;
pub mod status;
pub mod supervisor;
