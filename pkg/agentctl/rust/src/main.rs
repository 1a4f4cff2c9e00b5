// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::process::ExitCode;

use anyhow::Result;
use dd_agentctl::agent::AgentBinary;
use dd_agentctl::cli::{self, Parsed, USAGE, Verb};
use dd_agentctl::config::{self, ControllerConfig};
use dd_agentctl::kernel::KernelVersion;
use dd_agentctl::lifecycle::{Controller, EXIT_FAILURE};
use dd_agentctl::status::QueryScope;
use dd_agentctl::supervisor::Supervisord;
use log::debug;
use simple_logger::SimpleLogger;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = match cli::parse(std::env::args_os()) {
        Parsed::Run(cli) => cli,
        Parsed::Display(e) => e.exit(),
        Parsed::Usage(e) => {
            eprintln!("{}", e.kind());
            println!("{USAGE}");
            return Ok(exit_status(EXIT_FAILURE));
        }
    };

    SimpleLogger::new().with_level(cli.log_level).init()?;
    debug!(
        "dd-agentctl {} running {:?}",
        env!("CARGO_PKG_VERSION"),
        cli.verb
    );

    let defaults = cli.defaults_file.unwrap_or_else(config::defaults_file);
    let config = ControllerConfig::load(&defaults)?;
    let manager = Supervisord::new(&config);
    let agent = AgentBinary::new(&config);
    let controller =
        Controller::new(config, manager, agent).with_kernel(KernelVersion::current());

    let outcome = match cli.verb {
        Verb::Start => controller.start().await,
        Verb::Stop => controller.stop().await,
        Verb::Restart | Verb::ForceReload => controller.restart().await,
        Verb::Info => controller.info().await,
        Verb::Status { scope } => {
            controller
                .status(QueryScope::parse_lenient(scope.as_deref()))
                .await
        }
        Verb::Reload => controller.reload().await,
        Verb::Configcheck | Verb::Configtest => controller.configcheck().await,
        Verb::Jmx { args } => controller.jmx(&args).await,
        Verb::Flare { args } => controller.flare(&args).await,
    };

    for line in &outcome.report {
        println!("{line}");
    }
    Ok(exit_status(outcome.code))
}

fn exit_status(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(u8::MAX))
}
