// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Policy Compliance CLI
//!
//! The `policy-compliance` binary gates self-hosted runners: it serves the
//! HTTP API the runner charm and runners talk to, and can evaluate a single
//! job from the command line.
//!
//! ## Commands
//!
//! - `policy-compliance serve` - Run the HTTP service
//! - `policy-compliance check <job_type>` - Evaluate one job, print the report as JSON
//! - `policy-compliance policy validate|schema` - Policy document tooling
//! - `policy-compliance config show|validate` - Configuration management
//!
//! `check` exits with status 1 when the job does not pass.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use policy_compliance::commands::{self, CheckCommand, ConfigCommand, PolicyCommand};
use policy_compliance_core::domain::service_config::CONFIG_PATH_ENV_NAME;

/// Repository policy compliance for self-hosted GitHub runners
#[derive(Parser)]
#[command(name = "policy-compliance")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = CONFIG_PATH_ENV_NAME,
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        global = true,
        env = "POLICY_COMPLIANCE_LOG_LEVEL",
        default_value = "info"
    )]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    #[command(name = "serve")]
    Serve {
        /// Bind address (default: server.bind_address from config)
        #[arg(long, env = "POLICY_COMPLIANCE_HOST")]
        host: Option<String>,

        /// Port (default: server.port from config)
        #[arg(long, env = "POLICY_COMPLIANCE_PORT")]
        port: Option<u16>,
    },

    /// Evaluate a single job against GitHub
    #[command(name = "check")]
    Check(CheckCommand),

    /// Policy document tooling
    #[command(name = "policy")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let passed = match cli.command {
        Commands::Serve { host, port } => {
            commands::serve::execute(cli.config, host, port).await?;
            true
        }
        Commands::Check(command) => commands::check::execute(command, cli.config).await?,
        Commands::Policy { command } => commands::policy::handle_command(command).await?,
        Commands::Config { command } => {
            commands::config::handle_command(command, cli.config).await?;
            true
        }
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

/// Initialize tracing subscriber for logging
///
/// Logs go to stderr so `check` keeps stdout for the JSON report.
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
