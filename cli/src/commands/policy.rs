// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy document commands
//!
//! Commands: validate, schema

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use policy_compliance_core::domain::policy;

use super::check::load_policy_value;

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Validate a policy document against the schema
    Validate {
        /// Policy document (YAML or JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the policy schema as JSON
    Schema,
}

/// Returns whether the command succeeded.
pub async fn handle_command(command: PolicyCommand) -> Result<bool> {
    match command {
        PolicyCommand::Validate { file } => validate(file),
        PolicyCommand::Schema => {
            let schema = policy::schema().context("Failed to load policy schema")?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(true)
        }
    }
}

fn validate(file: PathBuf) -> Result<bool> {
    let document = load_policy_value(&file)?;
    let report = policy::check(&document);

    if report.passed() {
        println!("{}", format!("✓ {} is a valid policy document", file.display()).green());
    } else {
        println!("{} {}", "✗".red(), report.reason());
    }
    Ok(report.passed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_policy_file() {
        let dir = tempfile::tempdir().unwrap();

        let valid = dir.path().join("valid.yaml");
        std::fs::write(&valid, "pull_request:\n  execute_job:\n    enabled: true\n").unwrap();
        assert!(validate(valid).unwrap());

        let unknown_key = dir.path().join("unknown.yaml");
        std::fs::write(&unknown_key, "push:\n  execute_job:\n    enabled: true\n").unwrap();
        assert!(!validate(unknown_key).unwrap());

        assert!(validate(dir.path().join("missing.yaml")).is_err());
    }
}
