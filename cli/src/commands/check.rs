// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! One-shot evaluation of a job against GitHub
//!
//! Prints the report as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use policy_compliance_core::{
    application::ComplianceService,
    domain::{
        job::{JobMetadata, JobRequest, JobType, PullRequestMetadata},
        policy,
        service_config::ServiceConfig,
    },
    infrastructure::github::GitHubClient,
};

#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Job type: pull_request, workflow_dispatch, push or schedule
    #[arg(value_name = "JOB_TYPE")]
    job_type: JobType,

    /// Target repository (owner/name)
    #[arg(long)]
    repository: String,

    /// Branch the job runs on (the source branch for pull requests)
    #[arg(long)]
    branch: String,

    /// Commit the job runs on
    #[arg(long)]
    commit_sha: String,

    /// Repository holding the branch, when it is a fork (owner/name)
    #[arg(long)]
    source_repository: Option<String>,

    /// Branch the pull request merges into
    #[arg(long, required_if_eq("job_type", "pull_request"))]
    target_branch: Option<String>,

    /// Policy document (YAML or JSON); the configured default applies otherwise
    #[arg(long, value_name = "FILE")]
    policy: Option<PathBuf>,
}

impl CheckCommand {
    fn request(&self) -> Result<JobRequest> {
        let mut job = JobMetadata::new(&self.repository, &self.branch, &self.commit_sha);
        job.source_repository_name = self.source_repository.clone();

        let request = match self.job_type {
            JobType::PullRequest => JobRequest::PullRequest(PullRequestMetadata {
                job,
                target_branch_name: self
                    .target_branch
                    .clone()
                    .context("--target-branch is required for pull_request jobs")?,
            }),
            job_type => JobRequest::branch_job(job_type, job)?,
        };
        Ok(request)
    }
}

/// Returns whether the job passed.
pub async fn execute(command: CheckCommand, config_path: Option<PathBuf>) -> Result<bool> {
    let config =
        ServiceConfig::load_or_default(config_path).context("Failed to load configuration")?;
    let client =
        GitHubClient::from_config(&config.github).context("Failed to create GitHub client")?;
    let service = ComplianceService::new(Arc::new(client), config.used_policy());

    let request = command.request()?;
    let document = command.policy.as_deref().map(load_policy_value).transpose()?;

    let report = service
        .evaluate_raw(&request, document.as_ref())
        .await
        .context("Evaluation failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.passed() {
        eprintln!("{}", format!("✓ {} job passed", request.job_type()).green());
    } else {
        eprintln!("{}", format!("✗ {} job rejected", request.job_type()).red());
    }
    Ok(report.passed())
}

/// Read a YAML or JSON policy document; an empty file is an empty document.
pub fn load_policy_value(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy document {:?}", path))?;
    policy::value_from_yaml_str(&content)
        .with_context(|| format!("Failed to parse policy document {:?}", path))
}
