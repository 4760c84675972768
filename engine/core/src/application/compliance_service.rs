// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Compliance Service
//!
//! Composes the check catalogue into a single verdict per job.
//!
//! For each request the service validates the metadata, selects the checks
//! that apply to the job type and source, drops those the policy document
//! disables, runs the rest in catalogue order and returns the first report
//! that did not pass. Every selected check runs even after a failure so the
//! log records the full picture.

use serde_json::Value;
use std::sync::Arc;

use crate::application::checks::{self, guard};
use crate::domain::errors::ComplianceError;
use crate::domain::job::{CheckName, JobRequest};
use crate::domain::policy::{PolicyDocument, UsedPolicy};
use crate::domain::report::Report;
use crate::domain::repository_client::RepositoryClient;

pub struct ComplianceService {
    client: Arc<dyn RepositoryClient>,
    default_policy: UsedPolicy,
}

impl ComplianceService {
    pub fn new(client: Arc<dyn RepositoryClient>, default_policy: UsedPolicy) -> Self {
        Self {
            client,
            default_policy,
        }
    }

    /// Policy applied when the caller supplies no document.
    pub fn default_policy(&self) -> UsedPolicy {
        self.default_policy
    }

    /// Evaluate `request` against `policy`, or the default policy when `None`.
    pub async fn evaluate(
        &self,
        request: &JobRequest,
        policy: Option<&PolicyDocument>,
    ) -> Result<Report, ComplianceError> {
        request.validate()?;

        let default_document;
        let policy = match policy {
            Some(document) => document,
            None => {
                default_document = self.default_policy.document();
                &default_document
            }
        };

        let job_type = request.job_type();
        let selected: Vec<CheckName> = Self::applicable_checks(request)
            .into_iter()
            .filter(|check| {
                let enabled = policy.enabled(job_type, *check);
                if !enabled {
                    tracing::debug!(
                        job_type = %job_type,
                        check = %check,
                        "check disabled by policy"
                    );
                }
                enabled
            })
            .collect();

        let mut verdict = Report::pass();
        for check in selected {
            let report = self.run_check(check, request).await?;
            if verdict.passed() && !report.passed() {
                verdict = report;
            }
        }

        tracing::info!(
            job_type = %job_type,
            repository = %request.metadata().repository_name,
            commit_sha = %request.metadata().commit_sha,
            result = %verdict.result(),
            "job evaluated"
        );
        Ok(verdict)
    }

    /// Evaluate with an unparsed policy document; an invalid one is a
    /// configuration error, never partially applied.
    pub async fn evaluate_raw(
        &self,
        request: &JobRequest,
        document: Option<&Value>,
    ) -> Result<Report, ComplianceError> {
        let policy = document.map(PolicyDocument::parse).transpose()?;
        self.evaluate(request, policy.as_ref()).await
    }

    /// Checks relevant to the request, in catalogue order, before the policy
    /// document is consulted.
    pub fn applicable_checks(request: &JobRequest) -> Vec<CheckName> {
        let is_fork = request.metadata().is_fork();
        request
            .job_type()
            .checks()
            .iter()
            .copied()
            .filter(|check| match check {
                CheckName::SourceBranchProtection => !is_fork,
                CheckName::ExecuteJob => is_fork,
                _ => true,
            })
            .collect()
    }

    async fn run_check(
        &self,
        check: CheckName,
        request: &JobRequest,
    ) -> Result<Report, ComplianceError> {
        let client = self.client.as_ref();
        let metadata = request.metadata();
        tracing::debug!(check = %check, repository = %metadata.repository_name, "running check");

        let outcome = match (check, request) {
            (CheckName::TargetBranchProtection, JobRequest::PullRequest(pull_request)) => {
                checks::target_branch_protection(client, pull_request).await
            }
            (CheckName::SourceBranchProtection, JobRequest::PullRequest(pull_request)) => {
                checks::source_branch_protection(client, pull_request).await
            }
            (CheckName::Collaborators, _) => checks::collaborators(client, metadata).await,
            (CheckName::ExecuteJob, _) => checks::execute_job(client, metadata).await,
            (CheckName::DisallowFork, _) => checks::disallow_fork(metadata).await,
            (check, _) => {
                return Err(ComplianceError::Input(format!(
                    "{check} does not apply to {} jobs",
                    request.job_type()
                )))
            }
        };

        let report = guard(check, outcome)?;
        if report.passed() {
            tracing::debug!(check = %check, "check passed");
        } else {
            tracing::info!(
                check = %check,
                result = %report.result(),
                reason = report.reason(),
                "check did not pass"
            );
        }
        Ok(report)
    }
}
