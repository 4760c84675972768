// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Job Metadata
//!
//! Identifies the unit under check: which repository, branch and commit a
//! self-hosted runner has been asked to execute, and which GitHub event
//! triggered it.
//!
//! [`JobRequest`] is a closed enum so that the job type and the metadata it
//! carries can never disagree (a pull request always knows its target branch).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::ComplianceError;

/// The GitHub event category that triggered the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    PullRequest,
    WorkflowDispatch,
    Push,
    Schedule,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::PullRequest,
        JobType::WorkflowDispatch,
        JobType::Push,
        JobType::Schedule,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::PullRequest => "pull_request",
            JobType::WorkflowDispatch => "workflow_dispatch",
            JobType::Push => "push",
            JobType::Schedule => "schedule",
        }
    }

    /// Check vocabulary for the job type, in catalogue order.
    pub fn checks(&self) -> &'static [CheckName] {
        match self {
            JobType::PullRequest => &PULL_REQUEST_CHECKS,
            JobType::WorkflowDispatch | JobType::Push | JobType::Schedule => &BRANCH_JOB_CHECKS,
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = ComplianceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|job_type| job_type.as_str() == s)
            .ok_or_else(|| ComplianceError::Input(format!("unknown job type {s:?}")))
    }
}

/// Name of an individual compliance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    TargetBranchProtection,
    SourceBranchProtection,
    Collaborators,
    ExecuteJob,
    DisallowFork,
}

impl CheckName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::TargetBranchProtection => "target_branch_protection",
            CheckName::SourceBranchProtection => "source_branch_protection",
            CheckName::Collaborators => "collaborators",
            CheckName::ExecuteJob => "execute_job",
            CheckName::DisallowFork => "disallow_fork",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const PULL_REQUEST_CHECKS: [CheckName; 5] = [
    CheckName::TargetBranchProtection,
    CheckName::SourceBranchProtection,
    CheckName::Collaborators,
    CheckName::ExecuteJob,
    CheckName::DisallowFork,
];

const BRANCH_JOB_CHECKS: [CheckName; 1] = [CheckName::Collaborators];

/// Repository, branch and commit a job runs against.
///
/// `source_repository_name` is the repository holding the branch; `None`
/// means the job runs on the target repository itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub repository_name: String,
    pub branch_name: String,
    pub commit_sha: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_repository_name: Option<String>,
}

impl JobMetadata {
    pub fn new(
        repository_name: impl Into<String>,
        branch_name: impl Into<String>,
        commit_sha: impl Into<String>,
    ) -> Self {
        Self {
            repository_name: repository_name.into(),
            branch_name: branch_name.into(),
            commit_sha: commit_sha.into(),
            source_repository_name: None,
        }
    }

    pub fn with_source_repository(mut self, source_repository_name: impl Into<String>) -> Self {
        self.source_repository_name = Some(source_repository_name.into());
        self
    }

    pub fn source_repository(&self) -> &str {
        self.source_repository_name
            .as_deref()
            .unwrap_or(&self.repository_name)
    }

    /// Whether the branch lives in a repository other than the target.
    pub fn is_fork(&self) -> bool {
        self.source_repository() != self.repository_name
    }

    fn validate(&self) -> Result<(), ComplianceError> {
        let mut empty = Vec::new();
        if self.repository_name.trim().is_empty() {
            empty.push("repository_name");
        }
        if self.branch_name.trim().is_empty() {
            empty.push("branch_name");
        }
        if self.commit_sha.trim().is_empty() {
            empty.push("commit_sha");
        }
        if matches!(&self.source_repository_name, Some(name) if name.trim().is_empty()) {
            empty.push("source_repository_name");
        }
        if !empty.is_empty() {
            return Err(ComplianceError::Input(format!(
                "empty values are not allowed, fields: {}",
                empty.join(", ")
            )));
        }
        if !self.repository_name.contains('/') || !self.source_repository().contains('/') {
            return Err(ComplianceError::Input(format!(
                "repository names must be in owner/name form, got {:?} and {:?}",
                self.repository_name,
                self.source_repository()
            )));
        }
        Ok(())
    }
}

/// Metadata for a pull request job. `job.branch_name` is the source branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestMetadata {
    #[serde(flatten)]
    pub job: JobMetadata,
    pub target_branch_name: String,
}

/// A single compliance evaluation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    PullRequest(PullRequestMetadata),
    WorkflowDispatch(JobMetadata),
    Push(JobMetadata),
    Schedule(JobMetadata),
}

impl JobRequest {
    /// Build a request for a branch job type.
    ///
    /// Pull requests need a target branch and must be built directly.
    pub fn branch_job(job_type: JobType, metadata: JobMetadata) -> Result<Self, ComplianceError> {
        match job_type {
            JobType::WorkflowDispatch => Ok(JobRequest::WorkflowDispatch(metadata)),
            JobType::Push => Ok(JobRequest::Push(metadata)),
            JobType::Schedule => Ok(JobRequest::Schedule(metadata)),
            JobType::PullRequest => Err(ComplianceError::Input(
                "pull request jobs require a target branch".to_string(),
            )),
        }
    }

    pub fn job_type(&self) -> JobType {
        match self {
            JobRequest::PullRequest(_) => JobType::PullRequest,
            JobRequest::WorkflowDispatch(_) => JobType::WorkflowDispatch,
            JobRequest::Push(_) => JobType::Push,
            JobRequest::Schedule(_) => JobType::Schedule,
        }
    }

    pub fn metadata(&self) -> &JobMetadata {
        match self {
            JobRequest::PullRequest(pull_request) => &pull_request.job,
            JobRequest::WorkflowDispatch(metadata)
            | JobRequest::Push(metadata)
            | JobRequest::Schedule(metadata) => metadata,
        }
    }

    /// Structural validation, run before any remote call.
    pub fn validate(&self) -> Result<(), ComplianceError> {
        self.metadata().validate()?;
        if let JobRequest::PullRequest(pull_request) = self {
            if pull_request.target_branch_name.trim().is_empty() {
                return Err(ComplianceError::Input(
                    "empty values are not allowed, fields: target_branch_name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_repository_defaults_to_target() {
        let metadata = JobMetadata::new("canonical/repo", "main", "abc123");
        assert_eq!(metadata.source_repository(), "canonical/repo");
        assert!(!metadata.is_fork());

        let fork = metadata.with_source_repository("someone/repo");
        assert!(fork.is_fork());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let request = JobRequest::Push(JobMetadata::new("canonical/repo", " ", ""));
        let err = request.validate().unwrap_err();
        let ComplianceError::Input(msg) = &err else {
            panic!("expected an input error, got {err:?}");
        };
        assert!(msg.contains("branch_name") && msg.contains("commit_sha"));
    }

    #[test]
    fn test_validate_rejects_empty_target_branch() {
        let request = JobRequest::PullRequest(PullRequestMetadata {
            job: JobMetadata::new("canonical/repo", "feature", "abc123"),
            target_branch_name: String::new(),
        });
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unqualified_repository() {
        let request = JobRequest::Schedule(JobMetadata::new("repo", "main", "abc123"));
        assert!(matches!(request.validate(), Err(ComplianceError::Input(_))));
    }

    #[test]
    fn test_branch_job_refuses_pull_request() {
        let metadata = JobMetadata::new("canonical/repo", "main", "abc123");
        assert!(JobRequest::branch_job(JobType::PullRequest, metadata.clone()).is_err());
        assert_eq!(
            JobRequest::branch_job(JobType::Push, metadata).unwrap().job_type(),
            JobType::Push
        );
    }

    #[test]
    fn test_job_type_vocabulary() {
        assert_eq!(JobType::PullRequest.checks().len(), 5);
        assert_eq!(JobType::Schedule.checks(), &[CheckName::Collaborators]);
        assert_eq!("workflow_dispatch".parse::<JobType>().unwrap(), JobType::WorkflowDispatch);
        assert!("merge_group".parse::<JobType>().is_err());
    }
}
