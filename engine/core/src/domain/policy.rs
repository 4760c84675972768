// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Policy Document
//!
//! Enables or disables individual checks per job type:
//!
//! ```yaml
//! pull_request:
//!   execute_job:
//!     enabled: false
//! push:
//!   collaborators:
//!     enabled: true
//! ```
//!
//! Raw documents are validated against the closed schema in
//! `policy_schema.yaml` and then parsed into [`PolicyDocument`]. A check that a
//! document does not mention is enabled.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

use super::errors::ComplianceError;
use super::job::{CheckName, JobType};
use super::report::Report;

const POLICY_SCHEMA_YAML: &str = include_str!("policy_schema.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PullRequestPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_branch_protection: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_branch_protection: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_job: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disallow_fork: Option<Rule>,
}

impl PullRequestPolicy {
    fn rule_mut(&mut self, check: CheckName) -> &mut Option<Rule> {
        match check {
            CheckName::TargetBranchProtection => &mut self.target_branch_protection,
            CheckName::SourceBranchProtection => &mut self.source_branch_protection,
            CheckName::Collaborators => &mut self.collaborators,
            CheckName::ExecuteJob => &mut self.execute_job,
            CheckName::DisallowFork => &mut self.disallow_fork,
        }
    }

    fn rule(&self, check: CheckName) -> Option<Rule> {
        match check {
            CheckName::TargetBranchProtection => self.target_branch_protection,
            CheckName::SourceBranchProtection => self.source_branch_protection,
            CheckName::Collaborators => self.collaborators,
            CheckName::ExecuteJob => self.execute_job,
            CheckName::DisallowFork => self.disallow_fork,
        }
    }
}

/// Rules for `workflow_dispatch`, `push` and `schedule` jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchJobPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Rule>,
}

/// Parsed, schema-valid policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_dispatch: Option<BranchJobPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<BranchJobPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<BranchJobPolicy>,
}

impl PolicyDocument {
    /// Validate against the schema, then parse into the typed structure.
    pub fn parse(document: &Value) -> Result<Self, ComplianceError> {
        let report = check(document);
        if !report.passed() {
            return Err(ComplianceError::Configuration(report.reason().to_string()));
        }
        serde_json::from_value(document.clone()).map_err(|e| {
            ComplianceError::Configuration(format!("invalid policy document, {e}"))
        })
    }

    /// Whether `check` should run for `job_type`.
    ///
    /// Absent entries are enabled. Checks outside the job type's vocabulary
    /// are never enabled.
    pub fn enabled(&self, job_type: JobType, check: CheckName) -> bool {
        if !job_type.checks().contains(&check) {
            return false;
        }
        self.rule(job_type, check).map_or(true, |rule| rule.enabled)
    }

    fn rule(&self, job_type: JobType, check: CheckName) -> Option<Rule> {
        match job_type {
            JobType::PullRequest => self.pull_request.as_ref()?.rule(check),
            JobType::WorkflowDispatch => self.workflow_dispatch.as_ref()?.collaborators,
            JobType::Push => self.push.as_ref()?.collaborators,
            JobType::Schedule => self.schedule.as_ref()?.collaborators,
        }
    }

    /// Set a rule. Returns `false`, leaving the document untouched, when the
    /// check is not part of the job type's vocabulary.
    pub fn set(&mut self, job_type: JobType, check: CheckName, enabled: bool) -> bool {
        if !job_type.checks().contains(&check) {
            return false;
        }
        let rule = Some(Rule { enabled });
        match job_type {
            JobType::PullRequest => {
                *self
                    .pull_request
                    .get_or_insert_with(PullRequestPolicy::default)
                    .rule_mut(check) = rule;
            }
            JobType::WorkflowDispatch => {
                self.workflow_dispatch
                    .get_or_insert_with(BranchJobPolicy::default)
                    .collaborators = rule;
            }
            JobType::Push => {
                self.push.get_or_insert_with(BranchJobPolicy::default).collaborators = rule;
            }
            JobType::Schedule => {
                self.schedule
                    .get_or_insert_with(BranchJobPolicy::default)
                    .collaborators = rule;
            }
        }
        true
    }

    /// Builder form of [`PolicyDocument::set`].
    pub fn with(mut self, job_type: JobType, check: CheckName, enabled: bool) -> Self {
        self.set(job_type, check, enabled);
        self
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }
}

/// Policy used when no document has been supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsedPolicy {
    /// Every check is enabled.
    All,
    /// Every check except `disallow_fork` is enabled.
    AllowForks,
}

impl UsedPolicy {
    pub fn from_disallow_forks(disallow_forks: bool) -> Self {
        if disallow_forks {
            UsedPolicy::All
        } else {
            UsedPolicy::AllowForks
        }
    }

    pub fn document(&self) -> PolicyDocument {
        match self {
            UsedPolicy::All => PolicyDocument::default(),
            UsedPolicy::AllowForks => PolicyDocument::default().with(
                JobType::PullRequest,
                CheckName::DisallowFork,
                false,
            ),
        }
    }
}

/// Read a YAML (or JSON) document into an unvalidated value.
///
/// An empty or null document is an empty mapping.
pub fn value_from_yaml_str(content: &str) -> Result<Value, ComplianceError> {
    if content.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_yaml::from_str(content).map_err(|e| {
        ComplianceError::Configuration(format!("policy document is not valid YAML/JSON, {e}"))
    })?;
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        value => value,
    })
}

/// The closed schema as JSON.
pub fn schema() -> Result<Value, ComplianceError> {
    serde_yaml::from_str(POLICY_SCHEMA_YAML).map_err(|e| {
        ComplianceError::Configuration(format!("embedded policy schema is invalid, {e}"))
    })
}

fn validator() -> Result<&'static jsonschema::Validator, String> {
    static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema = schema().map_err(|e| e.to_string())?;
            jsonschema::validator_for(&schema).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Check that a raw policy document is valid.
///
/// Fails with every schema violation listed in the reason.
pub fn check(document: &Value) -> Report {
    let validator = match validator() {
        Ok(validator) => validator,
        Err(e) => return Report::error(format!("policy schema could not be loaded, {e}")),
    };

    let violations: Vec<String> = validator
        .iter_errors(document)
        .map(|error| error.to_string())
        .collect();

    if violations.is_empty() {
        Report::pass()
    } else {
        Report::fail(format!("invalid policy document, {}", violations.join("; ")))
    }
}
