// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Check Catalogue
//!
//! One async function per named check. Each takes the job metadata and a
//! `&dyn RepositoryClient` and returns `Result<Report, ClientError>`; the
//! orchestrator passes every outcome through [`guard`].
//!
//! | Check | Applies to | Passes when |
//! |-------|------------|-------------|
//! | [`target_branch_protection`] | pull requests | target branch fully protected |
//! | [`source_branch_protection`] | pull requests from the same repository | source branch protected and signed |
//! | [`collaborators`] | every job | no outside collaborator above `read` |
//! | [`execute_job`] | pull requests from forks | a maintainer approved the commit |
//! | [`disallow_fork`] | pull requests | source is the target repository |

mod collaborators;
mod disallow_fork;
mod execute_job;
mod source_branch;
mod target_branch;

pub use collaborators::collaborators;
pub use disallow_fork::disallow_fork;
pub use execute_job::{execute_job, EXECUTE_JOB_MESSAGE};
pub use source_branch::source_branch_protection;
pub use target_branch::target_branch_protection;

use crate::domain::errors::ComplianceError;
use crate::domain::job::CheckName;
use crate::domain::report::Report;
use crate::domain::repository_client::ClientError;

/// Convert a check outcome into a report.
///
/// Missing resources fail the check, outages and unexpected responses make it
/// error, and rejected credentials abort the whole evaluation.
pub fn guard(
    check: CheckName,
    outcome: Result<Report, ClientError>,
) -> Result<Report, ComplianceError> {
    match outcome {
        Ok(report) => Ok(report),
        Err(ClientError::NotFound(resource)) => {
            Ok(Report::fail(format!("{check} failed, not found: {resource}")))
        }
        Err(
            err @ (ClientError::RateLimited(_)
            | ClientError::Transient(_)
            | ClientError::Unexpected(_)),
        ) => {
            tracing::warn!(check = %check, error = %err, "check could not reach GitHub");
            Ok(Report::error(format!(
                "Something went wrong while running {check}, {err}"
            )))
        }
        Err(ClientError::Authentication(message)) => {
            tracing::error!(check = %check, "GitHub rejected the configured credentials");
            Err(ComplianceError::Configuration(format!(
                "GitHub authentication failed: {message}"
            )))
        }
    }
}
