// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::job::PullRequestMetadata;
use crate::domain::report::Report;
use crate::domain::repository_client::{ClientError, RepositoryClient};

/// The branch a pull request merges into must be protected and unbypassable.
///
/// Pull requests between two branches of the same repository that do not
/// target the default branch only need protection without bypass allowances.
pub async fn target_branch_protection(
    client: &dyn RepositoryClient,
    metadata: &PullRequestMetadata,
) -> Result<Report, ClientError> {
    let repository_name = &metadata.job.repository_name;
    let branch_name = &metadata.target_branch_name;

    let Some(protection) = client
        .get_branch_protection(repository_name, branch_name)
        .await?
    else {
        return Ok(Report::fail(format!(
            "branch protection not enabled, branch_name={branch_name:?}"
        )));
    };

    let relaxed = if metadata.job.is_fork() {
        false
    } else {
        let repository = client.get_repository(repository_name).await?;
        *branch_name != repository.default_branch
    };

    let reviews = match (&protection.required_reviews, relaxed) {
        (Some(reviews), _) => reviews,
        (None, true) => return Ok(Report::pass()),
        (None, false) => {
            return Ok(Report::fail(format!(
                "pull request reviews are not required, branch_name={branch_name:?}"
            )))
        }
    };

    if !relaxed {
        if !reviews.require_code_owner_reviews {
            return Ok(Report::fail(format!(
                "codeowner pull request reviews are not required, branch_name={branch_name:?}"
            )));
        }
        if !reviews.dismiss_stale_reviews {
            return Ok(Report::fail(format!(
                "stale reviews are not dismissed, branch_name={branch_name:?}"
            )));
        }
    }

    if !reviews.bypass_allowances.is_empty() {
        return Ok(Report::fail(format!(
            "pull request reviews can be bypassed, branch_name={branch_name:?}"
        )));
    }

    if !relaxed && !protection.required_signatures {
        return Ok(Report::fail(format!(
            "signed commits not required, branch_name={branch_name:?}"
        )));
    }

    Ok(Report::pass())
}
