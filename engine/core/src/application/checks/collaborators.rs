// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::job::JobMetadata;
use crate::domain::report::Report;
use crate::domain::repository_client::{Affiliation, ClientError, Permission, RepositoryClient};

/// No outside collaborator may hold more than `read` on the repository.
pub async fn collaborators(
    client: &dyn RepositoryClient,
    metadata: &JobMetadata,
) -> Result<Report, ClientError> {
    let outside = client
        .get_collaborators(&metadata.repository_name, Affiliation::Outside, Permission::Triage)
        .await?;

    let higher_permission_logins: Vec<&str> = outside
        .iter()
        .filter(|collaborator| collaborator.permission > Permission::Read)
        .map(|collaborator| collaborator.login.as_str())
        .collect();

    if higher_permission_logins.is_empty() {
        return Ok(Report::pass());
    }

    Ok(Report::fail(format!(
        "the repository includes outside collaborators with higher permissions than read, \
         higher_permission_logins={higher_permission_logins:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::CheckResult;
    use crate::infrastructure::github::InMemoryRepositoryClient;

    const REPO: &str = "canonical/repo";

    fn metadata() -> JobMetadata {
        JobMetadata::new(REPO, "main", "abc123")
    }

    #[tokio::test]
    async fn test_read_only_outside_collaborators_pass() {
        let client = InMemoryRepositoryClient::new()
            .with_collaborator(REPO, "a", Permission::Read, true)
            .with_collaborator(REPO, "member", Permission::Admin, false);
        assert!(collaborators(&client, &metadata()).await.unwrap().passed());
    }

    #[tokio::test]
    async fn test_fail_names_offending_logins() {
        let client = InMemoryRepositoryClient::new()
            .with_collaborator(REPO, "a", Permission::Read, true)
            .with_collaborator(REPO, "b", Permission::Write, true);

        let report = collaborators(&client, &metadata()).await.unwrap();
        assert_eq!(report.result(), CheckResult::Fail);
        assert!(report.reason().contains("\"b\""));
        assert!(!report.reason().contains("\"a\""));
    }

    #[tokio::test]
    async fn test_every_offender_is_named() {
        let client = InMemoryRepositoryClient::new()
            .with_collaborator(REPO, "triager", Permission::Triage, true)
            .with_collaborator(REPO, "owner", Permission::Admin, true);
        let report = collaborators(&client, &metadata()).await.unwrap();
        assert!(report.reason().contains("triager"));
        assert!(report.reason().contains("owner"));
    }
}
