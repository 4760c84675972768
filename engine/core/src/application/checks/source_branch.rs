// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::HashSet;

use crate::domain::job::PullRequestMetadata;
use crate::domain::report::Report;
use crate::domain::repository_client::{ClientError, RepositoryClient};

/// A branch of the target repository must be protected, require signed
/// commits, and every commit it adds over the target branch must be verified.
///
/// Branches of forks are outside the repository's control and pass here;
/// `execute_job` covers them.
pub async fn source_branch_protection(
    client: &dyn RepositoryClient,
    metadata: &PullRequestMetadata,
) -> Result<Report, ClientError> {
    let job = &metadata.job;
    if job.is_fork() {
        tracing::debug!(
            source = job.source_repository(),
            "source is a fork, skipping branch protection"
        );
        return Ok(Report::pass());
    }

    let branch_name = &job.branch_name;
    let Some(protection) = client
        .get_branch_protection(job.source_repository(), branch_name)
        .await?
    else {
        return Ok(Report::fail(format!(
            "branch protection not enabled, branch_name={branch_name:?}"
        )));
    };

    if !protection.required_signatures {
        return Ok(Report::fail(format!(
            "signed commits not required, branch_name={branch_name:?}"
        )));
    }

    let target_commits: HashSet<String> = client
        .list_commits(&job.repository_name, &metadata.target_branch_name)
        .await?
        .into_iter()
        .map(|commit| commit.sha)
        .collect();

    let unsigned = client
        .list_commits(job.source_repository(), branch_name)
        .await?
        .into_iter()
        .filter(|commit| !target_commits.contains(&commit.sha))
        .find(|commit| !commit.verified);

    if let Some(commit) = unsigned {
        return Ok(Report::fail(format!(
            "commit is not signed, branch_name={branch_name:?}, commit_sha={:?}",
            commit.sha
        )));
    }

    Ok(Report::pass())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobMetadata;
    use crate::domain::report::CheckResult;
    use crate::domain::repository_client::{Commit, ProtectionInfo};
    use crate::infrastructure::github::InMemoryRepositoryClient;

    const REPO: &str = "canonical/repo";

    fn commit(sha: &str, verified: bool) -> Commit {
        Commit {
            sha: sha.to_string(),
            verified,
        }
    }

    fn signed() -> Option<ProtectionInfo> {
        Some(ProtectionInfo {
            required_signatures: true,
            required_reviews: None,
        })
    }

    fn pull_request() -> PullRequestMetadata {
        PullRequestMetadata {
            job: JobMetadata::new(REPO, "feature", "c3"),
            target_branch_name: "main".to_string(),
        }
    }

    fn client(
        protection: Option<ProtectionInfo>,
        feature: Vec<Commit>,
    ) -> InMemoryRepositoryClient {
        InMemoryRepositoryClient::new()
            .with_branch(REPO, "feature", protection)
            .with_commits(REPO, "main", vec![commit("c1", false)])
            .with_commits(REPO, "feature", feature)
    }

    #[tokio::test]
    async fn test_signed_branch_passes() {
        // c1 is shared with main, so its missing signature is not this branch's concern.
        let client = client(
            signed(),
            vec![commit("c3", true), commit("c2", true), commit("c1", false)],
        );
        assert!(source_branch_protection(&client, &pull_request()).await.unwrap().passed());
    }

    #[tokio::test]
    async fn test_unsigned_new_commit_fails() {
        let client = client(
            signed(),
            vec![commit("c3", true), commit("c2", false), commit("c1", false)],
        );
        let report = source_branch_protection(&client, &pull_request()).await.unwrap();
        assert_eq!(report.result(), CheckResult::Fail);
        assert!(report.reason().contains("commit is not signed"));
        assert!(report.reason().contains("c2"));
    }

    #[tokio::test]
    async fn test_protection_rules() {
        let unprotected = client(None, vec![commit("c3", true)]);
        let report = source_branch_protection(&unprotected, &pull_request()).await.unwrap();
        assert!(report.reason().contains("branch protection not enabled"));

        let unsigned_rule = client(
            Some(ProtectionInfo {
                required_signatures: false,
                required_reviews: None,
            }),
            vec![commit("c3", true)],
        );
        let report = source_branch_protection(&unsigned_rule, &pull_request()).await.unwrap();
        assert!(report.reason().contains("signed commits not required"));
    }

    #[tokio::test]
    async fn test_fork_is_not_inspected() {
        let client = InMemoryRepositoryClient::new();
        let mut metadata = pull_request();
        metadata.job = metadata.job.with_source_repository("someone/repo");
        assert!(source_branch_protection(&client, &metadata).await.unwrap().passed());
        assert_eq!(client.call_count(), 0);
    }
}
