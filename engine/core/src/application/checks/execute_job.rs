// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::authorization::{authorization_string, authorizes};
use crate::domain::job::JobMetadata;
use crate::domain::report::Report;
use crate::domain::repository_client::{ClientError, Comment, Permission, RepositoryClient};

/// Explanation appended to every execute_job failure.
pub const EXECUTE_JOB_MESSAGE: &str = concat!(
    "execution not authorized, a comment from a user with write permission or above on the ",
    "repository approving the workflow was not found on a PR from a fork, the comment should ",
    "include the string '/canonical/self-hosted-runners/run-workflows <commit SHA>' where the ",
    "commit SHA is the SHA of the latest commit on the branch"
);

/// Jobs for pull requests from external forks need an approval comment.
///
/// A fork is external unless its owner has `write` or above on the target
/// repository. The approval is a comment containing
/// `/canonical/self-hosted-runners/run-workflows <commit_sha>` outside any
/// quoted line, written by a user with `write` or above or by a code owner.
pub async fn execute_job(
    client: &dyn RepositoryClient,
    metadata: &JobMetadata,
) -> Result<Report, ClientError> {
    if !metadata.is_fork() {
        return Ok(Report::pass());
    }

    let repository_name = &metadata.repository_name;
    let branch_name = &metadata.branch_name;
    let commit_sha = &metadata.commit_sha;

    let fork_owner = metadata
        .source_repository()
        .split('/')
        .next()
        .unwrap_or_default();
    if client
        .get_collaborator_permission(repository_name, fork_owner)
        .await?
        >= Permission::Write
    {
        tracing::debug!(fork_owner, "fork owner can write to the repository");
        return Ok(Report::pass());
    }

    let comments = client.list_comments(repository_name, commit_sha).await?;
    if comments.is_empty() {
        return Ok(Report::fail(format!(
            "no comment found on PR - {EXECUTE_JOB_MESSAGE}, branch_name={branch_name:?}, \
             commit_sha={commit_sha:?}"
        )));
    }

    let authorization_comments: Vec<&Comment> = comments
        .iter()
        .rev()
        .filter(|comment| authorizes(&comment.body, commit_sha))
        .collect();
    if authorization_comments.is_empty() {
        return Ok(Report::fail(format!(
            "authorization comment not found on PR, expected: {} - {EXECUTE_JOB_MESSAGE}, \
             branch_name={branch_name:?}, commit_sha={commit_sha:?}",
            authorization_string(commit_sha)
        )));
    }

    let mut code_owners: Option<Vec<String>> = None;
    for comment in authorization_comments {
        let permission = client
            .get_collaborator_permission(repository_name, &comment.author)
            .await?;
        if permission >= Permission::Write {
            tracing::info!(author = %comment.author, %permission, "job authorized by comment");
            return Ok(Report::pass());
        }

        if code_owners.is_none() {
            code_owners = Some(client.get_code_owners(repository_name).await?);
        }
        let is_code_owner = code_owners
            .iter()
            .flatten()
            .any(|owner| owner.eq_ignore_ascii_case(&comment.author));
        if is_code_owner {
            tracing::info!(author = %comment.author, "job authorized by code owner comment");
            return Ok(Report::pass());
        }
    }

    Ok(Report::fail(format!(
        "authorization comment from a user who does not have write permission or above - \
         {EXECUTE_JOB_MESSAGE}, branch_name={branch_name:?}, commit_sha={commit_sha:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::report::CheckResult;
    use crate::infrastructure::github::InMemoryRepositoryClient;

    const REPO: &str = "canonical/repo";
    const FORK: &str = "contributor/repo";
    const SHA: &str = "abc123";

    fn fork_job() -> JobMetadata {
        JobMetadata::new(REPO, "feature", SHA).with_source_repository(FORK)
    }

    fn approval() -> String {
        format!("/canonical/self-hosted-runners/run-workflows {SHA}")
    }

    fn base() -> InMemoryRepositoryClient {
        InMemoryRepositoryClient::new()
            .with_repository(REPO, "main")
            .with_collaborator(REPO, "maintainer", Permission::Write, false)
            .with_collaborator(REPO, "reader", Permission::Read, true)
    }

    async fn run(client: InMemoryRepositoryClient) -> Report {
        execute_job(&client, &fork_job()).await.unwrap()
    }

    #[tokio::test]
    async fn test_same_repository_passes_without_calls() {
        let client = InMemoryRepositoryClient::new();
        let job = JobMetadata::new(REPO, "feature", SHA);
        assert!(execute_job(&client, &job).await.unwrap().passed());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fork_of_writer_is_not_external() {
        let client = base().with_collaborator(REPO, "contributor", Permission::Maintain, false);
        assert!(run(client).await.passed());
    }

    #[tokio::test]
    async fn test_no_comments() {
        let report = run(base()).await;
        assert_eq!(report.result(), CheckResult::Fail);
        assert!(report.reason().starts_with("no comment found on PR"));
    }

    #[tokio::test]
    async fn test_no_authorization_comment() {
        let client = base().with_comment(REPO, SHA, "maintainer", "looks good");
        let report = run(client).await;
        assert!(report.reason().starts_with("authorization comment not found"));
    }

    #[tokio::test]
    async fn test_quoted_authorization_is_ignored() {
        let client = base().with_comment(REPO, SHA, "maintainer", &format!("> {}", approval()));
        let report = run(client).await;
        assert!(report.reason().starts_with("authorization comment not found"));
    }

    #[tokio::test]
    async fn test_authorization_for_other_commit_is_ignored() {
        let client = base().with_comment(
            REPO,
            SHA,
            "maintainer",
            "/canonical/self-hosted-runners/run-workflows def456",
        );
        assert!(!run(client).await.passed());
    }

    #[tokio::test]
    async fn test_authorization_by_writer_passes() {
        let client = base()
            .with_comment(REPO, SHA, "reader", "please run")
            .with_comment(REPO, SHA, "maintainer", &format!("thanks!\n{}", approval()));
        assert!(run(client).await.passed());
    }

    #[tokio::test]
    async fn test_authorization_by_reader_fails() {
        let client = base().with_comment(REPO, SHA, "reader", &approval());
        let report = run(client).await;
        assert!(report
            .reason()
            .starts_with("authorization comment from a user who does not have write permission"));
    }

    #[tokio::test]
    async fn test_authorization_by_code_owner_passes() {
        let client = base()
            .with_code_owner(REPO, "Reader")
            .with_comment(REPO, SHA, "reader", &approval());
        assert!(run(client).await.passed());
    }
}
