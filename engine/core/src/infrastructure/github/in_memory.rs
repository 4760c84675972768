// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-memory [`RepositoryClient`] for tests and local development.
//!
//! Repositories are seeded through builder methods. Unknown repositories and
//! branches answer `NotFound`, unknown users have `Permission::None`, and
//! individual operations can be made to fail with [`InMemoryRepositoryClient::failing`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::repository_client::{
    Affiliation, ClientError, Collaborator, Comment, Commit, Permission, ProtectionInfo,
    RepositoryClient, RepositoryInfo, Review,
};

#[derive(Debug, Clone, Default)]
struct RepositoryState {
    default_branch: String,
    /// Branch name to protection, `None` for unprotected branches.
    branches: HashMap<String, Option<ProtectionInfo>>,
    /// `(collaborator, outside)`
    collaborators: Vec<(Collaborator, bool)>,
    commits: HashMap<String, Vec<Commit>>,
    comments: HashMap<String, Vec<Comment>>,
    reviews: HashMap<u64, Vec<Review>>,
    code_owners: Vec<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryRepositoryClient {
    repositories: HashMap<String, RepositoryState>,
    failures: HashMap<&'static str, ClientError>,
    calls: AtomicUsize,
}

impl InMemoryRepositoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repository: &str, default_branch: &str) -> Self {
        self.state(repository).default_branch = default_branch.to_string();
        self
    }

    /// Add a branch; `None` leaves it unprotected.
    pub fn with_branch(
        mut self,
        repository: &str,
        branch: &str,
        protection: Option<ProtectionInfo>,
    ) -> Self {
        self.state(repository)
            .branches
            .insert(branch.to_string(), protection);
        self
    }

    pub fn with_collaborator(
        mut self,
        repository: &str,
        login: &str,
        permission: Permission,
        outside: bool,
    ) -> Self {
        let collaborator = Collaborator {
            login: login.to_string(),
            permission,
        };
        self.state(repository).collaborators.push((collaborator, outside));
        self
    }

    /// Commits reachable from `branch_or_sha`, newest first.
    pub fn with_commits(
        mut self,
        repository: &str,
        branch_or_sha: &str,
        commits: Vec<Commit>,
    ) -> Self {
        self.state(repository)
            .commits
            .insert(branch_or_sha.to_string(), commits);
        self
    }

    /// Append a comment to the pull request whose head is `commit_sha`.
    pub fn with_comment(
        mut self,
        repository: &str,
        commit_sha: &str,
        author: &str,
        body: &str,
    ) -> Self {
        self.state(repository)
            .comments
            .entry(commit_sha.to_string())
            .or_default()
            .push(Comment {
                author: author.to_string(),
                body: body.to_string(),
            });
        self
    }

    pub fn with_review(mut self, repository: &str, pr_number: u64, review: Review) -> Self {
        self.state(repository)
            .reviews
            .entry(pr_number)
            .or_default()
            .push(review);
        self
    }

    pub fn with_code_owner(mut self, repository: &str, login: &str) -> Self {
        self.state(repository).code_owners.push(login.to_string());
        self
    }

    /// Make every call of `operation` (a trait method name) return `error`.
    pub fn failing(mut self, operation: &'static str, error: ClientError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Number of trait calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn state(&mut self, repository: &str) -> &mut RepositoryState {
        self.repositories.entry(repository.to_string()).or_insert_with(|| RepositoryState {
            default_branch: "main".to_string(),
            ..Default::default()
        })
    }

    fn enter(
        &self,
        operation: &'static str,
        repository: &str,
    ) -> Result<&RepositoryState, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.get(operation) {
            return Err(error.clone());
        }
        self.repositories
            .get(repository)
            .ok_or_else(|| ClientError::NotFound(format!("repository {repository}")))
    }
}

#[async_trait]
impl RepositoryClient for InMemoryRepositoryClient {
    async fn get_repository(&self, repository: &str) -> Result<RepositoryInfo, ClientError> {
        let state = self.enter("get_repository", repository)?;
        Ok(RepositoryInfo {
            full_name: repository.to_string(),
            default_branch: state.default_branch.clone(),
        })
    }

    async fn get_branch_protection(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Option<ProtectionInfo>, ClientError> {
        let state = self.enter("get_branch_protection", repository)?;
        state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("branch {branch} of {repository}")))
    }

    async fn get_collaborators(
        &self,
        repository: &str,
        affiliation: Affiliation,
        min_permission: Permission,
    ) -> Result<Vec<Collaborator>, ClientError> {
        let state = self.enter("get_collaborators", repository)?;
        Ok(state
            .collaborators
            .iter()
            .filter(|(_, outside)| affiliation == Affiliation::All || *outside)
            .filter(|(collaborator, _)| collaborator.permission >= min_permission)
            .map(|(collaborator, _)| collaborator.clone())
            .collect())
    }

    async fn get_collaborator_permission(
        &self,
        repository: &str,
        login: &str,
    ) -> Result<Permission, ClientError> {
        let state = self.enter("get_collaborator_permission", repository)?;
        Ok(state
            .collaborators
            .iter()
            .find(|(collaborator, _)| collaborator.login.eq_ignore_ascii_case(login))
            .map(|(collaborator, _)| collaborator.permission)
            .unwrap_or(Permission::None))
    }

    async fn get_pull_request_reviews(
        &self,
        repository: &str,
        pr_number: u64,
    ) -> Result<Vec<Review>, ClientError> {
        let state = self.enter("get_pull_request_reviews", repository)?;
        state
            .reviews
            .get(&pr_number)
            .cloned()
            .ok_or_else(|| {
                ClientError::NotFound(format!("pull request #{pr_number} of {repository}"))
            })
    }

    async fn list_commits(
        &self,
        repository: &str,
        branch_or_sha: &str,
    ) -> Result<Vec<Commit>, ClientError> {
        let state = self.enter("list_commits", repository)?;
        state
            .commits
            .get(branch_or_sha)
            .cloned()
            .ok_or_else(|| {
                ClientError::NotFound(format!("commits of {branch_or_sha} in {repository}"))
            })
    }

    async fn list_comments(
        &self,
        repository: &str,
        commit_sha: &str,
    ) -> Result<Vec<Comment>, ClientError> {
        let state = self.enter("list_comments", repository)?;
        Ok(state.comments.get(commit_sha).cloned().unwrap_or_default())
    }

    async fn get_code_owners(&self, repository: &str) -> Result<Vec<String>, ClientError> {
        let state = self.enter("get_code_owners", repository)?;
        Ok(state.code_owners.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository_client::ReviewState;

    #[tokio::test]
    async fn test_unknown_repository_is_not_found() {
        let client = InMemoryRepositoryClient::new();
        let err = client.get_repository("canonical/missing").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_collaborator_filters() {
        let client = InMemoryRepositoryClient::new()
            .with_collaborator("canonical/repo", "maintainer", Permission::Admin, false)
            .with_collaborator("canonical/repo", "reader", Permission::Read, true)
            .with_collaborator("canonical/repo", "helper", Permission::Triage, true);

        let outside = client
            .get_collaborators("canonical/repo", Affiliation::Outside, Permission::Triage)
            .await
            .unwrap();
        assert_eq!(outside.len(), 1);
        assert_eq!(outside[0].login, "helper");

        let writers = client
            .get_collaborators("canonical/repo", Affiliation::All, Permission::Write)
            .await
            .unwrap();
        assert_eq!(writers.len(), 1);
        assert_eq!(writers[0].login, "maintainer");

        let stranger = client
            .get_collaborator_permission("canonical/repo", "stranger")
            .await
            .unwrap();
        assert_eq!(stranger, Permission::None);
    }

    #[tokio::test]
    async fn test_reviews_per_pull_request() {
        let client = InMemoryRepositoryClient::new().with_review(
            "canonical/repo",
            7,
            Review {
                author: "maintainer".into(),
                state: ReviewState::Approved,
                commit_sha: "abc123".into(),
                body: String::new(),
            },
        );

        let reviews = client.get_pull_request_reviews("canonical/repo", 7).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].state, ReviewState::Approved);

        let err = client.get_pull_request_reviews("canonical/repo", 8).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let client = InMemoryRepositoryClient::new()
            .with_repository("canonical/repo", "main")
            .failing("get_repository", ClientError::Transient("timeout".into()));
        assert!(client.get_repository("canonical/repo").await.unwrap_err().is_retryable());
        assert!(client.get_code_owners("canonical/repo").await.unwrap().is_empty());
    }
}
