// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Remote Repository Client (Anti-Corruption Layer)
//!
//! Capability interface over the repository hosting service. Checks receive a
//! `&dyn RepositoryClient` explicitly, so the GitHub adapter in
//! `crate::infrastructure::github` can be swapped for
//! `InMemoryRepositoryClient` in tests.
//!
//! All operations are read-only. Every failure is classified into a
//! [`ClientError`] so callers can tell a missing resource (a policy failure)
//! from a transient outage (retryable) from bad credentials (fatal).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Collaborator permission on a repository, ordered from least to most access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    None,
    Read,
    Triage,
    Write,
    Maintain,
    Admin,
}

impl Permission {
    /// Parse either the UI role name or the legacy REST name (`pull`/`push`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Some(Permission::None),
            "read" | "pull" => Some(Permission::Read),
            "triage" => Some(Permission::Triage),
            "write" | "push" => Some(Permission::Write),
            "maintain" => Some(Permission::Maintain),
            "admin" => Some(Permission::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::None => "none",
            Permission::Read => "read",
            Permission::Triage => "triage",
            Permission::Write => "write",
            Permission::Maintain => "maintain",
            Permission::Admin => "admin",
        }
    }

    /// Name used by the collaborators listing filter.
    pub fn api_filter(&self) -> &'static str {
        match self {
            Permission::None | Permission::Read => "pull",
            Permission::Triage => "triage",
            Permission::Write => "push",
            Permission::Maintain => "maintain",
            Permission::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship of a collaborator to the repository's organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affiliation {
    /// Not a member of the owning organization.
    Outside,
    All,
}

impl Affiliation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Affiliation::Outside => "outside",
            Affiliation::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub full_name: String,
    pub default_branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassAllowances {
    pub users: Vec<String>,
    pub teams: Vec<String>,
    pub apps: Vec<String>,
}

impl BypassAllowances {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.teams.is_empty() && self.apps.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredReviews {
    pub require_code_owner_reviews: bool,
    pub dismiss_stale_reviews: bool,
    pub bypass_allowances: BypassAllowances,
}

/// Protection rules of a protected branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionInfo {
    pub required_signatures: bool,
    /// `None` when pull request reviews are not required.
    pub required_reviews: Option<RequiredReviews>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub login: String,
    pub permission: Permission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub state: ReviewState,
    pub commit_sha: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    /// Signature verified by the hosting service, not merely present.
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl ClientError {
    /// Whether retrying the same idempotent read could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::RateLimited(_) | ClientError::Transient(_))
    }
}

/// Read-only view of the repository hosting service.
///
/// Repository names are `owner/name`. Sequences keep the order the service
/// returns them in (comments oldest first, commits newest first).
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    async fn get_repository(&self, repository: &str) -> Result<RepositoryInfo, ClientError>;

    /// `Ok(None)` when the branch exists but is not protected.
    async fn get_branch_protection(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Option<ProtectionInfo>, ClientError>;

    /// Collaborators with at least `min_permission`.
    async fn get_collaborators(
        &self,
        repository: &str,
        affiliation: Affiliation,
        min_permission: Permission,
    ) -> Result<Vec<Collaborator>, ClientError>;

    /// Current permission of any user; `Permission::None` for strangers.
    async fn get_collaborator_permission(
        &self,
        repository: &str,
        login: &str,
    ) -> Result<Permission, ClientError>;

    async fn get_pull_request_reviews(
        &self,
        repository: &str,
        pr_number: u64,
    ) -> Result<Vec<Review>, ClientError>;

    async fn list_commits(
        &self,
        repository: &str,
        branch_or_sha: &str,
    ) -> Result<Vec<Commit>, ClientError>;

    /// Comments on the open pull requests whose head is `commit_sha`.
    async fn list_comments(
        &self,
        repository: &str,
        commit_sha: &str,
    ) -> Result<Vec<Comment>, ClientError>;

    /// Individual users named in the repository's CODEOWNERS file.
    async fn get_code_owners(&self, repository: &str) -> Result<Vec<String>, ClientError>;
}
