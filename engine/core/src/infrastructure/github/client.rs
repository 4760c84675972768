// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// GitHub REST Adapter
//
// Anti-Corruption Layer for the GitHub REST API v3.
// Translates GitHub payloads into domain types and HTTP failures into
// classified `ClientError`s. Response bodies never leak into error messages.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, LINK, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::code_owners::{parse_code_owners, CODE_OWNERS_PATHS};
use crate::domain::errors::ComplianceError;
use crate::domain::repository_client::{
    Affiliation, BypassAllowances, ClientError, Collaborator, Comment, Commit, Permission,
    ProtectionInfo, RepositoryClient, RepositoryInfo, RequiredReviews, Review, ReviewState,
};
use crate::domain::service_config::GitHubConfig;

const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw+json";
const API_VERSION: &str = "2022-11-28";
const PER_PAGE: u32 = 100;
/// Listings longer than this are an error rather than silently cut short.
const DEFAULT_PAGE_LIMIT: usize = 1000;

pub struct GitHubClient {
    client: reqwest::Client,
    api_url: Url,
    token: String,
    max_retries: u32,
    retry_delay: Duration,
    page_limit: usize,
}

#[derive(Deserialize)]
struct RepositoryResponse {
    full_name: String,
    default_branch: String,
}

#[derive(Deserialize)]
struct BranchResponse {
    #[serde(default)]
    protected: bool,
}

#[derive(Deserialize)]
struct EnabledSetting {
    #[serde(default)]
    enabled: bool,
}

#[derive(Deserialize)]
struct UserRef {
    login: String,
}

#[derive(Deserialize)]
struct SlugRef {
    slug: String,
}

#[derive(Deserialize, Default)]
struct BypassResponse {
    #[serde(default)]
    users: Vec<UserRef>,
    #[serde(default)]
    teams: Vec<SlugRef>,
    #[serde(default)]
    apps: Vec<SlugRef>,
}

#[derive(Deserialize)]
struct RequiredReviewsResponse {
    #[serde(default)]
    require_code_owner_reviews: bool,
    #[serde(default)]
    dismiss_stale_reviews: bool,
    #[serde(default)]
    bypass_pull_request_allowances: Option<BypassResponse>,
}

#[derive(Deserialize)]
struct ProtectionResponse {
    #[serde(default)]
    required_signatures: Option<EnabledSetting>,
    #[serde(default)]
    required_pull_request_reviews: Option<RequiredReviewsResponse>,
}

#[derive(Deserialize, Default)]
struct PermissionFlags {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    maintain: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    triage: bool,
    #[serde(default)]
    pull: bool,
}

impl PermissionFlags {
    fn highest(&self) -> Permission {
        if self.admin {
            Permission::Admin
        } else if self.maintain {
            Permission::Maintain
        } else if self.push {
            Permission::Write
        } else if self.triage {
            Permission::Triage
        } else if self.pull {
            Permission::Read
        } else {
            Permission::None
        }
    }
}

#[derive(Deserialize)]
struct CollaboratorResponse {
    login: String,
    #[serde(default)]
    role_name: Option<String>,
    #[serde(default)]
    permissions: Option<PermissionFlags>,
}

impl CollaboratorResponse {
    // Custom roles have names outside the built-in set; fall back to the flags.
    fn permission(&self) -> Permission {
        self.role_name
            .as_deref()
            .and_then(Permission::parse)
            .unwrap_or_else(|| {
                self.permissions
                    .as_ref()
                    .map(PermissionFlags::highest)
                    .unwrap_or(Permission::None)
            })
    }
}

#[derive(Deserialize)]
struct PermissionResponse {
    permission: String,
    #[serde(default)]
    role_name: Option<String>,
}

#[derive(Deserialize)]
struct ReviewResponse {
    #[serde(default)]
    user: Option<UserRef>,
    state: ReviewState,
    #[serde(default)]
    commit_id: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Deserialize)]
struct Verification {
    #[serde(default)]
    verified: bool,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    verification: Option<Verification>,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct PullHead {
    sha: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    head: PullHead,
}

#[derive(Deserialize)]
struct CommentResponse {
    #[serde(default)]
    user: Option<UserRef>,
    #[serde(default)]
    body: Option<String>,
}

/// Login GitHub shows for deleted accounts.
const GHOST_LOGIN: &str = "ghost";

impl GitHubClient {
    pub fn new(
        api_url: impl AsRef<str>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let api_url = Url::parse(api_url.as_ref())
            .map_err(|e| ClientError::Unexpected(format!("invalid GitHub API URL, {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(ClientError::Unexpected(format!(
                "invalid GitHub API URL, {api_url} cannot carry a path"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("policy-compliance/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Unexpected(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url,
            token: token.into(),
            max_retries: 0,
            retry_delay: Duration::ZERO,
            page_limit: DEFAULT_PAGE_LIMIT,
        })
    }

    pub fn from_config(config: &GitHubConfig) -> Result<Self, ComplianceError> {
        let token = config
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ComplianceError::Configuration("no GitHub token configured".into()))?;

        let client = Self::new(
            config.api_url.as_str(),
            token,
            Duration::from_secs(config.timeout_seconds),
        )
        .map_err(|e| ComplianceError::Configuration(e.to_string()))?;

        Ok(client.with_retry(config.max_retries, Duration::from_millis(config.retry_delay_ms)))
    }

    /// Retry transient failures up to `max_retries` extra times.
    pub fn with_retry(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Fail listings that still have a next page after `page_limit` pages.
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.max(1);
        self
    }

    /// `/repos/{owner}/{name}/{segments...}`, every segment percent-encoded.
    ///
    /// Branch names may contain `#`, `?` or `%`; none of them may end the path.
    fn repo_url(&self, repository: &str, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::Unexpected(format!("{} cannot carry a path", self.api_url))
            })?
            .pop_if_empty()
            .push("repos")
            .extend(repository.split('/'))
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        url: &Url,
        query: &[(&str, String)],
        accept: &str,
        resource: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let mut attempt = 0;
        loop {
            match self.send_once(url, query, accept, resource).await {
                Err(ClientError::Transient(reason)) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        resource,
                        attempt,
                        max_retries = self.max_retries,
                        %reason,
                        "Transient GitHub failure, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once(
        &self,
        url: &Url,
        query: &[(&str, String)],
        accept: &str,
        resource: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let response = self
            .client
            .get(url.clone())
            .query(query)
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(|e| {
                ClientError::Transient(format!(
                    "request for {resource} failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(classify(status, response.headers(), resource))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
        resource: &str,
    ) -> Result<T, ClientError> {
        let response = self.send(&url, query, JSON_MEDIA_TYPE, resource).await?;
        decode(response, resource).await
    }

    async fn get_paginated<T: DeserializeOwned>(
        &self,
        mut url: Url,
        mut query: Vec<(&str, String)>,
        resource: &str,
    ) -> Result<Vec<T>, ClientError> {
        query.push(("per_page", PER_PAGE.to_string()));
        let mut items = Vec::new();
        let mut pages = 0;

        loop {
            let response = self.send(&url, &query, JSON_MEDIA_TYPE, resource).await?;
            let next = next_link(response.headers());
            let page: Vec<T> = decode(response, resource).await?;
            items.extend(page);
            pages += 1;

            let Some(next) = next else {
                return Ok(items);
            };
            if pages >= self.page_limit {
                return Err(ClientError::Unexpected(format!(
                    "{resource} spans more than {} pages of {PER_PAGE}",
                    self.page_limit
                )));
            }
            // The next link already carries every query parameter.
            url = Url::parse(&next).map_err(|e| {
                ClientError::Unexpected(format!("invalid next page link for {resource}, {e}"))
            })?;
            query.clear();
        }
    }

    async fn open_pull_requests(
        &self,
        repository: &str,
    ) -> Result<Vec<PullResponse>, ClientError> {
        self.get_paginated(
            self.repo_url(repository, &["pulls"])?,
            vec![("state", "open".to_string())],
            &format!("pull requests of {repository}"),
        )
        .await
    }
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    resource: &str,
) -> Result<T, ClientError> {
    response.json().await.map_err(|e| {
        ClientError::Unexpected(format!(
            "invalid response for {resource}: {}",
            e.without_url()
        ))
    })
}

fn classify(status: StatusCode, headers: &HeaderMap, resource: &str) -> ClientError {
    let quota_exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        == Some("0")
        || headers.contains_key(RETRY_AFTER);

    match status.as_u16() {
        401 => ClientError::Authentication(format!(
            "HTTP 401 for {resource}, the token was rejected"
        )),
        403 | 429 if quota_exhausted => {
            ClientError::RateLimited(format!("HTTP {} for {resource}", status.as_u16()))
        }
        429 => ClientError::RateLimited(format!("HTTP 429 for {resource}")),
        403 => ClientError::Authentication(format!(
            "HTTP 403 for {resource}, the token lacks the required access"
        )),
        404 => ClientError::NotFound(resource.to_string()),
        500..=599 => ClientError::Transient(format!("HTTP {} for {resource}", status.as_u16())),
        _ => ClientError::Unexpected(format!("HTTP {} for {resource}", status.as_u16())),
    }
}

fn author_login(user: Option<UserRef>) -> String {
    user.map(|user| user.login)
        .unwrap_or_else(|| GHOST_LOGIN.to_string())
}

/// URL of the `rel="next"` page in a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|param| param.trim() == "rel=\"next\"")
            .then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
    })
}

#[async_trait]
impl RepositoryClient for GitHubClient {
    async fn get_repository(&self, repository: &str) -> Result<RepositoryInfo, ClientError> {
        let response: RepositoryResponse = self
            .get_json(
                self.repo_url(repository, &[])?,
                &[],
                &format!("repository {repository}"),
            )
            .await?;
        Ok(RepositoryInfo {
            full_name: response.full_name,
            default_branch: response.default_branch,
        })
    }

    async fn get_branch_protection(
        &self,
        repository: &str,
        branch: &str,
    ) -> Result<Option<ProtectionInfo>, ClientError> {
        let resource = format!("branch {branch} of {repository}");
        let branch_response: BranchResponse = self
            .get_json(self.repo_url(repository, &["branches", branch])?, &[], &resource)
            .await?;
        if !branch_response.protected {
            return Ok(None);
        }

        let protection: ProtectionResponse = match self
            .get_json(
                self.repo_url(repository, &["branches", branch, "protection"])?,
                &[],
                &format!("protection of {resource}"),
            )
            .await
        {
            Ok(protection) => protection,
            // The branch exists, so a missing protection resource means the
            // branch is only covered by rules this endpoint does not report.
            Err(ClientError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let required_reviews = protection.required_pull_request_reviews.map(|reviews| {
            let bypass = reviews.bypass_pull_request_allowances.unwrap_or_default();
            RequiredReviews {
                require_code_owner_reviews: reviews.require_code_owner_reviews,
                dismiss_stale_reviews: reviews.dismiss_stale_reviews,
                bypass_allowances: BypassAllowances {
                    users: bypass.users.into_iter().map(|user| user.login).collect(),
                    teams: bypass.teams.into_iter().map(|team| team.slug).collect(),
                    apps: bypass.apps.into_iter().map(|app| app.slug).collect(),
                },
            }
        });

        Ok(Some(ProtectionInfo {
            required_signatures: protection
                .required_signatures
                .map(|setting| setting.enabled)
                .unwrap_or(false),
            required_reviews,
        }))
    }

    async fn get_collaborators(
        &self,
        repository: &str,
        affiliation: Affiliation,
        min_permission: Permission,
    ) -> Result<Vec<Collaborator>, ClientError> {
        let collaborators: Vec<CollaboratorResponse> = self
            .get_paginated(
                self.repo_url(repository, &["collaborators"])?,
                vec![
                    ("affiliation", affiliation.as_str().to_string()),
                    ("permission", min_permission.api_filter().to_string()),
                ],
                &format!("collaborators of {repository}"),
            )
            .await?;

        Ok(collaborators
            .into_iter()
            .map(|collaborator| Collaborator {
                permission: collaborator.permission(),
                login: collaborator.login,
            })
            .collect())
    }

    async fn get_collaborator_permission(
        &self,
        repository: &str,
        login: &str,
    ) -> Result<Permission, ClientError> {
        let response: PermissionResponse = match self
            .get_json(
                self.repo_url(repository, &["collaborators", login, "permission"])?,
                &[],
                &format!("permission of {login} on {repository}"),
            )
            .await
        {
            Ok(response) => response,
            Err(ClientError::NotFound(_)) => return Ok(Permission::None),
            Err(e) => return Err(e),
        };

        Ok(response
            .role_name
            .as_deref()
            .and_then(Permission::parse)
            .or_else(|| Permission::parse(&response.permission))
            .unwrap_or(Permission::None))
    }

    async fn get_pull_request_reviews(
        &self,
        repository: &str,
        pr_number: u64,
    ) -> Result<Vec<Review>, ClientError> {
        let number = pr_number.to_string();
        let reviews: Vec<ReviewResponse> = self
            .get_paginated(
                self.repo_url(repository, &["pulls", number.as_str(), "reviews"])?,
                Vec::new(),
                &format!("reviews of pull request #{pr_number} of {repository}"),
            )
            .await?;

        Ok(reviews
            .into_iter()
            .map(|review| Review {
                author: author_login(review.user),
                state: review.state,
                commit_sha: review.commit_id.unwrap_or_default(),
                body: review.body.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_commits(
        &self,
        repository: &str,
        branch_or_sha: &str,
    ) -> Result<Vec<Commit>, ClientError> {
        let commits: Vec<CommitResponse> = self
            .get_paginated(
                self.repo_url(repository, &["commits"])?,
                vec![("sha", branch_or_sha.to_string())],
                &format!("commits of {branch_or_sha} in {repository}"),
            )
            .await?;

        Ok(commits
            .into_iter()
            .map(|commit| Commit {
                verified: commit
                    .commit
                    .verification
                    .map(|verification| verification.verified)
                    .unwrap_or(false),
                sha: commit.sha,
            })
            .collect())
    }

    async fn list_comments(
        &self,
        repository: &str,
        commit_sha: &str,
    ) -> Result<Vec<Comment>, ClientError> {
        let pulls = self.open_pull_requests(repository).await?;
        let mut comments = Vec::new();

        for pull in pulls.into_iter().filter(|pull| pull.head.sha == commit_sha) {
            let number = pull.number.to_string();
            let page: Vec<CommentResponse> = self
                .get_paginated(
                    self.repo_url(repository, &["issues", number.as_str(), "comments"])?,
                    Vec::new(),
                    &format!("comments of pull request #{} of {repository}", pull.number),
                )
                .await?;
            comments.extend(page.into_iter().map(|comment| Comment {
                author: author_login(comment.user),
                body: comment.body.unwrap_or_default(),
            }));
        }
        Ok(comments)
    }

    async fn get_code_owners(&self, repository: &str) -> Result<Vec<String>, ClientError> {
        for path in CODE_OWNERS_PATHS {
            let resource = format!("{path} of {repository}");
            let segments: Vec<&str> = std::iter::once("contents").chain(path.split('/')).collect();
            let url = self.repo_url(repository, &segments)?;
            let response = match self.send(&url, &[], RAW_MEDIA_TYPE, &resource).await {
                Ok(response) => response,
                Err(ClientError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let content = response
                .text()
                .await
                .map_err(|e| {
                    ClientError::Transient(format!(
                        "reading {resource} failed: {}",
                        e.without_url()
                    ))
                })?;
            return Ok(parse_code_owners(&content));
        }
        Ok(Vec::new())
    }
}
