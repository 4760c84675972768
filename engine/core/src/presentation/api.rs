// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # HTTP API
//!
//! | Route | Caller | Success |
//! |-------|--------|---------|
//! | `GET /health` | anyone | 200 |
//! | `GET /one-time-token` | charm | 200, token in body |
//! | `POST /policy` | charm | 204 |
//! | `POST /check-run` | runner | 204 (pull request, legacy path) |
//! | `POST /pull_request/check-run` | runner | 204 |
//! | `POST /workflow_dispatch/check-run` | runner | 204 |
//! | `POST /push/check-run` | runner | 204 |
//! | `POST /schedule/check-run` | runner | 204 |
//!
//! Callers authenticate with `Authorization: Bearer <token>`. The shared
//! secret grants the charm role; a one-time token grants the runner role and
//! is consumed by the request that presents it, whatever the outcome.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::application::{ComplianceService, TokenService};
use crate::domain::errors::ComplianceError;
use crate::domain::job::{JobMetadata, JobRequest, JobType, PullRequestMetadata};
use crate::domain::policy::{self, PolicyDocument};
use crate::domain::token::TokenError;

/// Prefix of every rejected check-run response.
pub const FAILURE_MESSAGE: &str = "This job has failed to pass a repository policy compliance \
check as defined in the https://github.com/canonical/repo-policy-compliance repository. The \
specific failure is listed below. Please update the settings on this project to fix the \
relevant policy.\n";

pub struct AppState {
    pub compliance: ComplianceService,
    pub tokens: TokenService,
    /// Last accepted policy document; the service default applies until one is posted.
    pub policy: RwLock<Option<PolicyDocument>>,
}

impl AppState {
    pub fn new(compliance: ComplianceService, tokens: TokenService) -> Self {
        Self {
            compliance,
            tokens,
            policy: RwLock::new(None),
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/one-time-token", get(one_time_token_handler))
        .route("/policy", post(policy_handler))
        .route("/check-run", post(pull_request_check_run_handler))
        .route("/pull_request/check-run", post(pull_request_check_run_handler))
        .route("/workflow_dispatch/check-run", post(workflow_dispatch_check_run_handler))
        .route("/push/check-run", post(push_check_run_handler))
        .route("/schedule/check-run", post(schedule_check_run_handler))
        .with_state(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Charm,
    Runner,
}

#[derive(Debug)]
enum ApiError {
    Unauthorized,
    Forbidden(String),
    BadRequest(String),
    UnsupportedMediaType,
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized Access").into_response()
            }
            ApiError::Forbidden(reason) => (StatusCode::FORBIDDEN, reason).into_response(),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
            ApiError::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "expected a request with Content-Type: application/json",
            )
                .into_response(),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error, see the service logs",
            )
                .into_response(),
        }
    }
}

impl From<ComplianceError> for ApiError {
    fn from(err: ComplianceError) -> Self {
        match err {
            ComplianceError::Input(reason) => ApiError::BadRequest(reason),
            ComplianceError::Configuration(reason) => {
                tracing::error!(%reason, "evaluation aborted by configuration error");
                ApiError::Internal
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Unauthorized => ApiError::Unauthorized,
            TokenError::NotConfigured => {
                tracing::error!("CHARM_TOKEN is not configured, rejecting authenticated request");
                ApiError::Unauthorized
            }
            TokenError::Storage(e) => {
                tracing::error!(error = %e, "token storage failed");
                ApiError::Internal
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

/// Resolve the caller's role. A presented one-time token is consumed here.
async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    required: Role,
) -> Result<(), ApiError> {
    let token = bearer_token(headers).ok_or(ApiError::Unauthorized)?;

    let role = if state.tokens.is_shared_secret(token) {
        Role::Charm
    } else if state.tokens.validate_and_consume(token).await? {
        Role::Runner
    } else {
        return Err(ApiError::Unauthorized);
    };

    if role != required {
        tracing::warn!(?role, ?required, "caller lacks the required role");
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }
    Ok(())
}

fn json_body(headers: &HeaderMap, body: &Bytes) -> Result<Value, ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json")
                || (mime.starts_with("application/") && mime.ends_with("+json"))
        })
        .unwrap_or(false);
    if !is_json {
        return Err(ApiError::UnsupportedMediaType);
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body, {e}")))
}

/// Deserialize `value`, reporting absent keys rather than serde's first error.
fn parse_fields<T: serde::de::DeserializeOwned>(
    value: Value,
    expected: &[&str],
) -> Result<T, ApiError> {
    let Value::Object(object) = &value else {
        return Err(ApiError::BadRequest("expected a JSON object".to_string()));
    };
    let missing: Vec<&str> = expected
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "missing data, missing_keys={missing:?}, expected_keys={expected:?}"
        )));
    }
    serde_json::from_value(value).map_err(|e| ApiError::BadRequest(format!("invalid data, {e}")))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn one_time_token_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<String, ApiError> {
    authenticate(&state, &headers, Role::Charm).await?;
    let presented = bearer_token(&headers).unwrap_or_default();
    let token = state.tokens.issue(presented).await?;
    Ok(token.value().to_string())
}

async fn policy_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    authenticate(&state, &headers, Role::Charm).await?;
    let document = json_body(&headers, &body)?;

    let report = policy::check(&document);
    if !report.passed() {
        return Err(ApiError::BadRequest(report.reason().to_string()));
    }
    let parsed = PolicyDocument::parse(&document)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    *state.policy.write() = Some(parsed);
    tracing::info!("policy document updated");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct PullRequestInput {
    repository_name: String,
    source_repository_name: String,
    target_branch_name: String,
    source_branch_name: String,
    commit_sha: String,
}

const PULL_REQUEST_KEYS: [&str; 5] = [
    "repository_name",
    "source_repository_name",
    "target_branch_name",
    "source_branch_name",
    "commit_sha",
];

#[derive(Deserialize)]
struct BranchJobInput {
    repository_name: String,
    branch_name: String,
    commit_sha: String,
    #[serde(default)]
    source_repository_name: Option<String>,
}

const BRANCH_JOB_KEYS: [&str; 3] = ["repository_name", "branch_name", "commit_sha"];

async fn pull_request_check_run_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    authenticate(&state, &headers, Role::Runner).await?;
    let input: PullRequestInput = parse_fields(json_body(&headers, &body)?, &PULL_REQUEST_KEYS)?;

    let request = JobRequest::PullRequest(PullRequestMetadata {
        job: JobMetadata::new(input.repository_name, input.source_branch_name, input.commit_sha)
            .with_source_repository(input.source_repository_name),
        target_branch_name: input.target_branch_name,
    });
    evaluate(&state, request).await
}

async fn workflow_dispatch_check_run_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    branch_job_check_run(&state, JobType::WorkflowDispatch, &headers, &body).await
}

async fn push_check_run_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    branch_job_check_run(&state, JobType::Push, &headers, &body).await
}

async fn schedule_check_run_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    branch_job_check_run(&state, JobType::Schedule, &headers, &body).await
}

async fn branch_job_check_run(
    state: &AppState,
    job_type: JobType,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<StatusCode, ApiError> {
    authenticate(state, headers, Role::Runner).await?;
    let input: BranchJobInput = parse_fields(json_body(headers, body)?, &BRANCH_JOB_KEYS)?;

    let mut metadata = JobMetadata::new(input.repository_name, input.branch_name, input.commit_sha);
    metadata.source_repository_name = input.source_repository_name;
    evaluate(state, JobRequest::branch_job(job_type, metadata)?).await
}

async fn evaluate(state: &AppState, request: JobRequest) -> Result<StatusCode, ApiError> {
    let policy = state.policy.read().clone();
    let report = state.compliance.evaluate(&request, policy.as_ref()).await?;
    if report.passed() {
        return Ok(StatusCode::NO_CONTENT);
    }
    Err(ApiError::Forbidden(format!("{FAILURE_MESSAGE}{}", report.reason())))
}
