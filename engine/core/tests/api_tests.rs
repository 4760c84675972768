// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use policy_compliance_core::application::{ComplianceService, TokenService};
use policy_compliance_core::domain::policy::UsedPolicy;
use policy_compliance_core::domain::repository_client::Permission;
use policy_compliance_core::infrastructure::github::InMemoryRepositoryClient;
use policy_compliance_core::infrastructure::repositories::InMemoryOneTimeTokenRepository;
use policy_compliance_core::presentation::api::{app, AppState, FAILURE_MESSAGE};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "charm-secret";
const REPO: &str = "canonical/repo";

fn router(client: InMemoryRepositoryClient) -> Router {
    let compliance = ComplianceService::new(Arc::new(client), UsedPolicy::AllowForks);
    let tokens = TokenService::new(
        Arc::new(InMemoryOneTimeTokenRepository::new()),
        Some(SECRET.to_string()),
    );
    app(Arc::new(AppState::new(compliance, tokens)))
}

fn compliant() -> InMemoryRepositoryClient {
    InMemoryRepositoryClient::new()
        .with_repository(REPO, "main")
        .with_collaborator(REPO, "a", Permission::Read, true)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn one_time_token(router: &Router) -> String {
    let (status, token) = send(router, get("/one-time-token", Some(SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    token
}

fn push_body() -> Value {
    json!({"repository_name": REPO, "branch_name": "main", "commit_sha": "abc123"})
}

#[tokio::test]
async fn test_health() {
    let router = router(compliant());
    let (status, body) = send(&router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));
}

#[tokio::test]
async fn test_one_time_token_requires_shared_secret() {
    let router = router(compliant());
    assert_eq!(send(&router, get("/one-time-token", None)).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(
        send(&router, get("/one-time-token", Some("guess"))).await.0,
        StatusCode::UNAUTHORIZED
    );

    let token = one_time_token(&router).await;
    assert_eq!(token.len(), 64);
}

#[tokio::test]
async fn test_runner_token_cannot_issue_tokens_and_is_consumed() {
    let router = router(compliant());
    let token = one_time_token(&router).await;

    let (status, _) = send(&router, get("/one-time-token", Some(&token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&router, post_json("/push/check-run", &token, &push_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_push_check_run_passes_once_per_token() {
    let router = router(compliant());
    let token = one_time_token(&router).await;

    let (status, body) = send(&router, post_json("/push/check-run", &token, &push_body())).await;
    assert_eq!(status, StatusCode::NO_CONTENT, "{body}");

    let (status, _) = send(&router, post_json("/push/check-run", &token, &push_body())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_shared_secret_cannot_run_checks() {
    let router = router(compliant());
    let (status, _) = send(&router, post_json("/push/check-run", SECRET, &push_body())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_failed_check_is_forbidden_with_reason() {
    let client = compliant().with_collaborator(REPO, "b", Permission::Write, true);
    let router = router(client);

    for path in ["/push/check-run", "/workflow_dispatch/check-run", "/schedule/check-run"] {
        let token = one_time_token(&router).await;
        let (status, body) = send(&router, post_json(path, &token, &push_body())).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        assert!(body.starts_with(FAILURE_MESSAGE));
        assert!(body.contains("\"b\""), "{body}");
    }
}

#[tokio::test]
async fn test_pull_request_check_run() {
    let client = compliant().with_branch(REPO, "main", None);
    let router = router(client);
    let body = json!({
        "repository_name": REPO,
        "source_repository_name": REPO,
        "target_branch_name": "main",
        "source_branch_name": "feature",
        "commit_sha": "abc123"
    });

    for path in ["/check-run", "/pull_request/check-run"] {
        let token = one_time_token(&router).await;
        let (status, reason) = send(&router, post_json(path, &token, &body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
        assert!(reason.contains("branch protection not enabled"), "{reason}");
    }
}

#[tokio::test]
async fn test_missing_and_empty_fields_are_bad_requests() {
    let router = router(compliant());

    let token = one_time_token(&router).await;
    let (status, body) = send(
        &router,
        post_json("/check-run", &token, &json!({"repository_name": REPO})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("missing data"), "{body}");

    let token = one_time_token(&router).await;
    let (status, body) = send(
        &router,
        post_json(
            "/push/check-run",
            &token,
            &json!({"repository_name": REPO, "branch_name": "", "commit_sha": "abc123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("branch_name"), "{body}");
}

#[tokio::test]
async fn test_non_json_body_is_unsupported() {
    let router = router(compliant());
    let token = one_time_token(&router).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/push/check-run")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("repository_name=canonical/repo"))
        .unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_policy_upload() {
    let client = compliant().with_collaborator(REPO, "b", Permission::Write, true);
    let router = router(client);

    let (status, reason) = send(
        &router,
        post_json("/policy", SECRET, &json!({"push": {"collaborators": {"enabled": "no"}}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(reason.contains("invalid policy document"), "{reason}");

    let (status, _) = send(
        &router,
        post_json("/policy", SECRET, &json!({"push": {"collaborators": {"enabled": false}}})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Collaborators are no longer checked for pushes.
    let token = one_time_token(&router).await;
    let (status, _) = send(&router, post_json("/push/check-run", &token, &push_body())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Runners may not change the policy.
    let token = one_time_token(&router).await;
    let (status, _) = send(&router, post_json("/policy", &token, &json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
