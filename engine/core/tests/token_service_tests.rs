// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use policy_compliance_core::application::TokenService;
use policy_compliance_core::domain::token::TokenError;
use policy_compliance_core::infrastructure::repositories::InMemoryOneTimeTokenRepository;
use std::sync::Arc;

const SECRET: &str = "charm-shared-secret";

fn service() -> (Arc<TokenService>, InMemoryOneTimeTokenRepository) {
    let repository = InMemoryOneTimeTokenRepository::new();
    let service = TokenService::new(Arc::new(repository.clone()), Some(SECRET.to_string()));
    (Arc::new(service), repository)
}

#[tokio::test]
async fn test_token_is_single_use() {
    let (service, repository) = service();
    let token = service.issue(SECRET).await.unwrap();
    assert_eq!(repository.len(), 1);

    assert!(service.validate_and_consume(token.value()).await.unwrap());
    assert!(!service.validate_and_consume(token.value()).await.unwrap());
    assert!(repository.is_empty());
}

#[tokio::test]
async fn test_tokens_are_independent() {
    let (service, _) = service();
    let first = service.issue(SECRET).await.unwrap();
    let second = service.issue(SECRET).await.unwrap();
    assert_ne!(first.value(), second.value());

    assert!(service.validate_and_consume(second.value()).await.unwrap());
    assert!(service.validate_and_consume(first.value()).await.unwrap());
}

#[tokio::test]
async fn test_wrong_secret_issues_nothing() {
    let (service, repository) = service();
    for secret in ["", "charm-shared-secre", "charm-shared-secret ", "CHARM-SHARED-SECRET"] {
        assert!(matches!(service.issue(secret).await, Err(TokenError::Unauthorized)));
    }
    assert!(repository.is_empty());
}

#[tokio::test]
async fn test_raw_token_is_never_stored() {
    let (service, repository) = service();
    let token = service.issue(SECRET).await.unwrap();
    let digest = token.digest();
    assert_ne!(digest.as_str(), token.value());
    assert_eq!(repository.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemption_succeeds_once() {
    let (service, _) = service();
    let token = service.issue(SECRET).await.unwrap();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let service = service.clone();
            let value = token.value().to_string();
            tokio::spawn(async move { service.validate_and_consume(&value).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
