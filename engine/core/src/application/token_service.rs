// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Token Service
//!
//! Issues one-time tokens to holders of the shared secret and redeems them.
//! Single use is enforced by the repository's atomic `consume`, so any number
//! of service instances may share one PostgreSQL table.

use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::domain::repository::OneTimeTokenRepository;
use crate::domain::token::{OneTimeToken, TokenDigest, TokenError};

pub struct TokenService {
    repository: Arc<dyn OneTimeTokenRepository>,
    shared_secret: Option<String>,
}

impl TokenService {
    pub fn new(repository: Arc<dyn OneTimeTokenRepository>, shared_secret: Option<String>) -> Self {
        let shared_secret = shared_secret.filter(|secret| !secret.is_empty());
        if shared_secret.is_none() {
            tracing::warn!("no shared secret configured, one-time tokens cannot be issued");
        }
        Self {
            repository,
            shared_secret,
        }
    }

    /// Whether `presented` is the shared secret, compared in constant time.
    pub fn is_shared_secret(&self, presented: &str) -> bool {
        match &self.shared_secret {
            Some(secret) if !presented.is_empty() => {
                bool::from(secret.as_bytes().ct_eq(presented.as_bytes()))
            }
            _ => false,
        }
    }

    /// Create and persist a token for the holder of the shared secret.
    pub async fn issue(&self, presented_secret: &str) -> Result<OneTimeToken, TokenError> {
        if self.shared_secret.is_none() {
            return Err(TokenError::NotConfigured);
        }
        if !self.is_shared_secret(presented_secret) {
            tracing::warn!("token requested with an invalid shared secret");
            return Err(TokenError::Unauthorized);
        }

        let token = OneTimeToken::generate();
        self.repository.save(&token.digest()).await?;
        tracing::info!("one-time token issued");
        Ok(token)
    }

    /// Redeem `token`. `true` exactly once per issued token.
    pub async fn validate_and_consume(&self, token: &str) -> Result<bool, TokenError> {
        if token.is_empty() {
            return Ok(false);
        }
        let consumed = self.repository.consume(&TokenDigest::of(token)).await?;
        if consumed {
            tracing::debug!("one-time token consumed");
        } else {
            tracing::info!("unknown or already used one-time token presented");
        }
        Ok(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryOneTimeTokenRepository;

    fn service(secret: Option<&str>) -> TokenService {
        TokenService::new(
            Arc::new(InMemoryOneTimeTokenRepository::new()),
            secret.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_issue_then_consume_once() {
        let service = service(Some("charm-secret"));
        let token = service.issue("charm-secret").await.unwrap();
        assert!(service.validate_and_consume(token.value()).await.unwrap());
        assert!(!service.validate_and_consume(token.value()).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_secret_creates_nothing() {
        let repository = Arc::new(InMemoryOneTimeTokenRepository::new());
        let service = TokenService::new(repository.clone(), Some("charm-secret".into()));

        assert!(matches!(service.issue("guess").await, Err(TokenError::Unauthorized)));
        assert!(matches!(service.issue("").await, Err(TokenError::Unauthorized)));
        assert_eq!(repository.len(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_secret() {
        let service = service(Some(""));
        assert!(matches!(service.issue("").await, Err(TokenError::NotConfigured)));
        assert!(!service.is_shared_secret(""));
    }

    #[tokio::test]
    async fn test_unknown_and_empty_tokens_are_rejected() {
        let service = service(Some("charm-secret"));
        assert!(!service.validate_and_consume("").await.unwrap());
        assert!(!service.validate_and_consume("not-issued").await.unwrap());
        // The shared secret is not itself a one-time token.
        assert!(!service.validate_and_consume("charm-secret").await.unwrap());
    }
}
