// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the persistence contracts in
//! `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! - **PostgresOneTimeTokenRepository** - shared `one_time_token` table
//! - **InMemoryOneTimeTokenRepository** - mutex-guarded set, single process only

pub mod postgres_token;

pub use postgres_token::PostgresOneTimeTokenRepository;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::repository::{OneTimeTokenRepository, RepositoryError};
use crate::domain::token::TokenDigest;

#[derive(Clone, Default)]
pub struct InMemoryOneTimeTokenRepository {
    tokens: Arc<Mutex<HashSet<TokenDigest>>>,
}

impl InMemoryOneTimeTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding tokens.
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

#[async_trait]
impl OneTimeTokenRepository for InMemoryOneTimeTokenRepository {
    async fn save(&self, digest: &TokenDigest) -> Result<(), RepositoryError> {
        if !self.tokens.lock().insert(digest.clone()) {
            return Err(RepositoryError::Duplicate(format!(
                "one-time token {}",
                digest.as_str()
            )));
        }
        Ok(())
    }

    async fn consume(&self, digest: &TokenDigest) -> Result<bool, RepositoryError> {
        Ok(self.tokens.lock().remove(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let repository = InMemoryOneTimeTokenRepository::new();
        let digest = TokenDigest::of("token");
        repository.save(&digest).await.unwrap();
        assert_eq!(repository.len(), 1);

        assert!(repository.consume(&digest).await.unwrap());
        assert!(!repository.consume(&digest).await.unwrap());
        assert!(repository.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_save_is_rejected() {
        let repository = InMemoryOneTimeTokenRepository::new();
        let digest = TokenDigest::of("token");
        repository.save(&digest).await.unwrap();
        assert!(matches!(
            repository.save(&digest).await,
            Err(RepositoryError::Duplicate(_))
        ));
    }
}
