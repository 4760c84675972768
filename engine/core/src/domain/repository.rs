// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts, defined in the domain layer and implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Stored value | Implementations |
//! |-------|--------------|----------------|
//! | `OneTimeTokenRepository` | `TokenDigest` | `InMemoryOneTimeTokenRepository`, `PostgresOneTimeTokenRepository` |
//!
//! The backend is selected at startup: PostgreSQL when `database_url` is
//! configured, in-memory otherwise (single process only).

use async_trait::async_trait;
use crate::domain::token::TokenDigest;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

impl StorageBackend {
    pub fn from_database_url(database_url: Option<&str>) -> Self {
        match database_url {
            Some(url) if !url.trim().is_empty() => StorageBackend::PostgreSQL(PostgresConfig {
                connection_string: url.to_string(),
            }),
            _ => StorageBackend::InMemory,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

/// Repository for outstanding one-time tokens.
#[async_trait]
pub trait OneTimeTokenRepository: Send + Sync {
    /// Persist a new, unused token.
    async fn save(&self, digest: &TokenDigest) -> Result<(), RepositoryError>;

    /// Atomically remove the token if present.
    ///
    /// Returns `true` for exactly one caller per saved token, however many
    /// race on the same digest.
    async fn consume(&self, digest: &TokenDigest) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RepositoryError::Duplicate(db_err.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
