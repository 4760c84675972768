// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL One-Time Token Repository
//!
//! `OneTimeTokenRepository` backed by the `one_time_token` table. Consumption
//! is a single conditional `DELETE`, so concurrent redemptions of the same
//! token across processes succeed at most once.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::domain::repository::{OneTimeTokenRepository, RepositoryError};
use crate::domain::token::TokenDigest;

pub struct PostgresOneTimeTokenRepository {
    pool: PgPool,
}

impl PostgresOneTimeTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OneTimeTokenRepository for PostgresOneTimeTokenRepository {
    async fn save(&self, digest: &TokenDigest) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO one_time_token (value) VALUES ($1)")
            .bind(digest.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn consume(&self, digest: &TokenDigest) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM one_time_token WHERE value = $1")
            .bind(digest.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to consume token: {}", e)))?;
        Ok(result.rows_affected() == 1)
    }
}
