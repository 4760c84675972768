// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # One-Time Tokens
//!
//! A runner exchanges nothing for a token; the charm (holder of the shared
//! secret) requests one on the runner's behalf. The token authenticates
//! exactly one check-run request.
//!
//! The raw value is handed out once and never stored: persistence only ever
//! sees [`TokenDigest`], the hex SHA-256 of the value.

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use super::repository::RepositoryError;

/// Random bytes per token; hex encoding doubles the length.
pub const TOKEN_BYTES: usize = 32;

/// Opaque single-use credential.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeToken(String);

impl OneTimeToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn from_value(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn digest(&self) -> TokenDigest {
        TokenDigest::of(&self.0)
    }
}

// Never print the secret value.
impl fmt::Debug for OneTimeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OneTimeToken(..)")
    }
}

/// Storage key of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenDigest(String);

impl TokenDigest {
    pub fn of(value: &str) -> Self {
        Self(hex::encode(Sha256::digest(value.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("the presented secret is not authorized to issue tokens")]
    Unauthorized,

    #[error("no shared secret is configured for issuing tokens")]
    NotConfigured,

    #[error("token storage failed: {0}")]
    Storage(#[from] RepositoryError),
}
