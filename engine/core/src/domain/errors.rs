// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Error Taxonomy
//!
//! | Error | Raised by | Effect |
//! |-------|-----------|--------|
//! | [`ComplianceError::Configuration`] | credentials, policy document | aborts the evaluation |
//! | [`ComplianceError::Input`] | job metadata validation | aborts before any remote call |
//! | [`ClientError`](crate::domain::repository_client::ClientError) | remote repository client | absorbed into a check `Report` |
//! | [`TokenError`](crate::domain::token::TokenError) | one-time token store | rejects the caller |
//!
//! Only the two [`ComplianceError`] variants escape the orchestrator.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComplianceError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid input: {0}")]
    Input(String),
}
