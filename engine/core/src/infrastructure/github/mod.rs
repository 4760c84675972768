// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # GitHub Adapters
//!
//! Implementations of [`crate::domain::repository_client::RepositoryClient`].
//!
//! | Adapter | Backing | Used by |
//! |---------|---------|---------|
//! | [`GitHubClient`] | GitHub REST API v3 over `reqwest` | `serve`, `check` |
//! | [`InMemoryRepositoryClient`] | seeded fixtures | tests, local development |

mod client;
mod code_owners;
mod in_memory;

pub use client::GitHubClient;
pub use code_owners::{parse_code_owners, CODE_OWNERS_PATHS};
pub use in_memory::InMemoryRepositoryClient;
