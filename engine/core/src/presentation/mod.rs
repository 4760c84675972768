// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`policy-compliance-core`)
//!
//! HTTP surface that translates requests from the charm and the runners into
//! application service calls. No compliance logic lives here; all decisions
//! are delegated to `crate::application`.
//!
//! | Module | Transport | Description |
//! |--------|-----------|-------------|
//! | [`api`] | HTTP (Axum) | token issuance, policy upload and check-run endpoints |

pub mod api;
