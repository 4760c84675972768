// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! Use cases built on the domain types: the check catalogue, the compliance
//! orchestrator and one-time token issuance.

pub mod checks;
pub mod compliance_service;
pub mod token_service;

pub use compliance_service::ComplianceService;
pub use token_service::TokenService;
