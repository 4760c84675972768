// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Value types and contracts for compliance evaluation: job requests,
//! policy documents, reports, one-time tokens and the GitHub capability
//! trait the checks query through.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types; no I/O happens here

pub mod authorization;
pub mod errors;
pub mod job;
pub mod policy;
pub mod report;
pub mod repository;
pub mod repository_client;
pub mod service_config;
pub mod token;
