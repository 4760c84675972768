// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the policy compliance CLI

pub mod check;
pub mod config;
pub mod policy;
pub mod serve;

pub use self::check::CheckCommand;
pub use self::config::ConfigCommand;
pub use self::policy::PolicyCommand;
