// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a check, or of a whole job evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    Pass,
    Fail,
    Error,
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            CheckResult::Pass => "pass",
            CheckResult::Fail => "fail",
            CheckResult::Error => "error",
        };
        f.write_str(value)
    }
}

/// Result of a check plus the reason it did not pass.
///
/// Only constructible through [`Report::pass`], [`Report::fail`] and
/// [`Report::error`], which keep `reason` present iff the result is not a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    result: CheckResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl Report {
    pub fn pass() -> Self {
        Self {
            result: CheckResult::Pass,
            reason: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self::non_passing(CheckResult::Fail, reason.into())
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::non_passing(CheckResult::Error, reason.into())
    }

    fn non_passing(result: CheckResult, reason: String) -> Self {
        let reason = if reason.trim().is_empty() {
            format!("check did not pass ({result})")
        } else {
            reason
        };
        Self {
            result,
            reason: Some(reason),
        }
    }

    pub fn result(&self) -> CheckResult {
        self.result
    }

    /// Empty for passing reports.
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }

    pub fn passed(&self) -> bool {
        self.result == CheckResult::Pass
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {}", self.result, reason),
            None => write!(f, "{}", self.result),
        }
    }
}
