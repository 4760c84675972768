// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Authorization comments approving workflow runs on fork pull requests.

/// Command a maintainer comments, followed by the commit SHA, to approve a run.
pub const AUTHORIZATION_STRING_PREFIX: &str = "/canonical/self-hosted-runners/run-workflows";

/// The exact string expected in a comment approving `commit_sha`.
pub fn authorization_string(commit_sha: &str) -> String {
    format!("{AUTHORIZATION_STRING_PREFIX} {commit_sha}")
}

/// Drop every line whose first non-blank character is `>`.
///
/// Quoting someone else's approval must not count as approving.
pub fn remove_quote_lines(body: &str) -> String {
    body.lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether the unquoted part of `body` approves `commit_sha`.
pub fn authorizes(body: &str, commit_sha: &str) -> bool {
    let expected = authorization_string(commit_sha);
    remove_quote_lines(body)
        .lines()
        .any(|line| line.contains(&expected))
}
