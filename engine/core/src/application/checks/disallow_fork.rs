// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::job::JobMetadata;
use crate::domain::report::Report;
use crate::domain::repository_client::ClientError;

/// The source branch must live in the target repository itself.
pub async fn disallow_fork(metadata: &JobMetadata) -> Result<Report, ClientError> {
    if !metadata.is_fork() {
        return Ok(Report::pass());
    }
    Ok(Report::fail(format!(
        "pull requests from forks are not allowed, repository_name={:?}, source_repository_name={:?}",
        metadata.repository_name,
        metadata.source_repository()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disallow_fork() {
        let same = JobMetadata::new("canonical/repo", "feature", "abc123");
        assert!(disallow_fork(&same).await.unwrap().passed());

        let explicit_same = same.clone().with_source_repository("canonical/repo");
        assert!(disallow_fork(&explicit_same).await.unwrap().passed());

        let fork = same.with_source_repository("someone/repo");
        let report = disallow_fork(&fork).await.unwrap();
        assert!(!report.passed());
        assert!(report.reason().contains("someone/repo"));
    }
}
