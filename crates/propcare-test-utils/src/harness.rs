// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness: a temporary SQLite store wired to the scripted doubles.

use std::sync::Arc;

use propcare_config::model::StorageConfig;
use propcare_core::PropcareError;
use propcare_storage::SqliteStorage;

use crate::mock_completion::MockCompletion;
use crate::mock_mailer::MockMailer;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    mailer_failures: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            mailer_failures: 0,
        }
    }

    /// Raw completion outputs to replay, in order.
    pub fn with_completions(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Make the first `n` email sends fail.
    pub fn with_mailer_failures(mut self, n: usize) -> Self {
        self.mailer_failures = n;
        self
    }

    pub async fn build(self) -> Result<TestHarness, PropcareError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| PropcareError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("propcare-test.db");

        let storage = SqliteStorage::open(StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        })
        .await?;

        Ok(TestHarness {
            storage: Arc::new(storage),
            completion: Arc::new(MockCompletion::with_responses(self.responses)),
            mailer: Arc::new(MockMailer::failing(self.mailer_failures)),
            _temp_dir: temp_dir,
        })
    }
}

/// A temporary store plus doubles. The database is removed on drop.
pub struct TestHarness {
    pub storage: Arc<SqliteStorage>,
    pub completion: Arc<MockCompletion>,
    pub mailer: Arc<MockMailer>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with no scripted completions and a mailer that always succeeds.
    pub async fn new() -> Result<Self, PropcareError> {
        Self::builder().build().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propcare_core::{HealthStatus, PluginAdapter};

    #[tokio::test]
    async fn harness_opens_a_healthy_store() {
        let harness = TestHarness::new().await.unwrap();
        assert_eq!(
            harness.storage.health_check().await.unwrap(),
            HealthStatus::Healthy
        );
        assert_eq!(harness.storage.ticket_count().await.unwrap(), 0);
    }
}
