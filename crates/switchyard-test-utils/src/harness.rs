// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full stack over a temp SQLite database: queue,
//! cost monitor, orchestrator with a mock web session, and a worker. Metered
//! providers can be pointed at a wiremock server.

use std::sync::Arc;

use switchyard_agent::{Orchestrator, Worker};
use switchyard_config::SwitchyardConfig;
use switchyard_core::{SwitchyardError, Task};
use switchyard_cost::CostMonitor;
use switchyard_storage::{Database, TaskQueue};

use crate::credentials::StaticCredentials;
use crate::mock_session::MockWebSession;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: SwitchyardConfig,
    credentials: StaticCredentials,
    web_service: String,
    web_responses: Vec<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = SwitchyardConfig::default();
        config.worker.poll_interval_ms = 10;
        Self {
            config,
            credentials: StaticCredentials::new(),
            web_service: "claude".to_string(),
            web_responses: Vec::new(),
        }
    }

    /// Point every configured provider at `base_url` (a wiremock server).
    pub fn with_provider_base_url(mut self, base_url: &str) -> Self {
        for provider in self.config.providers.values_mut() {
            provider.base_url = base_url.to_string();
        }
        self
    }

    /// Set a credential visible to the router and adapters.
    pub fn with_credential(mut self, name: &str, value: &str) -> Self {
        self.credentials = self.credentials.with(name, value);
        self
    }

    /// Set the daily budget; the warning threshold is set to the same value.
    pub fn with_budget(mut self, daily_usd: f64) -> Self {
        self.config.budget.daily_usd = daily_usd;
        self.config.budget.warn_at_usd = daily_usd;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.config.worker.max_attempts = max_attempts;
        self
    }

    /// Service name and replies of the mock web session.
    pub fn with_web_session(mut self, service: &str, responses: Vec<String>) -> Self {
        self.web_service = service.to_string();
        self.web_responses = responses;
        self
    }

    /// Arbitrary config changes before the stack is built.
    pub fn with_config(mut self, edit: impl FnOnce(&mut SwitchyardConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SwitchyardError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| SwitchyardError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();

        let mut config = self.config;
        config.storage.database_path = db_path.clone();

        let db = Database::open(&db_path).await?;
        let queue = TaskQueue::new(&db);
        let cost = CostMonitor::new(&db, &config.budget);

        let web_session = Arc::new(MockWebSession::with_responses(
            &self.web_service,
            self.web_responses,
        ));
        let orchestrator = Orchestrator::new(&config, Arc::new(self.credentials), cost.clone())?
            .with_web_adapter(web_session.clone());

        Ok(TestHarness {
            config,
            db,
            queue,
            cost,
            orchestrator: Arc::new(orchestrator),
            web_session,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock web session and temp storage.
pub struct TestHarness {
    pub config: SwitchyardConfig,
    pub db: Database,
    pub queue: TaskQueue,
    pub cost: CostMonitor,
    pub orchestrator: Arc<Orchestrator>,
    pub web_session: Arc<MockWebSession>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A worker over this harness's queue and orchestrator.
    pub fn worker(&self) -> Worker {
        Worker::new(
            self.queue.clone(),
            self.orchestrator.clone(),
            self.config.worker.clone(),
        )
    }

    /// Enqueue a prompt at the default priority.
    pub async fn submit(&self, prompt: &str) -> Result<String, SwitchyardError> {
        self.queue.push(&Task::new(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert_eq!(harness.queue.stats().await.unwrap().total(), 0);
        assert_eq!(harness.cost.today_spend().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let a = TestHarness::builder().build().await.unwrap();
        let b = TestHarness::builder().build().await.unwrap();
        assert_ne!(a.config.storage.database_path, b.config.storage.database_path);

        a.submit("only in a").await.unwrap();
        assert_eq!(b.queue.stats().await.unwrap().pending, 0);
    }
}
