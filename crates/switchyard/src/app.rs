// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared wiring for subcommands that touch the database.

use std::sync::Arc;

use switchyard_agent::Orchestrator;
use switchyard_config::SwitchyardConfig;
use switchyard_core::{CredentialSource, EnvCredentials, SwitchyardError};
use switchyard_cost::CostMonitor;
use switchyard_storage::{Database, TaskQueue};

/// Opened database plus the services built over it.
pub struct App {
    pub db: Database,
    pub queue: TaskQueue,
    pub cost: CostMonitor,
    pub credentials: Arc<dyn CredentialSource>,
}

impl App {
    pub async fn open(config: &SwitchyardConfig) -> Result<Self, SwitchyardError> {
        let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
        let queue = TaskQueue::new(&db);
        let cost = CostMonitor::new(&db, &config.budget);
        Ok(Self {
            db,
            queue,
            cost,
            credentials: Arc::new(EnvCredentials),
        })
    }

    /// Orchestrator without web sessions; the browser adapters plug in here.
    pub fn orchestrator(&self, config: &SwitchyardConfig) -> Result<Orchestrator, SwitchyardError> {
        Orchestrator::new(config, self.credentials.clone(), self.cost.clone())
    }

    pub async fn close(self) -> Result<(), SwitchyardError> {
        self.db.close().await
    }

    /// Close the database, then hand back a command's outcome. The command's
    /// own error wins over a close failure.
    pub async fn finish<T>(self, outcome: Result<T, SwitchyardError>) -> Result<T, SwitchyardError> {
        let closed = self.close().await;
        let value = outcome?;
        closed?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &tempfile::TempDir) -> SwitchyardConfig {
        let mut config = SwitchyardConfig::default();
        config.storage.database_path = dir.path().join("app.db").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn finish_closes_and_keeps_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir);

        let app = App::open(&config).await.unwrap();
        let err = app
            .finish::<()>(Err(SwitchyardError::TaskNotFound("t-9".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::TaskNotFound(id) if id == "t-9"));

        let app = App::open(&config).await.unwrap();
        assert_eq!(app.queue.stats().await.unwrap().total(), 0);
        app.finish(Ok(())).await.unwrap();
    }
}
