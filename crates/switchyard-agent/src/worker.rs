// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue worker: claims tasks, executes them and records the outcome.

use std::sync::Arc;
use std::time::Duration;

use switchyard_config::model::WorkerConfig;
use switchyard_core::{SwitchyardError, TaskStatus};
use switchyard_storage::TaskQueue;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::orchestrator::Orchestrator;

/// Result of one [`Worker::run_once`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// The queue had nothing pending.
    Idle,
    /// A task was claimed and left in the given status.
    Task { id: String, status: TaskStatus },
}

/// Polls the queue and executes tasks one at a time.
pub struct Worker {
    queue: TaskQueue,
    orchestrator: Arc<Orchestrator>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(queue: TaskQueue, orchestrator: Arc<Orchestrator>, config: WorkerConfig) -> Self {
        Self {
            queue,
            orchestrator,
            config,
        }
    }

    /// Claim and execute at most one task.
    pub async fn run_once(&self) -> Result<Processed, SwitchyardError> {
        let Some(task) = self.queue.pop().await? else {
            return Ok(Processed::Idle);
        };
        info!(task_id = %task.id, attempt = task.attempts, priority = task.priority, "task claimed");

        let status = match self.orchestrator.execute_task(&task).await {
            Ok(execution) => {
                self.queue.complete(&task.id, &execution.text).await?;
                info!(
                    task_id = %task.id,
                    task_type = %execution.decision.task_type,
                    api = execution.usage.is_some(),
                    "task done"
                );
                TaskStatus::Done
            }
            Err(e) => {
                let status = self
                    .queue
                    .fail(&task.id, self.config.max_attempts, &e.to_string())
                    .await?;
                if status == TaskStatus::Failed {
                    let exhausted = SwitchyardError::TaskExhausted {
                        id: task.id.clone(),
                        attempts: task.attempts,
                    };
                    error!(error = %exhausted, last_error = %e, "task exhausted");
                } else {
                    warn!(task_id = %task.id, error = %e, "task attempt failed");
                }
                status
            }
        };

        Ok(Processed::Task {
            id: task.id,
            status,
        })
    }

    /// Run until `cancel` fires.
    ///
    /// Stale claims are reclaimed once at start-up. A task in flight is
    /// finished before the loop observes cancellation.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SwitchyardError> {
        let stale_after = Duration::from_secs(self.config.stale_after_secs);
        let reclaimed = self.queue.reclaim_stale(stale_after).await?;
        if reclaimed > 0 {
            info!(count = reclaimed, "reclaimed stale tasks");
        }

        let idle = Duration::from_millis(self.config.poll_interval_ms);
        info!(poll_interval_ms = self.config.poll_interval_ms, "worker running");

        while !cancel.is_cancelled() {
            let sleep = match self.run_once().await {
                Ok(Processed::Task { .. }) => continue,
                Ok(Processed::Idle) => {
                    debug!("queue empty");
                    idle
                }
                Err(e) => {
                    error!(error = %e, "worker iteration failed");
                    idle
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(sleep) => {}
            }
        }

        self.orchestrator.shutdown().await;
        info!("worker stopped");
        Ok(())
    }
}
