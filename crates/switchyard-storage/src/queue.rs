// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable priority task queue.
//!
//! Dispatch order is `(priority, created_at, seq)` ascending, where `seq` is
//! the insertion order. A claim runs inside one `BEGIN IMMEDIATE`
//! transaction and the status flip is guarded by `status = 'pending'`, so two
//! pollers in the same or different processes never receive the same task.

use std::str::FromStr;
use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};
use switchyard_core::types::epoch_now;
use switchyard_core::{SwitchyardError, Task, TaskStatus};
use tracing::{debug, info, warn};

use crate::database::{Database, map_tr_err};

const TASK_COLUMNS: &str = "id, prompt, task_type, attachments, service, priority, status, \
     result, created_at, attempts, last_error, started_at";

/// Per-status task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub running: u64,
    pub done: u64,
    pub failed: u64,
}

impl QueueStats {
    pub fn total(&self) -> u64 {
        self.pending + self.running + self.done + self.failed
    }
}

/// Outcome of a guarded status change, decided inside the connection thread.
enum Transition {
    Applied(TaskStatus),
    Missing,
    Rejected(String),
}

/// The task queue. Cheap to clone; clones share the connection thread.
#[derive(Clone)]
pub struct TaskQueue {
    conn: tokio_rusqlite::Connection,
}

impl TaskQueue {
    pub fn new(db: &Database) -> Self {
        Self {
            conn: db.connection().clone(),
        }
    }

    /// Insert a task as pending and return its id.
    pub async fn push(&self, task: &Task) -> Result<String, SwitchyardError> {
        let task = task.clone();
        let attachments = serde_json::to_string(&task.attachments).map_err(|e| {
            SwitchyardError::Storage {
                source: Box::new(e),
            }
        })?;
        let id = task.id.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tasks (id, prompt, task_type, attachments, service, priority,
                                        status, created_at, attempts)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, 0)",
                    params![
                        task.id,
                        task.prompt,
                        task.task_type,
                        attachments,
                        task.service,
                        task.priority,
                        task.created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(task_id = %id, "task queued");
        Ok(id)
    }

    /// Claim the most urgent pending task, or `None` when the queue is idle.
    ///
    /// The claimed task comes back `running` with `attempts` already
    /// incremented.
    pub async fn pop(&self) -> Result<Option<Task>, SwitchyardError> {
        let claimed = self
            .conn
            .call(|conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let next: Option<i64> = tx
                    .query_row(
                        "SELECT seq FROM tasks WHERE status = 'pending'
                         ORDER BY priority ASC, created_at ASC, seq ASC LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .optional()?;

                let task = match next {
                    None => None,
                    Some(seq) => {
                        let updated = tx.execute(
                            "UPDATE tasks SET status = 'running', attempts = attempts + 1,
                                              started_at = ?1
                             WHERE seq = ?2 AND status = 'pending'",
                            params![epoch_now(), seq],
                        )?;
                        if updated == 1 {
                            let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE seq = ?1");
                            Some(tx.query_row(&sql, params![seq], task_from_row)?)
                        } else {
                            None
                        }
                    }
                };
                tx.commit()?;
                Ok(task)
            })
            .await
            .map_err(map_tr_err)?;

        if let Some(task) = &claimed {
            info!(
                task_id = %task.id,
                priority = task.priority,
                attempt = task.attempts,
                "task claimed"
            );
        }
        Ok(claimed)
    }

    /// Mark a running task done and store its result.
    pub async fn complete(&self, id: &str, result: &str) -> Result<(), SwitchyardError> {
        let task_id = id.to_string();
        let result = result.to_string();
        let transition = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let outcome = match current_status(&tx, &task_id)? {
                    None => Transition::Missing,
                    Some(status) if status == "running" => {
                        tx.execute(
                            "UPDATE tasks SET status = 'done', result = ?2
                             WHERE id = ?1 AND status = 'running'",
                            params![task_id, result],
                        )?;
                        Transition::Applied(TaskStatus::Done)
                    }
                    Some(status) => Transition::Rejected(status),
                };
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(map_tr_err)?;

        resolve(transition, id, "complete")?;
        info!(task_id = %id, "task completed");
        Ok(())
    }

    /// Record a failed attempt on a running task.
    ///
    /// Returns `Failed` once `attempts >= max_attempts`, otherwise the task is
    /// back in `Pending` with its original priority and creation time.
    pub async fn fail(
        &self,
        id: &str,
        max_attempts: u32,
        reason: &str,
    ) -> Result<TaskStatus, SwitchyardError> {
        let task_id = id.to_string();
        let last_error = reason.to_string();
        let transition = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let row: Option<(String, u32)> = tx
                    .query_row(
                        "SELECT status, attempts FROM tasks WHERE id = ?1",
                        params![task_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let outcome = match row {
                    None => Transition::Missing,
                    Some((status, attempts)) if status == "running" => {
                        let next = if attempts >= max_attempts {
                            TaskStatus::Failed
                        } else {
                            TaskStatus::Pending
                        };
                        tx.execute(
                            "UPDATE tasks SET status = ?2, last_error = ?3, started_at = NULL
                             WHERE id = ?1 AND status = 'running'",
                            params![task_id, next.to_string(), last_error],
                        )?;
                        Transition::Applied(next)
                    }
                    Some((status, _)) => Transition::Rejected(status),
                };
                tx.commit()?;
                Ok(outcome)
            })
            .await
            .map_err(map_tr_err)?;

        let status = resolve(transition, id, "fail")?;
        match status {
            TaskStatus::Failed => warn!(task_id = %id, reason, "task failed permanently"),
            _ => info!(task_id = %id, reason, "task returned to queue for retry"),
        }
        Ok(status)
    }

    /// Return running tasks claimed more than `max_age` ago to pending.
    ///
    /// Attempts are left as they are. Returns the number of tasks reclaimed.
    pub async fn reclaim_stale(&self, max_age: Duration) -> Result<usize, SwitchyardError> {
        let cutoff = epoch_now() - max_age.as_secs_f64();
        let reclaimed = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE tasks SET status = 'pending', started_at = NULL
                     WHERE status = 'running' AND (started_at IS NULL OR started_at < ?1)",
                    params![cutoff],
                )
            })
            .await
            .map_err(map_tr_err)?;
        if reclaimed > 0 {
            warn!(count = reclaimed, "reclaimed stale running tasks");
        }
        Ok(reclaimed)
    }

    /// Fetch a task by id.
    pub async fn get(&self, id: &str) -> Result<Option<Task>, SwitchyardError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
                conn.query_row(&sql, params![id], task_from_row).optional()
            })
            .await
            .map_err(map_tr_err)
    }

    /// List tasks in dispatch order, optionally filtered by status.
    pub async fn list(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<Task>, SwitchyardError> {
        let status = status.map(|s| s.to_string());
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE (?1 IS NULL OR status = ?1)
                     ORDER BY priority ASC, created_at ASC, seq ASC LIMIT ?2"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![status, limit], task_from_row)?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Count tasks per status.
    pub async fn stats(&self) -> Result<QueueStats, SwitchyardError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM tasks GROUP BY status")?;
                let mut rows = stmt.query([])?;
                let mut stats = QueueStats::default();
                while let Some(row) = rows.next()? {
                    let status: String = row.get(0)?;
                    let count = row.get::<_, i64>(1)?.max(0) as u64;
                    match status.as_str() {
                        "pending" => stats.pending = count,
                        "running" => stats.running = count,
                        "done" => stats.done = count,
                        "failed" => stats.failed = count,
                        _ => {}
                    }
                }
                Ok(stats)
            })
            .await
            .map_err(map_tr_err)
    }
}

fn current_status(
    tx: &rusqlite::Transaction<'_>,
    id: &str,
) -> Result<Option<String>, rusqlite::Error> {
    tx.query_row(
        "SELECT status FROM tasks WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

fn resolve(
    transition: Transition,
    id: &str,
    action: &'static str,
) -> Result<TaskStatus, SwitchyardError> {
    match transition {
        Transition::Applied(status) => Ok(status),
        Transition::Missing => Err(SwitchyardError::TaskNotFound(id.to_string())),
        Transition::Rejected(status) => Err(SwitchyardError::InvalidTransition {
            id: id.to_string(),
            status,
            action,
        }),
    }
}

fn task_from_row(row: &Row<'_>) -> Result<Task, rusqlite::Error> {
    let attachments: String = row.get(3)?;
    let attachments: Vec<String> = serde_json::from_str(&attachments)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let status: String = row.get(6)?;
    let status = TaskStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(Task {
        id: row.get(0)?,
        prompt: row.get(1)?,
        task_type: row.get(2)?,
        attachments,
        service: row.get(4)?,
        priority: row.get(5)?,
        status,
        result: row.get(7)?,
        created_at: row.get(8)?,
        attempts: row.get(9)?,
        last_error: row.get(10)?,
        started_at: row.get(11)?,
    })
}
