// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily budget enforcement.
//!
//! `check_budget()` is the enforcing gate called before a metered call: it
//! writes at most one `warn` and one `exceeded` event per date per rolling
//! hour and errors once the ceiling is reached. `budget_state()` is the
//! read-only view the router polls.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use switchyard_core::types::{epoch_now, today_utc};
use switchyard_core::{BudgetEvent, BudgetEventKind, BudgetState, SpendGate, SwitchyardError};
use switchyard_storage::map_tr_err;
use tracing::warn;

use crate::ledger::CostMonitor;
use crate::recording;

/// Window in which a repeated event of the same kind is suppressed.
pub const EVENT_DEDUP_SECS: f64 = 3600.0;

impl CostMonitor {
    /// Enforce the daily ceiling.
    ///
    /// Returns `BudgetExceeded` once today's spend reaches `daily_usd`. At or
    /// above `warn_at_usd` a warning is logged on every call, but the `warn`
    /// event row is only written once per hour.
    pub async fn check_budget(&self) -> Result<(), SwitchyardError> {
        let limit = self.budget.daily_usd;
        let warn_at = self.budget.warn_at_usd;
        let spent = self.today_spend().await?;
        recording::set_spend(spent, limit);

        if spent >= limit {
            self.log_event(BudgetEventKind::Exceeded, spent, limit).await?;
            return Err(SwitchyardError::BudgetExceeded { spent, limit });
        }

        if spent >= warn_at {
            let used_pct = if limit > 0.0 { spent / limit * 100.0 } else { 100.0 };
            warn!(
                spent_usd = spent,
                limit_usd = limit,
                used_pct = used_pct.round(),
                "budget warning: ${spent:.4} of ${limit:.2} spent"
            );
            self.log_event(BudgetEventKind::Warn, spent, limit).await?;
        }
        Ok(())
    }

    /// Where today's spend stands. Never writes.
    pub async fn budget_state(&self) -> Result<BudgetState, SwitchyardError> {
        let limit = self.budget.daily_usd;
        let spent = self.today_spend().await?;
        recording::set_spend(spent, limit);
        Ok(if spent >= limit {
            BudgetState::Exceeded { spent, limit }
        } else if spent >= self.budget.warn_at_usd {
            BudgetState::Warning { spent, limit }
        } else {
            BudgetState::Within { spent, limit }
        })
    }

    /// Write a budget event unless one of the same kind exists for today
    /// within the dedup window. Returns whether a row was written.
    async fn log_event(
        &self,
        kind: BudgetEventKind,
        spent: f64,
        limit: f64,
    ) -> Result<bool, SwitchyardError> {
        let date = today_utc();
        let event = kind.to_string();
        self.conn
            .call(move |conn| {
                let now = epoch_now();
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let recent: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM budget_events
                         WHERE date_utc = ?1 AND event = ?2 AND ts > ?3 LIMIT 1",
                        params![date, event, now - EVENT_DEDUP_SECS],
                        |row| row.get(0),
                    )
                    .optional()?;
                let written = if recent.is_none() {
                    tx.execute(
                        "INSERT INTO budget_events (ts, date_utc, event, spend_usd, limit_usd)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![now, date, event, spent, limit],
                    )?;
                    true
                } else {
                    false
                };
                tx.commit()?;
                Ok(written)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Budget events recorded for `date`, oldest first.
    pub async fn budget_events(&self, date: &str) -> Result<Vec<BudgetEvent>, SwitchyardError> {
        let date = date.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT ts, date_utc, event, spend_usd, limit_usd FROM budget_events
                     WHERE date_utc = ?1 ORDER BY ts ASC, id ASC",
                )?;
                let rows = stmt.query_map(params![date], |row| {
                    let event: String = row.get(2)?;
                    let kind = event.parse::<BudgetEventKind>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(BudgetEvent {
                        ts: row.get(0)?,
                        date: row.get(1)?,
                        kind,
                        spend_usd: row.get(3)?,
                        limit_usd: row.get(4)?,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }
}

#[async_trait]
impl SpendGate for CostMonitor {
    async fn budget_state(&self) -> Result<BudgetState, SwitchyardError> {
        CostMonitor::budget_state(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_config::model::BudgetConfig;
    use switchyard_core::ApiResult;
    use switchyard_storage::Database;
    use tracing_test::traced_test;

    async fn monitor(daily: f64, warn: f64) -> (CostMonitor, Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("budget.db").to_str().unwrap())
            .await
            .unwrap();
        let budget = BudgetConfig {
            daily_usd: daily,
            warn_at_usd: warn,
        };
        (CostMonitor::new(&db, &budget), db, dir)
    }

    async fn spend(monitor: &CostMonitor, cost: f64) {
        let result = ApiResult {
            text: String::new(),
            prompt_tokens: 10,
            completion_tokens: 10,
            total_tokens: 20,
            cost_usd: cost,
            provider: "deepseek".into(),
            model_id: "deepseek-chat".into(),
            alias: "deepseek-v3".into(),
            latency_s: 0.1,
        };
        monitor.record(&result, None, None, true).await.unwrap();
    }

    #[tokio::test]
    async fn under_warn_threshold_is_quiet() {
        let (monitor, _db, _dir) = monitor(5.0, 3.0).await;
        spend(&monitor, 1.0).await;
        monitor.check_budget().await.unwrap();
        assert!(monitor.budget_events(&today_utc()).await.unwrap().is_empty());
        assert!(matches!(
            monitor.budget_state().await.unwrap(),
            BudgetState::Within { .. }
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn warning_is_logged_once_per_hour() {
        let (monitor, _db, _dir) = monitor(5.0, 3.0).await;
        spend(&monitor, 3.5).await;

        monitor.check_budget().await.unwrap();
        monitor.check_budget().await.unwrap();
        monitor.check_budget().await.unwrap();

        let events = monitor.budget_events(&today_utc()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, BudgetEventKind::Warn);
        assert!((events[0].spend_usd - 3.5).abs() < 1e-10);
        assert!((events[0].limit_usd - 5.0).abs() < 1e-10);
        assert!(logs_contain("budget warning"));
    }

    #[tokio::test]
    async fn exceeding_the_ceiling_errors_with_amounts() {
        let (monitor, _db, _dir) = monitor(5.0, 3.0).await;
        spend(&monitor, 5.25).await;

        let err = monitor.check_budget().await.unwrap_err();
        match err {
            SwitchyardError::BudgetExceeded { spent, limit } => {
                assert!((spent - 5.25).abs() < 1e-10);
                assert!((limit - 5.0).abs() < 1e-10);
            }
            other => panic!("expected BudgetExceeded, got {other:?}"),
        }
        assert!(monitor.check_budget().await.is_err());

        let events = monitor.budget_events(&today_utc()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, BudgetEventKind::Exceeded);
        assert!(monitor.budget_state().await.unwrap().is_exceeded());
    }

    #[tokio::test]
    async fn event_older_than_an_hour_allows_another() {
        let (monitor, db, _dir) = monitor(5.0, 3.0).await;
        spend(&monitor, 3.5).await;

        let date = today_utc();
        let old_ts = epoch_now() - EVENT_DEDUP_SECS - 60.0;
        let insert_date = date.clone();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO budget_events (ts, date_utc, event, spend_usd, limit_usd)
                     VALUES (?1, ?2, 'warn', 3.1, 5.0)",
                    params![old_ts, insert_date],
                )
            })
            .await
            .unwrap();

        monitor.check_budget().await.unwrap();
        let events = monitor.budget_events(&date).await.unwrap();
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn budget_state_never_writes_events() {
        let (monitor, _db, _dir) = monitor(5.0, 3.0).await;
        spend(&monitor, 6.0).await;
        for _ in 0..3 {
            assert!(monitor.budget_state().await.unwrap().is_exceeded());
        }
        assert!(monitor.budget_events(&today_utc()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn warn_and_exceeded_are_tracked_separately() {
        let (monitor, _db, _dir) = monitor(5.0, 3.0).await;
        spend(&monitor, 3.5).await;
        monitor.check_budget().await.unwrap();
        spend(&monitor, 2.0).await;
        assert!(monitor.check_budget().await.is_err());

        let kinds: Vec<_> = monitor
            .budget_events(&today_utc())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![BudgetEventKind::Warn, BudgetEventKind::Exceeded]);
    }
}
