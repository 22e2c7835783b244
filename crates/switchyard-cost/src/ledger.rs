// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only usage ledger for metered API calls.
//!
//! Every call, successful or not, becomes one `api_calls` row keyed by its
//! UTC date. Only `ok` rows count towards spend.

use rusqlite::params;
use switchyard_config::model::BudgetConfig;
use switchyard_core::types::{epoch_now, today_utc};
use switchyard_core::{ApiResult, SwitchyardError, UsageRecord};
use switchyard_storage::{Database, map_tr_err};
use tracing::debug;

use crate::recording;

/// Ledger plus budget enforcement over the shared database.
#[derive(Clone)]
pub struct CostMonitor {
    pub(crate) conn: tokio_rusqlite::Connection,
    pub(crate) budget: BudgetConfig,
}

impl CostMonitor {
    pub fn new(db: &Database, budget: &BudgetConfig) -> Self {
        Self {
            conn: db.connection().clone(),
            budget: budget.clone(),
        }
    }

    /// Book a completed API call.
    pub async fn record(
        &self,
        result: &ApiResult,
        task_type: Option<&str>,
        task_id: Option<&str>,
        ok: bool,
    ) -> Result<(), SwitchyardError> {
        let usage = UsageRecord {
            ts: epoch_now(),
            date: today_utc(),
            alias: result.alias.clone(),
            provider: result.provider.clone(),
            model_id: result.model_id.clone(),
            prompt_tokens: result.prompt_tokens,
            completion_tokens: result.completion_tokens,
            total_tokens: result.total_tokens,
            cost_usd: result.cost_usd,
            latency_s: result.latency_s,
            task_type: task_type.map(str::to_string),
            task_id: task_id.map(str::to_string),
            ok,
        };
        self.insert(&usage).await?;

        recording::record_call(&usage.alias, ok);
        recording::record_tokens(&usage.alias, usage.prompt_tokens, usage.completion_tokens);
        recording::record_latency(&usage.alias, usage.latency_s);
        debug!(
            alias = %usage.alias,
            cost_usd = usage.cost_usd,
            total_tokens = usage.total_tokens,
            "cost recorded"
        );
        Ok(())
    }

    /// Book a failed call: zero tokens, zero cost, `ok = false`.
    pub async fn record_error(
        &self,
        alias: &str,
        provider: &str,
        model_id: &str,
        task_type: Option<&str>,
        task_id: Option<&str>,
    ) -> Result<(), SwitchyardError> {
        let usage = UsageRecord {
            ts: epoch_now(),
            date: today_utc(),
            alias: alias.to_string(),
            provider: provider.to_string(),
            model_id: model_id.to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            latency_s: 0.0,
            task_type: task_type.map(str::to_string),
            task_id: task_id.map(str::to_string),
            ok: false,
        };
        self.insert(&usage).await?;
        recording::record_call(alias, false);
        debug!(alias, provider, "failed call recorded");
        Ok(())
    }

    /// Insert a fully specified ledger row.
    pub async fn insert(&self, usage: &UsageRecord) -> Result<(), SwitchyardError> {
        let usage = usage.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO api_calls
                       (ts, date_utc, alias, provider, model_id,
                        prompt_tokens, completion_tokens, total_tokens,
                        cost_usd, latency_s, task_type, task_id, ok)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    params![
                        usage.ts,
                        usage.date,
                        usage.alias,
                        usage.provider,
                        usage.model_id,
                        usage.prompt_tokens,
                        usage.completion_tokens,
                        usage.total_tokens,
                        usage.cost_usd,
                        usage.latency_s,
                        usage.task_type,
                        usage.task_id,
                        usage.ok,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Spend booked for the current UTC day.
    pub async fn today_spend(&self) -> Result<f64, SwitchyardError> {
        self.spend_for_date(&today_utc()).await
    }

    /// Sum of `cost_usd` over successful calls on `date` (`YYYY-MM-DD`).
    pub async fn spend_for_date(&self, date: &str) -> Result<f64, SwitchyardError> {
        let date = date.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT COALESCE(SUM(cost_usd), 0.0) FROM api_calls
                     WHERE date_utc = ?1 AND ok = 1",
                    params![date],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn monitor(daily: f64, warn: f64) -> (CostMonitor, Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("cost.db").to_str().unwrap())
            .await
            .unwrap();
        let budget = BudgetConfig {
            daily_usd: daily,
            warn_at_usd: warn,
        };
        (CostMonitor::new(&db, &budget), db, dir)
    }

    fn result(alias: &str, cost: f64) -> ApiResult {
        ApiResult {
            text: "ok".into(),
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
            cost_usd: cost,
            provider: "dashscope".into(),
            model_id: "qwen-plus".into(),
            alias: alias.into(),
            latency_s: 0.5,
        }
    }

    #[tokio::test]
    async fn spend_sums_successful_calls() {
        let (monitor, _db, _dir) = monitor(5.0, 3.0).await;
        monitor.record(&result("qwen-plus", 0.25), Some("code"), Some("t1"), true).await.unwrap();
        monitor.record(&result("qwen-plus", 0.5), None, None, true).await.unwrap();
        monitor.record(&result("qwen-plus", 9.0), None, None, false).await.unwrap();
        monitor
            .record_error("deepseek-v3", "deepseek", "deepseek-chat", Some("code"), Some("t1"))
            .await
            .unwrap();

        let spent = monitor.today_spend().await.unwrap();
        assert!((spent - 0.75).abs() < 1e-10);
    }

    #[tokio::test]
    async fn fresh_date_has_zero_spend() {
        let (monitor, _db, _dir) = monitor(5.0, 3.0).await;
        monitor.record(&result("qwen-plus", 1.0), None, None, true).await.unwrap();
        assert_eq!(monitor.spend_for_date("1999-01-01").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn error_rows_keep_task_linkage() {
        let (monitor, db, _dir) = monitor(5.0, 3.0).await;
        monitor
            .record_error("deepseek-v3", "deepseek", "deepseek-chat", Some("code"), Some("t9"))
            .await
            .unwrap();

        let (task_id, ok, cost): (Option<String>, bool, f64) = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT task_id, ok, cost_usd FROM api_calls",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
            })
            .await
            .unwrap();
        assert_eq!(task_id.as_deref(), Some("t9"));
        assert!(!ok);
        assert_eq!(cost, 0.0);
    }
}
