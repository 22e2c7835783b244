// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only aggregations over the usage ledger.

use rusqlite::params;
use serde::Serialize;
use switchyard_core::types::today_utc;
use switchyard_core::{SwitchyardError, UsageRecord};
use switchyard_storage::map_tr_err;

use crate::ledger::CostMonitor;

/// Spend grouped by one key (provider or alias).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendBreakdown {
    pub key: String,
    pub calls: u64,
    pub tokens: u64,
    pub cost_usd: f64,
}

/// Totals for one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayStats {
    pub date: String,
    /// Successful calls only.
    pub total_calls: u64,
    pub total_errors: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub budget_usd: f64,
    /// Rounded to one decimal. Zero when the budget is zero.
    pub budget_used_pct: f64,
    /// Seconds, rounded to milliseconds.
    pub avg_latency_s: f64,
    pub by_provider: Vec<SpendBreakdown>,
    pub by_alias: Vec<SpendBreakdown>,
}

/// One row of the multi-day history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySpend {
    pub date: String,
    pub calls: u64,
    pub tokens: u64,
    pub cost_usd: f64,
}

impl CostMonitor {
    pub async fn today_stats(&self) -> Result<DayStats, SwitchyardError> {
        self.stats_for_date(&today_utc()).await
    }

    pub async fn stats_for_date(&self, date: &str) -> Result<DayStats, SwitchyardError> {
        let date = date.to_string();
        let budget_usd = self.budget.daily_usd;
        self.conn
            .call(move |conn| {
                let (calls, pt, ct, tt, cost, avg_latency): (i64, i64, i64, i64, f64, f64) = conn
                    .query_row(
                        "SELECT COUNT(*), COALESCE(SUM(prompt_tokens), 0),
                                COALESCE(SUM(completion_tokens), 0),
                                COALESCE(SUM(total_tokens), 0),
                                COALESCE(SUM(cost_usd), 0.0),
                                COALESCE(AVG(latency_s), 0.0)
                         FROM api_calls WHERE date_utc = ?1 AND ok = 1",
                        params![date],
                        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)),
                    )?;
                let errors: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM api_calls WHERE date_utc = ?1 AND ok = 0",
                    params![date],
                    |r| r.get(0),
                )?;
                let by_provider = breakdown(conn, "provider", &date)?;
                let by_alias = breakdown(conn, "alias", &date)?;

                let budget_used_pct = if budget_usd > 0.0 {
                    (cost / budget_usd * 1000.0).round() / 10.0
                } else {
                    0.0
                };
                Ok(DayStats {
                    date,
                    total_calls: to_u64(calls),
                    total_errors: to_u64(errors),
                    prompt_tokens: to_u64(pt),
                    completion_tokens: to_u64(ct),
                    total_tokens: to_u64(tt),
                    cost_usd: cost,
                    budget_usd,
                    budget_used_pct,
                    avg_latency_s: (avg_latency * 1000.0).round() / 1000.0,
                    by_provider,
                    by_alias,
                })
            })
            .await
            .map_err(map_tr_err)
    }

    /// Most recent `n` ledger rows for today, newest first, failures included.
    pub async fn recent_calls(&self, n: usize) -> Result<Vec<UsageRecord>, SwitchyardError> {
        let date = today_utc();
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT ts, date_utc, alias, provider, model_id, prompt_tokens,
                            completion_tokens, total_tokens, cost_usd, latency_s,
                            task_type, task_id, ok
                     FROM api_calls WHERE date_utc = ?1
                     ORDER BY ts DESC, id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![date, limit], |r| {
                    Ok(UsageRecord {
                        ts: r.get(0)?,
                        date: r.get(1)?,
                        alias: r.get(2)?,
                        provider: r.get(3)?,
                        model_id: r.get(4)?,
                        prompt_tokens: r.get(5)?,
                        completion_tokens: r.get(6)?,
                        total_tokens: r.get(7)?,
                        cost_usd: r.get(8)?,
                        latency_s: r.get(9)?,
                        task_type: r.get(10)?,
                        task_id: r.get(11)?,
                        ok: r.get(12)?,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Successful spend per day for the `n` most recent days with activity.
    pub async fn last_n_days(&self, n: usize) -> Result<Vec<DailySpend>, SwitchyardError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT date_utc, COUNT(*), COALESCE(SUM(total_tokens), 0),
                            COALESCE(SUM(cost_usd), 0.0)
                     FROM api_calls WHERE ok = 1
                     GROUP BY date_utc ORDER BY date_utc DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], |r| {
                    Ok(DailySpend {
                        date: r.get(0)?,
                        calls: to_u64(r.get(1)?),
                        tokens: to_u64(r.get(2)?),
                        cost_usd: r.get(3)?,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }
}

fn breakdown(
    conn: &rusqlite::Connection,
    column: &str,
    date: &str,
) -> Result<Vec<SpendBreakdown>, rusqlite::Error> {
    // `column` is one of two fixed identifiers, never user input.
    let sql = format!(
        "SELECT {column}, COUNT(*), COALESCE(SUM(total_tokens), 0), COALESCE(SUM(cost_usd), 0.0)
         FROM api_calls WHERE date_utc = ?1 AND ok = 1
         GROUP BY {column} ORDER BY 4 DESC, 1 ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![date], |r| {
        Ok(SpendBreakdown {
            key: r.get(0)?,
            calls: to_u64(r.get(1)?),
            tokens: to_u64(r.get(2)?),
            cost_usd: r.get(3)?,
        })
    })?;
    rows.collect()
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
