// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchyard costs` command implementation.
//!
//! Shows today's API spend against the daily budget, a per-provider
//! breakdown, and a short history. `--json` emits the same data for
//! scripting.

use std::io::IsTerminal;

use serde::Serialize;
use switchyard_config::SwitchyardConfig;
use switchyard_core::types::today_utc;
use switchyard_core::{BudgetEvent, SwitchyardError};
use switchyard_cost::{DailySpend, DayStats};

use crate::app::App;

const BAR_WIDTH: usize = 20;

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct CostReport {
    pub today: DayStats,
    pub warn_at_usd: f64,
    pub events: Vec<BudgetEvent>,
    pub history: Vec<DailySpend>,
}

/// Run the `switchyard costs` command.
pub async fn run_costs(
    config: &SwitchyardConfig,
    days: usize,
    json: bool,
    plain: bool,
) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = build_report(config, &app, days).await;
    let report = app.finish(outcome).await?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| SwitchyardError::Internal(format!("cannot serialize report: {e}")))?;
        println!("{out}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_report(&report, use_color);
    }
    Ok(())
}

async fn build_report(
    config: &SwitchyardConfig,
    app: &App,
    days: usize,
) -> Result<CostReport, SwitchyardError> {
    Ok(CostReport {
        today: app.cost.today_stats().await?,
        warn_at_usd: config.budget.warn_at_usd,
        events: app.cost.budget_events(&today_utc()).await?,
        history: app.cost.last_n_days(days).await?,
    })
}

fn print_report(report: &CostReport, use_color: bool) {
    let s = &report.today;

    println!();
    println!("  switchyard costs ({} UTC)", s.date);
    println!("  {}", "-".repeat(40));
    println!("    Calls:    {:>6}  (errors: {})", s.total_calls, s.total_errors);
    println!("    Tokens:   {:>10}", s.total_tokens);
    println!(
        "    Spend:    {}",
        spend_line(s.cost_usd, report.warn_at_usd, s.budget_usd, use_color)
    );
    println!(
        "    Budget:   [{}] {:.0}%",
        budget_bar(s.budget_used_pct),
        s.budget_used_pct
    );
    println!("    Latency:  {:.2} s avg", s.avg_latency_s);

    if !s.by_provider.is_empty() {
        println!();
        println!("    by provider");
        for p in &s.by_provider {
            println!(
                "      {:<12} {:>4} calls {:>10} tk  ${:.4}",
                p.key, p.calls, p.tokens, p.cost_usd
            );
        }
    }

    for event in &report.events {
        println!(
            "    {} budget {} at ${:.4}",
            utc_clock(event.ts),
            event.kind,
            event.spend_usd
        );
    }

    if report.history.len() > 1 {
        println!();
        println!("    last {} days", report.history.len());
        for day in &report.history {
            println!(
                "      {}  {:>4} calls  ${:.4}",
                day.date, day.calls, day.cost_usd
            );
        }
    }
    println!();
}

/// `$spent / $limit`, colored by threshold.
fn spend_line(spent: f64, warn_at: f64, limit: f64, use_color: bool) -> String {
    let text = format!("${spent:.4} / ${limit:.2}");
    if spent >= limit && limit > 0.0 {
        if use_color {
            use colored::Colorize;
            format!("{} {}", "✗".red(), text.red())
        } else {
            format!("[OVER] {text}")
        }
    } else if spent >= warn_at && warn_at > 0.0 {
        if use_color {
            use colored::Colorize;
            format!("{} {}", "!".yellow(), text.yellow())
        } else {
            format!("[WARN] {text}")
        }
    } else if use_color {
        use colored::Colorize;
        format!("{} {text}", "✓".green())
    } else {
        format!("[OK]   {text}")
    }
}

/// Fixed-width bar; one cell per 5%.
fn budget_bar(pct: f64) -> String {
    let filled = ((pct / 5.0).floor().max(0.0) as usize).min(BAR_WIDTH);
    format!("{}{}", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// `HH:MM` of an epoch timestamp, UTC.
fn utc_clock(ts: f64) -> String {
    let secs_of_day = (ts.max(0.0) as u64) % 86_400;
    format!("{:02}:{:02}", secs_of_day / 3600, (secs_of_day % 3600) / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_per_five_percent() {
        assert_eq!(budget_bar(0.0), ".".repeat(20));
        assert_eq!(budget_bar(50.0), format!("{}{}", "#".repeat(10), ".".repeat(10)));
        assert_eq!(budget_bar(250.0), "#".repeat(20));
    }

    #[test]
    fn plain_spend_line_thresholds() {
        assert!(spend_line(0.5, 4.0, 5.0, false).starts_with("[OK]"));
        assert!(spend_line(4.0, 4.0, 5.0, false).starts_with("[WARN]"));
        assert!(spend_line(5.0, 4.0, 5.0, false).starts_with("[OVER]"));
        assert!(spend_line(0.0, 0.0, 0.0, false).starts_with("[OK]"));
    }

    #[test]
    fn event_time_is_utc_clock() {
        // 2024-01-01T13:45:10Z
        assert_eq!(utc_clock(1_704_116_710.0), "13:45");
    }
}
