// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric recording helpers.
//!
//! Uses the metrics-rs facade. Nothing is exported unless the host process
//! installs a recorder.

pub fn record_call(alias: &str, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    metrics::counter!(
        "switchyard_api_calls_total",
        "alias" => alias.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_tokens(alias: &str, prompt: u32, completion: u32) {
    metrics::counter!("switchyard_tokens_total", "alias" => alias.to_string(), "type" => "prompt")
        .increment(u64::from(prompt));
    metrics::counter!("switchyard_tokens_total", "alias" => alias.to_string(), "type" => "completion")
        .increment(u64::from(completion));
}

pub fn record_latency(alias: &str, seconds: f64) {
    metrics::histogram!("switchyard_api_latency_seconds", "alias" => alias.to_string())
        .record(seconds);
}

/// Publish today's spend and the remaining headroom.
pub fn set_spend(spent: f64, limit: f64) {
    metrics::gauge!("switchyard_spend_today_usd").set(spent);
    metrics::gauge!("switchyard_budget_remaining_usd").set((limit - spent).max(0.0));
}
