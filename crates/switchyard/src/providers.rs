// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchyard providers` command implementation.

use std::io::IsTerminal;

use switchyard_config::SwitchyardConfig;
use switchyard_core::SwitchyardError;
use switchyard_router::AliasStatus;

use crate::app::App;

/// Run the `switchyard providers` command.
///
/// Lists every alias with its provider, model, tier and prices, marking
/// aliases whose API key is missing together with the variable to export.
pub async fn run_providers(
    config: &SwitchyardConfig,
    json: bool,
    plain: bool,
) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = app
        .orchestrator(config)
        .map(|orchestrator| orchestrator.router().status_report());
    let report = app.finish(outcome).await?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| SwitchyardError::Internal(format!("cannot serialize report: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    println!();
    println!("  switchyard providers");
    println!("  {}", "-".repeat(60));
    for status in &report {
        println!("{}", format_line(status, use_color));
    }

    let missing: Vec<&AliasStatus> = report.iter().filter(|s| !s.key_set).collect();
    if !missing.is_empty() {
        println!();
        println!("  Missing keys (these aliases fall back to web):");
        let mut envs: Vec<&str> = missing.iter().map(|s| s.env_var.as_str()).collect();
        envs.sort_unstable();
        envs.dedup();
        for env in envs {
            println!("    export {env}=...");
        }
    }
    println!();
    Ok(())
}

fn format_line(status: &AliasStatus, use_color: bool) -> String {
    let symbol = match (status.key_set, use_color) {
        (true, true) => {
            use colored::Colorize;
            "✓".green().to_string()
        }
        (false, true) => {
            use colored::Colorize;
            "✗".red().to_string()
        }
        (true, false) => "[OK]  ".to_string(),
        (false, false) => "[NOKEY]".to_string(),
    };
    format!(
        "    {symbol} {:<18} {:<12} {:<28} {:<8} ${:.2}/${:.2} per 1M",
        status.alias,
        status.provider,
        status.model_id,
        status.tier,
        status.price_input_per_1m,
        status.price_output_per_1m
    )
}
