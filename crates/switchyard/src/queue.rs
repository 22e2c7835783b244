// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchyard queue` command implementations.

use std::str::FromStr;

use switchyard_config::SwitchyardConfig;
use switchyard_core::{SwitchyardError, Task, TaskStatus};

use crate::app::App;

const PROMPT_PREVIEW_CHARS: usize = 48;

pub async fn run_stats(config: &SwitchyardConfig) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = app.queue.stats().await;
    let stats = app.finish(outcome).await?;
    println!("pending  {}", stats.pending);
    println!("running  {}", stats.running);
    println!("done     {}", stats.done);
    println!("failed   {}", stats.failed);
    println!("total    {}", stats.total());
    Ok(())
}

/// Print one task as JSON.
pub async fn run_get(config: &SwitchyardConfig, id: &str) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = app
        .queue
        .get(id)
        .await
        .and_then(|task| task.ok_or_else(|| SwitchyardError::TaskNotFound(id.to_string())));
    let task = app.finish(outcome).await?;
    let json = serde_json::to_string_pretty(&task)
        .map_err(|e| SwitchyardError::Internal(format!("cannot serialize task: {e}")))?;
    println!("{json}");
    Ok(())
}

pub async fn run_list(
    config: &SwitchyardConfig,
    status: Option<&str>,
    limit: usize,
) -> Result<(), SwitchyardError> {
    let status = status.map(parse_status).transpose()?;
    let app = App::open(config).await?;
    let outcome = app.queue.list(status, limit).await;
    let tasks = app.finish(outcome).await?;
    if tasks.is_empty() {
        println!("no tasks");
    }
    for task in &tasks {
        println!("{}", format_row(task));
    }
    Ok(())
}

fn parse_status(value: &str) -> Result<TaskStatus, SwitchyardError> {
    TaskStatus::from_str(&value.to_lowercase()).map_err(|_| {
        SwitchyardError::Config(format!(
            "unknown task status `{value}` (expected pending, running, done or failed)"
        ))
    })
}

fn format_row(task: &Task) -> String {
    let mut preview: String = task.prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
    if task.prompt.chars().count() > PROMPT_PREVIEW_CHARS {
        preview.push_str("...");
    }
    let preview = preview.replace('\n', " ");
    format!(
        "{}  p{}  {:<8} {:<20} x{}  {preview}",
        task.id,
        task.priority,
        task.status.to_string(),
        task.task_type,
        task.attempts
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(parse_status("Pending").unwrap(), TaskStatus::Pending);
        assert_eq!(parse_status("failed").unwrap(), TaskStatus::Failed);
        assert!(parse_status("stuck").is_err());
    }

    #[test]
    fn long_prompts_are_truncated() {
        let task = Task::new("x".repeat(100)).with_priority(2);
        let row = format_row(&task);
        assert!(row.contains(&format!("{}...", "x".repeat(PROMPT_PREVIEW_CHARS))));
        assert!(row.contains(" p2 "));
        assert!(row.contains("pending"));
    }

    #[test]
    fn newlines_are_flattened() {
        let task = Task::new("line one\nline two");
        assert!(format_row(&task).ends_with("line one line two"));
    }
}
