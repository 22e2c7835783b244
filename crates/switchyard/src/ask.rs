// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchyard ask`, `route` and `submit` command implementations.

use std::collections::HashSet;
use std::io::{IsTerminal, Read};

use serde::Serialize;
use switchyard_config::{ProviderRegistry, SwitchyardConfig};
use switchyard_core::{ApiResult, SwitchyardError, Task};
use switchyard_openai::{ApiAdapter, DEFAULT_TEMPERATURE};
use switchyard_router::{RoutePath, RoutingDecision, RoutingOverride};
use tracing::info;

use crate::app::App;

/// Parsed `ask` invocation.
pub struct AskRequest {
    pub prompt: String,
    pub attachments: Vec<String>,
    pub routing_override: RoutingOverride,
    pub alias: Option<String>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub json: bool,
}

/// Structured `ask --json` output.
#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    text: &'a str,
    task_type: &'a str,
    route: &'static str,
    target: &'a str,
    reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<&'a ApiResult>,
}

pub fn routing_override(force_api: bool, force_web: bool) -> RoutingOverride {
    match (force_api, force_web) {
        (true, _) => RoutingOverride::ForceApi,
        (_, true) => RoutingOverride::ForceWeb,
        _ => RoutingOverride::Auto,
    }
}

/// Join positional words, or read stdin when there are none.
pub fn read_prompt(words: &[String]) -> Result<String, SwitchyardError> {
    let prompt = if words.is_empty() {
        let stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Err(SwitchyardError::Config(
                "no prompt given (pass it as arguments or pipe it on stdin)".to_string(),
            ));
        }
        let mut buf = String::new();
        stdin
            .lock()
            .read_to_string(&mut buf)
            .map_err(|e| SwitchyardError::Internal(format!("cannot read stdin: {e}")))?;
        buf
    } else {
        words.join(" ")
    };
    normalize_prompt(&prompt)
}

fn normalize_prompt(prompt: &str) -> Result<String, SwitchyardError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(SwitchyardError::Config("empty prompt".to_string()));
    }
    Ok(prompt.to_string())
}

/// Run the `switchyard ask` command.
pub async fn run_ask(config: &SwitchyardConfig, request: AskRequest) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = ask(config, &app, &request).await;
    app.finish(outcome).await
}

async fn ask(config: &SwitchyardConfig, app: &App, request: &AskRequest) -> Result<(), SwitchyardError> {
    let orchestrator = app.orchestrator(config)?;

    let (text, decision, usage) = match &request.alias {
        Some(alias) => {
            let task_type = orchestrator
                .router()
                .classifier()
                .classify(&request.prompt, &request.attachments);
            let result = ask_alias(config, app, alias, &task_type, request).await?;
            let decision = RoutingDecision {
                task_type,
                path: RoutePath::Api {
                    alias: alias.clone(),
                    fallback_alias: None,
                },
                reason: "alias requested".to_string(),
            };
            (result.text.clone(), decision, Some(result))
        }
        None => {
            let execution = orchestrator
                .execute(
                    &request.prompt,
                    &request.attachments,
                    request.routing_override,
                    None,
                )
                .await;
            orchestrator.shutdown().await;
            let execution = execution?;
            (execution.text, execution.decision, execution.usage)
        }
    };

    if request.json {
        let (route, target) = describe_path(&decision.path);
        let output = AskOutput {
            text: &text,
            task_type: &decision.task_type,
            route,
            target,
            reason: &decision.reason,
            usage: usage.as_ref(),
        };
        println!("{}", to_json(&output)?);
    } else {
        println!("{text}");
    }
    Ok(())
}

/// Call one alias directly and book the result.
async fn ask_alias(
    config: &SwitchyardConfig,
    app: &App,
    alias: &str,
    task_type: &str,
    request: &AskRequest,
) -> Result<ApiResult, SwitchyardError> {
    let registry = ProviderRegistry::from_config(config);
    let mut adapter = ApiAdapter::from_alias(&registry, alias, app.credentials.clone())?;
    if let Some(system) = &request.system {
        adapter = adapter.with_system_prompt(system.clone());
    }

    app.cost.check_budget().await?;
    match adapter
        .ask(&request.prompt, &[], request.max_tokens, DEFAULT_TEMPERATURE)
        .await
    {
        Ok(result) => {
            app.cost.record(&result, Some(task_type), None, true).await?;
            Ok(result)
        }
        Err(e @ SwitchyardError::Config(_)) => Err(e),
        Err(e) => {
            app.cost
                .record_error(
                    adapter.alias(),
                    adapter.provider_name(),
                    adapter.model_id(),
                    Some(task_type),
                    None,
                )
                .await?;
            Err(e)
        }
    }
}

/// Run the `switchyard route` command: print the decision only.
pub async fn run_route(
    config: &SwitchyardConfig,
    prompt: &str,
    attachments: &[String],
    web: &[String],
    routing_override: RoutingOverride,
) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = match app.orchestrator(config) {
        Ok(orchestrator) => {
            let available: HashSet<String> = web.iter().cloned().collect();
            let decision = orchestrator
                .router()
                .decide(prompt, attachments, Some(&available), routing_override)
                .await;
            println!("{}", format_decision(&decision));
            Ok(())
        }
        Err(e) => Err(e),
    };
    app.finish(outcome).await
}

/// Run the `switchyard submit` command.
pub async fn run_submit(
    config: &SwitchyardConfig,
    prompt: String,
    priority: i64,
    attachments: Vec<String>,
    service: Option<String>,
) -> Result<(), SwitchyardError> {
    let app = App::open(config).await?;
    let outcome = submit(config, &app, prompt, priority, attachments, service).await;
    app.finish(outcome).await
}

async fn submit(
    config: &SwitchyardConfig,
    app: &App,
    prompt: String,
    priority: i64,
    attachments: Vec<String>,
    service: Option<String>,
) -> Result<(), SwitchyardError> {
    let orchestrator = app.orchestrator(config)?;
    let task_type = orchestrator.router().classifier().classify(&prompt, &attachments);

    let mut task = Task::new(prompt)
        .with_priority(priority)
        .with_attachments(attachments)
        .with_task_type(task_type);
    if let Some(service) = service {
        task = task.with_service(service);
    }

    let id = app.queue.push(&task).await?;
    info!(task_id = %id, priority, "task submitted");
    println!("{id}");
    Ok(())
}

fn describe_path(path: &RoutePath) -> (&'static str, &str) {
    match path {
        RoutePath::Api { alias, .. } => ("api", alias),
        RoutePath::Web { service } => ("web", service),
    }
}

/// One-line decision summary, e.g. `API  [qwen-plus] [general_qa] ...`.
fn format_decision(decision: &RoutingDecision) -> String {
    let target = match &decision.path {
        RoutePath::Api {
            alias,
            fallback_alias: Some(fallback),
        } => format!("API  [{alias} -> {fallback}]"),
        RoutePath::Api { alias, .. } => format!("API  [{alias}]"),
        RoutePath::Web { service } => format!("WEB  [{service}]"),
    };
    format!(
        "{target} [{}]\n     reason: {}",
        decision.task_type, decision.reason
    )
}

fn to_json<T: Serialize>(value: &T) -> Result<String, SwitchyardError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| SwitchyardError::Internal(format!("cannot serialize output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_from_flags() {
        assert_eq!(routing_override(false, false), RoutingOverride::Auto);
        assert_eq!(routing_override(true, false), RoutingOverride::ForceApi);
        assert_eq!(routing_override(false, true), RoutingOverride::ForceWeb);
    }

    #[test]
    fn prompt_is_trimmed_and_must_not_be_blank() {
        assert_eq!(normalize_prompt("  hi there \n").unwrap(), "hi there");
        assert!(matches!(
            normalize_prompt(" \n\t"),
            Err(SwitchyardError::Config(_))
        ));
    }

    #[test]
    fn words_are_joined() {
        let words = vec!["what".to_string(), "is".to_string(), "rust".to_string()];
        assert_eq!(read_prompt(&words).unwrap(), "what is rust");
    }

    #[test]
    fn api_decision_shows_fallback() {
        let decision = RoutingDecision {
            task_type: "coding".to_string(),
            path: RoutePath::Api {
                alias: "qwen-coder".to_string(),
                fallback_alias: Some("deepseek".to_string()),
            },
            reason: "api alias chosen".to_string(),
        };
        let line = format_decision(&decision);
        assert!(line.starts_with("API  [qwen-coder -> deepseek] [coding]"));
        assert!(line.contains("reason: api alias chosen"));
    }

    #[test]
    fn web_decision_names_service() {
        let decision = RoutingDecision {
            task_type: "pdf_analysis".to_string(),
            path: RoutePath::Web {
                service: "claude".to_string(),
            },
            reason: "web-only".to_string(),
        };
        assert!(format_decision(&decision).starts_with("WEB  [claude] [pdf_analysis]"));
        assert_eq!(describe_path(&decision.path), ("web", "claude"));
    }

    #[test]
    fn json_output_omits_missing_usage() {
        let output = AskOutput {
            text: "hi",
            task_type: "general_qa",
            route: "web",
            target: "claude",
            reason: "force_web",
            usage: None,
        };
        let json = to_json(&output).unwrap();
        assert!(json.contains("\"route\": \"web\""));
        assert!(!json.contains("usage"));
    }
}
