// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switchyard - a personal multi-provider LLM task orchestrator.
//!
//! This is the binary entry point: prompt routing, the task queue, the
//! background worker, and spend reporting.

mod app;
mod ask;
mod costs;
mod providers;
mod queue;
mod work;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use switchyard_config::SwitchyardConfig;
use switchyard_core::SwitchyardError;

/// Switchyard - a personal multi-provider LLM task orchestrator.
#[derive(Parser, Debug)]
#[command(name = "switchyard", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Route and execute a prompt now.
    Ask(AskArgs),
    /// Show the routing decision for a prompt without executing it.
    Route(RouteArgs),
    /// Enqueue a prompt for the worker.
    Submit(SubmitArgs),
    /// Drain the task queue.
    Worker {
        /// Process at most one task, then exit.
        #[arg(long)]
        once: bool,
    },
    /// Inspect the task queue.
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Report API spend against the daily budget.
    Costs {
        /// Number of days in the history table.
        #[arg(long, default_value_t = 7)]
        days: usize,
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// List API aliases and whether their keys are set.
    Providers {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        plain: bool,
    },
    /// Manage Switchyard configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by `ask` and `route`.
#[derive(Args, Debug)]
struct PromptArgs {
    /// Prompt text. Read from stdin when omitted.
    prompt: Vec<String>,
    /// Attachment file names; their extensions steer classification.
    #[arg(long = "attach", value_name = "FILE")]
    attachments: Vec<String>,
    /// Skip the web-only, missing-rule and strategy checks.
    #[arg(long, conflicts_with = "force_web")]
    force_api: bool,
    /// Always route to a web session.
    #[arg(long)]
    force_web: bool,
}

#[derive(Args, Debug)]
struct AskArgs {
    #[command(flatten)]
    prompt: PromptArgs,
    /// Call this API alias directly, bypassing routing.
    #[arg(long, conflicts_with_all = ["force_api", "force_web"])]
    alias: Option<String>,
    /// System prompt for a direct alias call.
    #[arg(long, requires = "alias")]
    system: Option<String>,
    /// Output token cap for a direct alias call.
    #[arg(long, requires = "alias")]
    max_tokens: Option<u32>,
    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct RouteArgs {
    #[command(flatten)]
    prompt: PromptArgs,
    /// Web services to treat as available. All are assumed when omitted.
    #[arg(long = "web", value_name = "SERVICE")]
    web: Vec<String>,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Prompt text. Read from stdin when omitted.
    prompt: Vec<String>,
    /// Lower is more urgent.
    #[arg(long, default_value_t = 5)]
    priority: i64,
    #[arg(long = "attach", value_name = "FILE")]
    attachments: Vec<String>,
    /// Pin the task to a web service.
    #[arg(long)]
    service: Option<String>,
}

#[derive(Subcommand, Debug)]
enum QueueAction {
    /// Count tasks per status.
    Stats,
    /// Show one task.
    Get { id: String },
    /// List tasks in dispatch order.
    List {
        /// pending, running, done or failed.
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate the configuration, then summarize it.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => switchyard_config::load_and_validate_path(path),
        None => switchyard_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            switchyard_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.general.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("switchyard: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: SwitchyardConfig) -> Result<(), SwitchyardError> {
    match command {
        Some(Commands::Ask(args)) => {
            let prompt = ask::read_prompt(&args.prompt.prompt)?;
            let request = ask::AskRequest {
                prompt,
                attachments: args.prompt.attachments,
                routing_override: ask::routing_override(args.prompt.force_api, args.prompt.force_web),
                alias: args.alias,
                system: args.system,
                max_tokens: args.max_tokens,
                json: args.json,
            };
            ask::run_ask(&config, request).await
        }
        Some(Commands::Route(args)) => {
            let prompt = ask::read_prompt(&args.prompt.prompt)?;
            ask::run_route(
                &config,
                &prompt,
                &args.prompt.attachments,
                &args.web,
                ask::routing_override(args.prompt.force_api, args.prompt.force_web),
            )
            .await
        }
        Some(Commands::Submit(args)) => {
            let prompt = ask::read_prompt(&args.prompt)?;
            ask::run_submit(&config, prompt, args.priority, args.attachments, args.service).await
        }
        Some(Commands::Worker { once }) => work::run_worker(&config, once).await,
        Some(Commands::Queue { action }) => match action {
            QueueAction::Stats => queue::run_stats(&config).await,
            QueueAction::Get { id } => queue::run_get(&config, &id).await,
            QueueAction::List { status, limit } => {
                queue::run_list(&config, status.as_deref(), limit).await
            }
        },
        Some(Commands::Costs { days, json, plain }) => {
            costs::run_costs(&config, days, json, plain).await
        }
        Some(Commands::Providers { json, plain }) => {
            providers::run_providers(&config, json, plain).await
        }
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("switchyard: use --help for available commands");
            Ok(())
        }
    }
}

fn print_config_summary(config: &SwitchyardConfig) {
    let models: usize = config.providers.values().map(|p| p.models.len()).sum();
    println!("config ok");
    println!("  database:  {}", config.storage.database_path);
    println!(
        "  budget:    ${:.2}/day (warn at ${:.2})",
        config.budget.daily_usd, config.budget.warn_at_usd
    );
    println!(
        "  providers: {} ({models} models, {} aliases)",
        config.providers.len(),
        config.aliases.len()
    );
    println!("  routing:   {} task types", config.api.routing.len());
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchyard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
