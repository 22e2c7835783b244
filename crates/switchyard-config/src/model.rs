// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Switchyard.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at start-up instead of being silently ignored. Every section has
//! compiled defaults that validate on their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Switchyard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchyardConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Task queue and ledger database.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Daily spending ceiling.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Preferred execution path when both are viable.
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// Task-type classification and web-service routing.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Task-type to API alias routing.
    #[serde(default)]
    pub api: ApiConfig,

    /// Metered OpenAI-compatible providers keyed by provider name.
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Logical model aliases keyed by alias name.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, AliasTarget>,

    /// Queue worker loop settings.
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Default for SwitchyardConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            storage: StorageConfig::default(),
            budget: BudgetConfig::default(),
            strategy: StrategyConfig::default(),
            classifier: ClassifierConfig::default(),
            api: ApiConfig::default(),
            providers: default_providers(),
            aliases: default_aliases(),
            worker: WorkerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the database holding tasks, api calls, and budget events.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead logging. Required for several worker processes.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("switchyard").join("switchyard.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("switchyard.db"))
        .display()
        .to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    /// Hard ceiling for metered spend per UTC day, in USD.
    #[serde(default = "default_daily_usd")]
    pub daily_usd: f64,

    /// Spend at which a warning is logged, in USD.
    #[serde(default = "default_warn_at_usd")]
    pub warn_at_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_usd: default_daily_usd(),
            warn_at_usd: default_warn_at_usd(),
        }
    }
}

fn default_daily_usd() -> f64 {
    5.0
}

fn default_warn_at_usd() -> f64 {
    3.0
}

/// Which path to take when both an API alias and a web session could serve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Prefer metered API calls.
    #[default]
    Api,
    /// Prefer the classifier's web service when it is available.
    Web,
    /// Resolves like `api`.
    Cost,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    #[serde(default)]
    pub prefer: Strategy,
}

/// Classifier settings: pattern table and web routing rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Prompts longer than this many characters classify as `long_context`.
    #[serde(default = "default_long_context_chars")]
    pub long_context_chars: usize,

    /// Ordered pattern table. The first rule with a matching regex wins.
    #[serde(default = "default_patterns")]
    pub patterns: Vec<PatternRule>,

    /// Web-service routing per task type. Must contain `general_qa`.
    #[serde(default = "default_web_routing")]
    pub routing: BTreeMap<String, WebRoute>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            long_context_chars: default_long_context_chars(),
            patterns: default_patterns(),
            routing: default_web_routing(),
        }
    }
}

fn default_long_context_chars() -> usize {
    50_000
}

/// One row of the classifier pattern table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PatternRule {
    pub task_type: String,
    /// Regular expressions, matched case-insensitively.
    pub patterns: Vec<String>,
}

/// Web-service routing rule for one task type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebRoute {
    pub primary: String,
    #[serde(default)]
    pub fallback: Option<String>,
    /// Never offer the fallback.
    #[serde(default)]
    pub only: bool,
}

impl WebRoute {
    fn new(primary: &str, fallback: Option<&str>) -> Self {
        Self {
            primary: primary.to_string(),
            fallback: fallback.map(str::to_string),
            only: false,
        }
    }
}

fn default_patterns() -> Vec<PatternRule> {
    let rule = |task_type: &str, patterns: &[&str]| PatternRule {
        task_type: task_type.to_string(),
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
    };
    vec![
        rule(
            "code",
            &[
                r"\b(code|function|class|method|bug|refactor|compile|stack ?trace)\b",
                r"\b(python|rust|javascript|typescript|golang|sql|bash)\b",
                r"```",
            ],
        ),
        rule(
            "translation",
            &[r"\btranslat(e|ion)\b", r"\b(into|to) (english|german|french|spanish)\b"],
        ),
        rule(
            "summarization",
            &[r"\bsummar(y|i[sz]e)\b", r"\btl;?dr\b", r"\bkey points\b"],
        ),
        rule(
            "research",
            &[r"\b(latest|news|current|sources|research|compare)\b"],
        ),
    ]
}

fn default_web_routing() -> BTreeMap<String, WebRoute> {
    [
        ("general_qa", WebRoute::new("claude", Some("gemini"))),
        ("code", WebRoute::new("claude", Some("copilot"))),
        ("research", WebRoute::new("gemini", Some("claude"))),
        ("translation", WebRoute::new("openai", Some("claude"))),
        ("summarization", WebRoute::new("claude", Some("gemini"))),
        ("long_context", WebRoute::new("gemini", Some("claude"))),
        ("pdf_analysis", WebRoute::new("claude", Some("gemini"))),
        ("image_analysis", WebRoute::new("gemini", Some("claude"))),
        ("screenshot_analysis", WebRoute::new("claude", Some("gemini"))),
        ("ocr", WebRoute::new("gemini", Some("claude"))),
        ("diagram_analysis", WebRoute::new("claude", Some("gemini"))),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// API routing: which task types may use metered aliases, and which ones.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Task types that always go to a web session unless forced to the API.
    #[serde(default = "default_web_only")]
    pub web_only: Vec<String>,

    /// Task type to alias pair.
    #[serde(default = "default_api_routing")]
    pub routing: BTreeMap<String, ApiRoute>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            web_only: default_web_only(),
            routing: default_api_routing(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiRoute {
    pub primary: String,
    #[serde(default)]
    pub fallback: Option<String>,
}

fn default_web_only() -> Vec<String> {
    [
        "pdf_analysis",
        "image_analysis",
        "screenshot_analysis",
        "ocr",
        "diagram_analysis",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn default_api_routing() -> BTreeMap<String, ApiRoute> {
    let route = |primary: &str, fallback: &str| ApiRoute {
        primary: primary.to_string(),
        fallback: Some(fallback.to_string()),
    };
    [
        ("general_qa", route("qwen-plus", "deepseek-v3")),
        ("code", route("deepseek-v3", "qwen-max")),
        ("research", route("qwen-max", "deepseek-v3")),
        ("translation", route("qwen-plus", "mistral-large")),
        ("summarization", route("qwen-plus", "llama-70b")),
        ("long_context", route("qwen-plus", "qwen-max")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// An OpenAI-compatible provider endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,

    /// Name of the credential holding the bearer token.
    pub auth_env: String,

    /// Read timeout for one request, in seconds.
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,

    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,

    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

fn default_timeout_s() -> u64 {
    120
}

/// Pricing and capabilities of one model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Exact model name sent in the request body.
    pub model_id: String,

    #[serde(default)]
    pub price_input_per_1m: f64,

    #[serde(default)]
    pub price_output_per_1m: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// When false the system prompt is folded into the user message.
    #[serde(default = "default_true")]
    pub supports_system: bool,

    #[serde(default = "default_tier")]
    pub tier: String,
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_tier() -> String {
    "standard".to_string()
}

/// Target of a logical alias.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AliasTarget {
    pub provider: String,
    /// Key under `providers.<provider>.models`.
    pub model: String,
}

fn default_providers() -> BTreeMap<String, ProviderConfig> {
    let model = |model_id: &str, input: f64, output: f64, max_out: u32, tier: &str| ModelConfig {
        model_id: model_id.to_string(),
        price_input_per_1m: input,
        price_output_per_1m: output,
        max_output_tokens: max_out,
        supports_system: true,
        tier: tier.to_string(),
    };
    let provider = |base_url: &str, auth_env: &str, models: Vec<(&str, ModelConfig)>| {
        ProviderConfig {
            base_url: base_url.to_string(),
            auth_env: auth_env.to_string(),
            timeout_s: default_timeout_s(),
            extra_headers: BTreeMap::new(),
            models: models
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    };

    let mut providers = BTreeMap::new();
    providers.insert(
        "dashscope".to_string(),
        provider(
            "https://dashscope-intl.aliyuncs.com/compatible-mode/v1",
            "DASHSCOPE_API_KEY",
            vec![
                ("qwen-max", model("qwen-max", 1.60, 6.40, 8192, "premium")),
                ("qwen-plus", model("qwen-plus", 0.40, 1.20, 8192, "standard")),
                ("qwen-turbo", model("qwen-turbo", 0.05, 0.20, 8192, "budget")),
            ],
        ),
    );
    providers.insert(
        "deepseek".to_string(),
        provider(
            "https://api.deepseek.com/v1",
            "DEEPSEEK_API_KEY",
            vec![("deepseek-chat", model("deepseek-chat", 0.27, 1.10, 8192, "standard"))],
        ),
    );
    providers.insert(
        "groq".to_string(),
        provider(
            "https://api.groq.com/openai/v1",
            "GROQ_API_KEY",
            vec![
                (
                    "llama-3.3-70b",
                    model("llama-3.3-70b-versatile", 0.59, 0.79, 8192, "standard"),
                ),
                (
                    "llama-3.1-8b",
                    model("llama-3.1-8b-instant", 0.05, 0.08, 8192, "budget"),
                ),
            ],
        ),
    );
    providers.insert(
        "mistral".to_string(),
        provider(
            "https://api.mistral.ai/v1",
            "MISTRAL_API_KEY",
            vec![(
                "mistral-large",
                model("mistral-large-latest", 2.00, 6.00, 8192, "premium"),
            )],
        ),
    );
    providers
}

fn default_aliases() -> BTreeMap<String, AliasTarget> {
    [
        ("qwen-max", "dashscope", "qwen-max"),
        ("qwen-plus", "dashscope", "qwen-plus"),
        ("qwen-turbo", "dashscope", "qwen-turbo"),
        ("deepseek-v3", "deepseek", "deepseek-chat"),
        ("llama-70b", "groq", "llama-3.3-70b"),
        ("llama-8b", "groq", "llama-3.1-8b"),
        ("mistral-large", "mistral", "mistral-large"),
    ]
    .into_iter()
    .map(|(alias, provider, model)| {
        (
            alias.to_string(),
            AliasTarget {
                provider: provider.to_string(),
                model: model.to_string(),
            },
        )
    })
    .collect()
}

/// Queue worker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Sleep between polls of an empty queue, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Attempts before a task is parked in `failed`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Running tasks claimed longer ago than this are returned to pending at
    /// worker start-up.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Start web sessions headless.
    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            stale_after_secs: default_stale_after_secs(),
            headless: true,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_stale_after_secs() -> u64 {
    900
}
