// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executes one prompt along the path the router picks.
//!
//! API path: budget gate, primary alias, one retry on the fallback alias,
//! ledger write. Web path: lazily started browser session keyed by service.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use switchyard_config::{ProviderRegistry, SwitchyardConfig};
use switchyard_core::{ApiResult, CredentialSource, SwitchyardError, Task, WebSessionAdapter};
use switchyard_cost::CostMonitor;
use switchyard_openai::{ApiAdapter, DEFAULT_TEMPERATURE};
use switchyard_router::{
    ApiRouter, BUDGET_EXHAUSTED_REASON, RoutePath, RoutingDecision, RoutingOverride,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Outcome of one executed prompt.
#[derive(Debug, Clone)]
pub struct Execution {
    pub text: String,
    pub decision: RoutingDecision,
    /// Present when a metered call answered.
    pub usage: Option<ApiResult>,
}

/// Routes and executes prompts against API aliases and web sessions.
pub struct Orchestrator {
    router: ApiRouter,
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialSource>,
    cost: CostMonitor,
    web: HashMap<String, Arc<dyn WebSessionAdapter>>,
    started: Mutex<HashSet<String>>,
    headless: bool,
}

impl Orchestrator {
    pub fn new(
        config: &SwitchyardConfig,
        credentials: Arc<dyn CredentialSource>,
        cost: CostMonitor,
    ) -> Result<Self, SwitchyardError> {
        let router = ApiRouter::new(config, credentials.clone(), Arc::new(cost.clone()))?;
        Ok(Self {
            router,
            registry: ProviderRegistry::from_config(config),
            credentials,
            cost,
            web: HashMap::new(),
            started: Mutex::new(HashSet::new()),
            headless: config.worker.headless,
        })
    }

    /// Register a web session under its `name()`.
    pub fn with_web_adapter(mut self, adapter: Arc<dyn WebSessionAdapter>) -> Self {
        self.web.insert(adapter.name().to_string(), adapter);
        self
    }

    pub fn router(&self) -> &ApiRouter {
        &self.router
    }

    pub fn cost(&self) -> &CostMonitor {
        &self.cost
    }

    /// Names of the registered web services.
    pub fn web_services(&self) -> HashSet<String> {
        self.web.keys().cloned().collect()
    }

    /// Route and execute one prompt.
    pub async fn execute(
        &self,
        prompt: &str,
        attachments: &[String],
        routing_override: RoutingOverride,
        task_id: Option<&str>,
    ) -> Result<Execution, SwitchyardError> {
        let available = self.web_services();
        let decision = self
            .router
            .decide(prompt, attachments, Some(&available), routing_override)
            .await;
        info!(
            task_type = %decision.task_type,
            reason = %decision.reason,
            task_id = task_id.unwrap_or("-"),
            "routing decided"
        );
        if decision.reason == BUDGET_EXHAUSTED_REASON {
            self.log_budget_events().await;
        }
        self.run(prompt, decision, task_id).await
    }

    /// Execute a queued task. A task pinned to a service skips routing.
    pub async fn execute_task(&self, task: &Task) -> Result<Execution, SwitchyardError> {
        match &task.service {
            Some(service) => {
                let decision = RoutingDecision {
                    task_type: task.task_type.clone(),
                    path: RoutePath::Web {
                        service: service.clone(),
                    },
                    reason: format!("task pinned to service `{service}`"),
                };
                self.run(&task.prompt, decision, Some(&task.id)).await
            }
            None => {
                self.execute(
                    &task.prompt,
                    &task.attachments,
                    RoutingOverride::Auto,
                    Some(&task.id),
                )
                .await
            }
        }
    }

    /// Stop every web session started by this orchestrator.
    pub async fn shutdown(&self) {
        let started = std::mem::take(&mut *self.started.lock().await);
        for service in started {
            if let Some(adapter) = self.web.get(&service) {
                adapter.stop().await;
                debug!(service = %service, "web session stopped");
            }
        }
    }

    async fn run(
        &self,
        prompt: &str,
        decision: RoutingDecision,
        task_id: Option<&str>,
    ) -> Result<Execution, SwitchyardError> {
        match &decision.path {
            RoutePath::Api {
                alias,
                fallback_alias,
            } => {
                let result = self
                    .ask_api(
                        prompt,
                        alias,
                        fallback_alias.as_deref(),
                        &decision.task_type,
                        task_id,
                    )
                    .await?;
                Ok(Execution {
                    text: result.text.clone(),
                    usage: Some(result),
                    decision,
                })
            }
            RoutePath::Web { service } => {
                let text = self.ask_web(service, prompt).await?;
                Ok(Execution {
                    text,
                    usage: None,
                    decision,
                })
            }
        }
    }

    async fn ask_api(
        &self,
        prompt: &str,
        alias: &str,
        fallback_alias: Option<&str>,
        task_type: &str,
        task_id: Option<&str>,
    ) -> Result<ApiResult, SwitchyardError> {
        self.cost.check_budget().await?;

        let first = self.call_alias(prompt, alias, task_type, task_id).await;
        let result = match (first, fallback_alias) {
            (Ok(result), _) => result,
            (Err(e), Some(fallback)) if e.is_retryable() && self.has_credential(fallback) => {
                warn!(alias, fallback, error = %e, "primary alias failed, trying fallback");
                self.call_alias(prompt, fallback, task_type, task_id).await?
            }
            (Err(e), fallback) => {
                if let Some(fallback) = fallback {
                    debug!(alias, fallback, error = %e, "fallback skipped");
                }
                return Err(e);
            }
        };

        self.cost
            .record(&result, Some(task_type), task_id, true)
            .await?;
        Ok(result)
    }

    /// The router only reads the budget; this writes the de-duplicated
    /// threshold events for prompts it sent to the web.
    async fn log_budget_events(&self) {
        match self.cost.check_budget().await {
            Ok(()) | Err(SwitchyardError::BudgetExceeded { .. }) => {}
            Err(e) => warn!(error = %e, "budget check failed"),
        }
    }

    /// Whether the provider behind `alias` has its credential set.
    fn has_credential(&self, alias: &str) -> bool {
        self.registry
            .resolve(alias)
            .is_ok_and(|resolved| self.credentials.is_present(&resolved.provider.auth_env))
    }

    /// One adapter call. Failed requests are booked as error rows before
    /// returning; a `Config` error means no request was sent and books nothing.
    async fn call_alias(
        &self,
        prompt: &str,
        alias: &str,
        task_type: &str,
        task_id: Option<&str>,
    ) -> Result<ApiResult, SwitchyardError> {
        let adapter = ApiAdapter::from_alias(&self.registry, alias, self.credentials.clone())?;
        match adapter.ask(prompt, &[], None, DEFAULT_TEMPERATURE).await {
            Ok(result) => Ok(result),
            Err(e @ SwitchyardError::Config(_)) => Err(e),
            Err(e) => {
                self.cost
                    .record_error(
                        adapter.alias(),
                        adapter.provider_name(),
                        adapter.model_id(),
                        Some(task_type),
                        task_id,
                    )
                    .await?;
                Err(e)
            }
        }
    }

    async fn ask_web(&self, service: &str, prompt: &str) -> Result<String, SwitchyardError> {
        let adapter = self.web.get(service).ok_or_else(|| SwitchyardError::Provider {
            message: format!("no web session registered for service `{service}`"),
            source: None,
        })?;

        {
            let mut started = self.started.lock().await;
            if !started.contains(service) {
                info!(service, headless = self.headless, "starting web session");
                if !adapter.start(self.headless).await {
                    return Err(SwitchyardError::Provider {
                        message: format!("web session `{service}` failed to start"),
                        source: None,
                    });
                }
                started.insert(service.to_string());
            }
        }

        adapter.ask(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::SecretString;
    use switchyard_core::ChatAdapter;
    use switchyard_core::types::today_utc;
    use switchyard_storage::Database;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct Keys(Vec<&'static str>);

    impl CredentialSource for Keys {
        fn lookup(&self, name: &str) -> Option<SecretString> {
            self.0
                .contains(&name)
                .then(|| SecretString::from("sk-test".to_string()))
        }
    }

    struct Session {
        name: &'static str,
        replies: std::sync::Mutex<VecDeque<String>>,
        starts: AtomicUsize,
        start_ok: bool,
    }

    impl Session {
        fn new(name: &'static str, replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name,
                replies: std::sync::Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                starts: AtomicUsize::new(0),
                start_ok: true,
            })
        }
    }

    #[async_trait]
    impl ChatAdapter for Session {
        fn name(&self) -> &str {
            self.name
        }

        async fn ask(&self, _prompt: &str) -> Result<String, SwitchyardError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| SwitchyardError::Provider {
                    message: "no reply".into(),
                    source: None,
                })
        }
    }

    #[async_trait]
    impl WebSessionAdapter for Session {
        async fn start(&self, _headless: bool) -> bool {
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.start_ok
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": text}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 50, "total_tokens": 150}
        })
    }

    /// Default config with every provider pointed at the mock server.
    fn config(server: &MockServer) -> SwitchyardConfig {
        let mut config = SwitchyardConfig::default();
        for provider in config.providers.values_mut() {
            provider.base_url = server.uri();
        }
        config
    }

    async fn orchestrator(
        config: &SwitchyardConfig,
        keys: Vec<&'static str>,
    ) -> (Orchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("orch.db").to_str().unwrap())
            .await
            .unwrap();
        let cost = CostMonitor::new(&db, &config.budget);
        let orch = Orchestrator::new(config, Arc::new(Keys(keys)), cost).unwrap();
        (orch, dir)
    }

    #[tokio::test]
    async fn api_success_is_recorded_with_task_linkage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("four")))
            .expect(1)
            .mount(&server)
            .await;

        let (orch, _dir) = orchestrator(&config(&server), vec!["DASHSCOPE_API_KEY"]).await;
        let exec = orch
            .execute("what is 2+2", &[], RoutingOverride::Auto, Some("task-1"))
            .await
            .unwrap();

        assert_eq!(exec.text, "four");
        assert!(exec.decision.is_api());
        let usage = exec.usage.unwrap();
        assert_eq!(usage.alias, "qwen-plus");

        let stats = orch.cost().today_stats().await.unwrap();
        assert_eq!(stats.total_calls, 1);
        assert_eq!(stats.total_errors, 0);
        assert_eq!(stats.cost_usd, 0.0001);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_once_and_books_error() {
        let server = MockServer::start().await;
        // general_qa: qwen-plus -> deepseek-v3
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "qwen-plus"})))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "deepseek-chat"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("from fallback")))
            .expect(1)
            .mount(&server)
            .await;

        let keys = vec!["DASHSCOPE_API_KEY", "DEEPSEEK_API_KEY"];
        let (orch, _dir) = orchestrator(&config(&server), keys).await;
        let exec = orch
            .execute("hello there", &[], RoutingOverride::Auto, Some("t2"))
            .await
            .unwrap();

        assert_eq!(exec.text, "from fallback");
        assert_eq!(exec.usage.unwrap().alias, "deepseek-v3");

        let stats = orch.cost().stats_for_date(&today_utc()).await.unwrap();
        assert_eq!(stats.total_calls, 1);
        assert_eq!(stats.total_errors, 1);
        let recent = orch.cost().recent_calls(5).await.unwrap();
        let failed = recent.iter().find(|r| !r.ok).unwrap();
        assert_eq!(failed.alias, "qwen-plus");
        assert_eq!(failed.task_id.as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn both_aliases_failing_returns_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .expect(2)
            .mount(&server)
            .await;

        let keys = vec!["DASHSCOPE_API_KEY", "DEEPSEEK_API_KEY"];
        let (orch, _dir) = orchestrator(&config(&server), keys).await;
        let err = orch
            .execute("hello there", &[], RoutingOverride::Auto, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Transport { status: Some(401), .. }));
        assert_eq!(orch.cost().today_stats().await.unwrap().total_errors, 2);
    }

    #[tokio::test]
    async fn web_path_starts_session_once() {
        let server = MockServer::start().await;
        let session = Session::new("claude", &["one", "two"]);
        let (orch, _dir) = orchestrator(&config(&server), vec![]).await;
        let orch = orch.with_web_adapter(session.clone());

        for expected in ["one", "two"] {
            let exec = orch
                .execute("hello there", &[], RoutingOverride::Auto, None)
                .await
                .unwrap();
            assert_eq!(exec.text, expected);
            assert!(exec.usage.is_none());
        }
        assert_eq!(session.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregistered_web_service_is_provider_error() {
        let server = MockServer::start().await;
        let (orch, _dir) = orchestrator(&config(&server), vec![]).await;
        let err = orch
            .execute("hello there", &[], RoutingOverride::ForceWeb, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Provider { message, .. } if message.contains("claude")));
    }

    #[tokio::test]
    async fn failed_start_is_provider_error() {
        let server = MockServer::start().await;
        let session = Arc::new(Session {
            name: "claude",
            replies: std::sync::Mutex::new(VecDeque::new()),
            starts: AtomicUsize::new(0),
            start_ok: false,
        });
        let (orch, _dir) = orchestrator(&config(&server), vec![]).await;
        let orch = orch.with_web_adapter(session);
        let err = orch
            .execute("hello", &[], RoutingOverride::ForceWeb, None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn pinned_task_skips_routing() {
        let server = MockServer::start().await;
        let session = Session::new("gemini", &["pinned answer"]);
        let (orch, _dir) =
            orchestrator(&config(&server), vec!["DASHSCOPE_API_KEY", "DEEPSEEK_API_KEY"]).await;
        let orch = orch.with_web_adapter(session);

        let task = Task::new("write a rust function").with_service("gemini");
        let exec = orch.execute_task(&task).await.unwrap();
        assert_eq!(exec.text, "pinned answer");
        assert!(!exec.decision.is_api());
    }

    #[tokio::test]
    async fn exceeded_budget_routes_to_web() {
        let server = MockServer::start().await;
        let mut config = config(&server);
        config.budget.daily_usd = 0.0;
        config.budget.warn_at_usd = 0.0;
        let session = Session::new("claude", &["web answer"]);
        let (orch, _dir) = orchestrator(&config, vec!["DASHSCOPE_API_KEY"]).await;
        let orch = orch.with_web_adapter(session);

        let exec = orch
            .execute("hello there", &[], RoutingOverride::Auto, None)
            .await
            .unwrap();
        assert_eq!(exec.text, "web answer");
        assert!(exec.decision.reason.contains("budget"));
    }

    #[tokio::test]
    async fn budget_routed_web_calls_log_one_exceeded_event() {
        let server = MockServer::start().await;
        let mut config = config(&server);
        config.budget.daily_usd = 1.0;
        config.budget.warn_at_usd = 1.0;
        let session = Session::new("claude", &["a", "b", "c"]);
        let (orch, _dir) = orchestrator(&config, vec!["DASHSCOPE_API_KEY"]).await;
        let orch = orch.with_web_adapter(session);

        let spent = ApiResult {
            text: String::new(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost_usd: 1.25,
            provider: "dashscope".into(),
            model_id: "qwen-plus".into(),
            alias: "qwen-plus".into(),
            latency_s: 0.1,
        };
        orch.cost().record(&spent, None, None, true).await.unwrap();

        for _ in 0..3 {
            let exec = orch
                .execute("hello there", &[], RoutingOverride::Auto, None)
                .await
                .unwrap();
            assert_eq!(exec.decision.reason, BUDGET_EXHAUSTED_REASON);
        }

        let events = orch.cost().budget_events(&today_utc()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, switchyard_core::BudgetEventKind::Exceeded);
        assert_eq!(events[0].spend_usd, 1.25);
    }

    #[tokio::test]
    async fn web_routing_without_budget_pressure_writes_no_events() {
        let server = MockServer::start().await;
        let session = Session::new("claude", &["answer"]);
        let (orch, _dir) = orchestrator(&config(&server), vec![]).await;
        let orch = orch.with_web_adapter(session);

        orch.execute("hello there", &[], RoutingOverride::Auto, None)
            .await
            .unwrap();
        assert!(orch.cost().budget_events(&today_utc()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fallback_without_credential_keeps_primary_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "qwen-plus"})))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let (orch, _dir) = orchestrator(&config(&server), vec!["DASHSCOPE_API_KEY"]).await;
        let err = orch
            .execute("hello there", &[], RoutingOverride::Auto, Some("t3"))
            .await
            .unwrap_err();
        assert!(
            matches!(err, SwitchyardError::Transport { status: Some(400), .. }),
            "got: {err}"
        );

        let recent = orch.cost().recent_calls(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].alias, "qwen-plus");
        assert!(!recent[0].ok);
    }

    #[tokio::test]
    async fn missing_credential_books_no_error_row() {
        let server = MockServer::start().await;
        let (orch, _dir) = orchestrator(&config(&server), vec![]).await;
        let err = orch
            .call_alias("hello", "qwen-plus", "general_qa", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::Config(_)));
        assert!(orch.cost().recent_calls(5).await.unwrap().is_empty());
    }
}
