// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API-versus-web routing with credential and budget awareness.
//!
//! Decision order: force-web > web-only task > no API rule > web strategy >
//! credential resolution > budget gate > API. The router never fails; every
//! outcome is a [`RoutingDecision`] carrying its reason.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use switchyard_config::ProviderRegistry;
use switchyard_config::model::{ApiRoute, Strategy, SwitchyardConfig};
use switchyard_core::{CredentialSource, SpendGate, SwitchyardError};
use tracing::{debug, info, warn};

use crate::classifier::Classifier;

/// Reason given when the daily budget sends an API-eligible prompt to the web.
pub const BUDGET_EXHAUSTED_REASON: &str = "budget exhausted, falling back to web";

/// Caller-requested override of the routing chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoutingOverride {
    #[default]
    Auto,
    /// Skip the web-only, missing-rule and strategy checks.
    /// Credentials and budget are still checked.
    ForceApi,
    ForceWeb,
}

/// Where a prompt goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePath {
    Api {
        alias: String,
        /// Secondary alias to try once if `alias` fails.
        fallback_alias: Option<String>,
    },
    Web {
        service: String,
    },
}

/// Routing decision with the classified task type and a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    pub task_type: String,
    pub path: RoutePath,
    pub reason: String,
}

impl RoutingDecision {
    fn web(task_type: &str, service: &str, reason: impl Into<String>) -> Self {
        Self {
            task_type: task_type.to_string(),
            path: RoutePath::Web {
                service: service.to_string(),
            },
            reason: reason.into(),
        }
    }

    pub fn is_api(&self) -> bool {
        matches!(self.path, RoutePath::Api { .. })
    }
}

/// One row of the provider health overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasStatus {
    pub alias: String,
    pub provider: String,
    pub model_id: String,
    pub key_set: bool,
    pub env_var: String,
    pub tier: String,
    pub price_input_per_1m: f64,
    pub price_output_per_1m: f64,
}

/// Chooses between metered API aliases and web sessions.
pub struct ApiRouter {
    classifier: Classifier,
    web_only: HashSet<String>,
    routing: BTreeMap<String, ApiRoute>,
    strategy: Strategy,
    registry: ProviderRegistry,
    credentials: Arc<dyn CredentialSource>,
    spend: Arc<dyn SpendGate>,
}

impl ApiRouter {
    /// Build from a validated config. Fails only on an invalid classifier pattern.
    pub fn new(
        config: &SwitchyardConfig,
        credentials: Arc<dyn CredentialSource>,
        spend: Arc<dyn SpendGate>,
    ) -> Result<Self, SwitchyardError> {
        let router = Self {
            classifier: Classifier::new(&config.classifier)?,
            web_only: config.api.web_only.iter().cloned().collect(),
            routing: config.api.routing.clone(),
            strategy: config.strategy.prefer,
            registry: ProviderRegistry::from_config(config),
            credentials,
            spend,
        };
        debug!(
            rules = router.routing.len(),
            strategy = ?router.strategy,
            "api router loaded"
        );
        Ok(router)
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Decide between the API and a web session.
    ///
    /// `available_web` lists services with a live session; `None` or an
    /// empty set means availability is unknown and every service counts.
    pub async fn decide(
        &self,
        prompt: &str,
        attachments: &[String],
        available_web: Option<&HashSet<String>>,
        routing_override: RoutingOverride,
    ) -> RoutingDecision {
        let available_web = available_web.filter(|set| !set.is_empty());
        let force_api = routing_override == RoutingOverride::ForceApi;

        let (task_type, web_primary) = self.classifier.decide(prompt, attachments, available_web);
        info!(task_type = %task_type, web_primary = %web_primary, "task classified");

        if routing_override == RoutingOverride::ForceWeb {
            return RoutingDecision::web(&task_type, &web_primary, "force_web");
        }

        if self.web_only.contains(&task_type) && !force_api {
            let reason = format!("task type `{task_type}` is web-only");
            return RoutingDecision::web(&task_type, &web_primary, reason);
        }

        let rule = self.routing.get(&task_type);
        if rule.is_none() && !force_api {
            let reason = format!("no api routing rule for task type `{task_type}`");
            return RoutingDecision::web(&task_type, &web_primary, reason);
        }

        if self.strategy == Strategy::Web
            && !force_api
            && available_web.is_some_and(|set| set.contains(&web_primary))
        {
            return RoutingDecision::web(
                &task_type,
                &web_primary,
                "strategy=web and web service available",
            );
        }

        let primary = rule.map(|r| r.primary.as_str());
        let fallback = rule.and_then(|r| r.fallback.as_deref());

        let (chosen, secondary) = match (primary, fallback) {
            (Some(p), _) if self.key_available(p) => (p, fallback),
            (_, Some(f)) if self.key_available(f) => {
                info!(
                    primary = primary.unwrap_or("-"),
                    fallback = f,
                    "primary alias unavailable, using fallback"
                );
                (f, None)
            }
            _ => {
                let reason = format!(
                    "missing credentials for `{}`/`{}`",
                    primary.unwrap_or("-"),
                    fallback.unwrap_or("-")
                );
                return RoutingDecision::web(&task_type, &web_primary, reason);
            }
        };

        match self.spend.budget_state().await {
            Ok(state) if state.is_exceeded() => {
                warn!(spent_usd = state.spent(), "daily budget exhausted, routing to web");
                return RoutingDecision::web(
                    &task_type,
                    &web_primary,
                    BUDGET_EXHAUSTED_REASON,
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "budget state unavailable, routing to web");
                return RoutingDecision::web(
                    &task_type,
                    &web_primary,
                    BUDGET_EXHAUSTED_REASON,
                );
            }
        }

        let strategy = match self.strategy {
            Strategy::Api => "api",
            Strategy::Web => "web",
            Strategy::Cost => "cost",
        };
        info!(
            task_type = %task_type,
            alias = chosen,
            fallback = secondary.unwrap_or("-"),
            "routed to api"
        );
        RoutingDecision {
            reason: format!("api alias `{chosen}` chosen (strategy: {strategy})"),
            task_type,
            path: RoutePath::Api {
                alias: chosen.to_string(),
                fallback_alias: secondary.map(str::to_string),
            },
        }
    }

    /// Aliases whose provider credential is present.
    pub fn available_api_aliases(&self) -> Vec<String> {
        self.registry
            .aliases()
            .filter(|alias| self.key_available(alias))
            .map(str::to_string)
            .collect()
    }

    /// Per-alias overview for the `providers` command.
    pub fn status_report(&self) -> Vec<AliasStatus> {
        self.registry
            .aliases()
            .filter_map(|alias| self.registry.resolve(alias).ok())
            .map(|resolved| AliasStatus {
                key_set: self.credentials.is_present(&resolved.provider.auth_env),
                alias: resolved.alias,
                provider: resolved.provider_name,
                model_id: resolved.model.model_id,
                env_var: resolved.provider.auth_env,
                tier: resolved.model.tier,
                price_input_per_1m: resolved.model.price_input_per_1m,
                price_output_per_1m: resolved.model.price_output_per_1m,
            })
            .collect()
    }

    fn key_available(&self, alias: &str) -> bool {
        let Ok(resolved) = self.registry.resolve(alias) else {
            return false;
        };
        let present = self.credentials.is_present(&resolved.provider.auth_env);
        if !present {
            debug!(alias, env = %resolved.provider.auth_env, "api credential missing");
        }
        present
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::SecretString;
    use switchyard_core::BudgetState;

    use super::*;

    struct Keys(HashSet<String>);

    impl Keys {
        fn of(names: &[&str]) -> Arc<Self> {
            Arc::new(Self(names.iter().map(|n| n.to_string()).collect()))
        }
    }

    impl CredentialSource for Keys {
        fn lookup(&self, name: &str) -> Option<SecretString> {
            self.0
                .contains(name)
                .then(|| SecretString::from("test-key".to_string()))
        }
    }

    struct Gate {
        state: Mutex<Option<BudgetState>>,
        reads: AtomicUsize,
    }

    impl Gate {
        fn new(state: Option<BudgetState>) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(state),
                reads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SpendGate for Gate {
        async fn budget_state(&self) -> Result<BudgetState, SwitchyardError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            (*self.state.lock().unwrap())
                .ok_or_else(|| SwitchyardError::Internal("ledger offline".into()))
        }
    }

    const ALL_KEYS: &[&str] = &[
        "DASHSCOPE_API_KEY",
        "DEEPSEEK_API_KEY",
        "GROQ_API_KEY",
        "MISTRAL_API_KEY",
    ];

    fn within() -> Option<BudgetState> {
        Some(BudgetState::Within {
            spent: 0.0,
            limit: 5.0,
        })
    }

    fn router_with(
        config: &SwitchyardConfig,
        keys: &[&str],
        state: Option<BudgetState>,
    ) -> (ApiRouter, Arc<Gate>) {
        let gate = Gate::new(state);
        let router = ApiRouter::new(config, Keys::of(keys), gate.clone()).unwrap();
        (router, gate)
    }

    fn router(keys: &[&str], state: Option<BudgetState>) -> (ApiRouter, Arc<Gate>) {
        router_with(&SwitchyardConfig::default(), keys, state)
    }

    fn api_alias(decision: &RoutingDecision) -> (&str, Option<&str>) {
        match &decision.path {
            RoutePath::Api {
                alias,
                fallback_alias,
            } => (alias.as_str(), fallback_alias.as_deref()),
            RoutePath::Web { service } => panic!("expected api, got web {service}: {}", decision.reason),
        }
    }

    fn web_service(decision: &RoutingDecision) -> &str {
        match &decision.path {
            RoutePath::Web { service } => service,
            RoutePath::Api { alias, .. } => panic!("expected web, got api {alias}"),
        }
    }

    #[tokio::test]
    async fn code_prompt_routes_to_primary_with_fallback() {
        let (router, _) = router(ALL_KEYS, within());
        let d = router
            .decide("write a rust function", &[], None, RoutingOverride::Auto)
            .await;
        assert_eq!(d.task_type, "code");
        assert_eq!(api_alias(&d), ("deepseek-v3", Some("qwen-max")));
    }

    #[tokio::test]
    async fn missing_primary_key_uses_fallback_without_secondary() {
        // code: deepseek-v3 (deepseek) -> qwen-max (dashscope)
        let (router, _) = router(&["DASHSCOPE_API_KEY"], within());
        let d = router
            .decide("refactor this class", &[], None, RoutingOverride::Auto)
            .await;
        assert_eq!(api_alias(&d), ("qwen-max", None));
    }

    #[tokio::test]
    async fn no_keys_goes_to_web() {
        let (router, gate) = router(&[], within());
        let d = router.decide("hello there", &[], None, RoutingOverride::Auto).await;
        assert_eq!(web_service(&d), "claude");
        assert!(d.reason.contains("missing credentials"), "{}", d.reason);
        assert_eq!(gate.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn web_only_task_ignores_keys() {
        let (router, _) = router(ALL_KEYS, within());
        let d = router
            .decide("what is this", &["invoice.pdf".into()], None, RoutingOverride::Auto)
            .await;
        assert_eq!(d.task_type, "pdf_analysis");
        assert_eq!(web_service(&d), "claude");
        assert!(d.reason.contains("web-only"));
    }

    #[tokio::test]
    async fn force_api_overrides_web_only() {
        let mut config = SwitchyardConfig::default();
        config.api.routing.insert(
            "pdf_analysis".into(),
            ApiRoute {
                primary: "qwen-max".into(),
                fallback: None,
            },
        );
        let (router, _) = router_with(&config, ALL_KEYS, within());
        let d = router
            .decide("read it", &["a.pdf".into()], None, RoutingOverride::ForceApi)
            .await;
        assert_eq!(api_alias(&d), ("qwen-max", None));
    }

    #[tokio::test]
    async fn force_api_without_rule_and_keys_still_goes_web() {
        let (router, _) = router(ALL_KEYS, within());
        let d = router
            .decide("read it", &["a.pdf".into()], None, RoutingOverride::ForceApi)
            .await;
        assert!(!d.is_api());
        assert!(d.reason.contains("missing credentials"));
    }

    #[tokio::test]
    async fn force_web_short_circuits() {
        let (router, gate) = router(ALL_KEYS, within());
        let d = router
            .decide("write a rust function", &[], None, RoutingOverride::ForceWeb)
            .await;
        assert_eq!(web_service(&d), "claude");
        assert_eq!(d.reason, "force_web");
        assert_eq!(gate.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unrouted_task_type_goes_web() {
        let mut config = SwitchyardConfig::default();
        config.api.routing.remove("research");
        let (router, _) = router_with(&config, ALL_KEYS, within());
        let d = router
            .decide("latest news on fusion", &[], None, RoutingOverride::Auto)
            .await;
        assert_eq!(d.task_type, "research");
        assert_eq!(web_service(&d), "gemini");
        assert!(d.reason.contains("no api routing rule"));
    }

    #[tokio::test]
    async fn web_strategy_prefers_available_session() {
        let mut config = SwitchyardConfig::default();
        config.strategy.prefer = Strategy::Web;
        let (router, _) = router_with(&config, ALL_KEYS, within());

        let live: HashSet<String> = ["claude".to_string()].into();
        let d = router
            .decide("hello there", &[], Some(&live), RoutingOverride::Auto)
            .await;
        assert_eq!(web_service(&d), "claude");

        // Unknown availability does not count as available.
        let d = router.decide("hello there", &[], None, RoutingOverride::Auto).await;
        assert!(d.is_api());
    }

    #[tokio::test]
    async fn cost_strategy_resolves_like_api() {
        let mut config = SwitchyardConfig::default();
        config.strategy.prefer = Strategy::Cost;
        let (router, _) = router_with(&config, ALL_KEYS, within());
        let d = router.decide("hello there", &[], None, RoutingOverride::Auto).await;
        assert_eq!(api_alias(&d), ("qwen-plus", Some("deepseek-v3")));
        assert!(d.reason.contains("strategy: cost"));
    }

    #[tokio::test]
    async fn exceeded_budget_goes_web() {
        let state = Some(BudgetState::Exceeded {
            spent: 5.5,
            limit: 5.0,
        });
        let (router, gate) = router(ALL_KEYS, state);
        let d = router.decide("hello there", &[], None, RoutingOverride::Auto).await;
        assert_eq!(web_service(&d), "claude");
        assert!(d.reason.contains("budget exhausted"));
        assert_eq!(gate.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unreadable_budget_goes_web() {
        let (router, _) = router(ALL_KEYS, None);
        let d = router.decide("hello there", &[], None, RoutingOverride::Auto).await;
        assert!(!d.is_api());
        assert!(d.reason.contains("budget exhausted"));
    }

    #[tokio::test]
    async fn warning_budget_still_routes_api() {
        let state = Some(BudgetState::Warning {
            spent: 4.0,
            limit: 5.0,
        });
        let (router, _) = router(ALL_KEYS, state);
        let d = router.decide("hello there", &[], None, RoutingOverride::Auto).await;
        assert!(d.is_api());
    }

    #[test]
    fn available_aliases_follow_credentials() {
        let (router, _) = router(&["GROQ_API_KEY"], within());
        assert_eq!(router.available_api_aliases(), vec!["llama-70b", "llama-8b"]);
    }

    #[test]
    fn status_report_covers_every_alias() {
        let (router, _) = router(&["DEEPSEEK_API_KEY"], within());
        let report = router.status_report();
        assert_eq!(report.len(), router.registry().aliases().count());

        let deepseek = report.iter().find(|s| s.alias == "deepseek-v3").unwrap();
        assert!(deepseek.key_set);
        assert_eq!(deepseek.provider, "deepseek");
        assert_eq!(deepseek.env_var, "DEEPSEEK_API_KEY");

        let qwen = report.iter().find(|s| s.alias == "qwen-max").unwrap();
        assert!(!qwen.key_set);
    }
}
