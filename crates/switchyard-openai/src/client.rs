// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible Chat Completions endpoints.
//!
//! Provides [`ApiAdapter`] which handles alias resolution, bearer
//! authentication, transient error retry and cost calculation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use switchyard_config::{ProviderRegistry, ResolvedModel};
use switchyard_core::{ApiResult, ChatAdapter, ChatMessage, CredentialSource, SwitchyardError};
use switchyard_cost::{ModelPricing, calculate_cost};
use tracing::{debug, error, info, warn};

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// Connect timeout for every provider.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retries after the first attempt on a transient failure.
const MAX_RETRIES: u32 = 2;

/// Sampling temperature used when the caller has no preference.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Error bodies are cut to this many characters in messages.
const ERROR_BODY_LIMIT: usize = 500;

/// Client for one model behind an OpenAI-compatible endpoint.
///
/// The credential is looked up per call, so a missing key surfaces as a
/// `Config` error before any request is sent.
#[derive(Clone)]
pub struct ApiAdapter {
    client: reqwest::Client,
    model: ResolvedModel,
    api_url: String,
    system_prompt: Option<String>,
    credentials: Arc<dyn CredentialSource>,
    backoff: Duration,
}

impl ApiAdapter {
    /// Adapter for a logical alias such as `deepseek-v3`.
    pub fn from_alias(
        registry: &ProviderRegistry,
        alias: &str,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, SwitchyardError> {
        Self::new(registry.resolve(alias)?, credentials)
    }

    /// Adapter for a provider model key, bypassing aliases.
    /// The alias reported in results is `provider/model_key`.
    pub fn from_model(
        registry: &ProviderRegistry,
        provider: &str,
        model_key: &str,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, SwitchyardError> {
        let mut resolved = registry.resolve_model(provider, model_key)?;
        resolved.alias = format!("{provider}/{model_key}");
        Self::new(resolved, credentials)
    }

    pub fn new(
        model: ResolvedModel,
        credentials: Arc<dyn CredentialSource>,
    ) -> Result<Self, SwitchyardError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(Duration::from_secs(model.provider.timeout_s))
            .build()
            .map_err(|e| SwitchyardError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let api_url = chat_url(&model.provider.base_url);
        debug!(
            alias = %model.alias,
            provider = %model.provider_name,
            model = %model.model.model_id,
            url = %api_url,
            "api adapter ready"
        );
        Ok(Self {
            client,
            model,
            api_url,
            system_prompt: None,
            credentials,
            backoff: Duration::from_secs(1),
        })
    }

    /// System prompt applied to every `ask`.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.is_empty()).then_some(prompt);
        self
    }

    /// Overrides the endpoint base URL (for testing with wiremock).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_url = chat_url(base_url);
        self
    }

    /// Overrides the first retry delay; later retries double it.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn alias(&self) -> &str {
        &self.model.alias
    }

    pub fn provider_name(&self) -> &str {
        &self.model.provider_name
    }

    pub fn model_id(&self) -> &str {
        &self.model.model.model_id
    }

    /// Send one prompt with optional history.
    ///
    /// Models without system-prompt support get the system prompt folded
    /// into the user message. `max_tokens = None` uses the model default.
    pub async fn ask(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        max_tokens: Option<u32>,
        temperature: f32,
    ) -> Result<ApiResult, SwitchyardError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        let mut prompt = prompt.to_string();

        if let Some(system) = &self.system_prompt {
            if self.model.model.supports_system {
                messages.push(ChatMessage::system(system.clone()));
            } else {
                prompt = format!("[System instruction: {system}]\n\n{prompt}");
                debug!(alias = %self.model.alias, "system prompt folded into user message");
            }
        }
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(prompt));

        self.chat(&messages, max_tokens, temperature).await
    }

    /// Send a complete message list as-is.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: Option<u32>,
        temperature: f32,
    ) -> Result<ApiResult, SwitchyardError> {
        let auth_env = &self.model.provider.auth_env;
        let key = self.credentials.lookup(auth_env).ok_or_else(|| {
            SwitchyardError::Config(format!(
                "credential `{auth_env}` is not set (alias `{}`)",
                self.model.alias
            ))
        })?;

        let request = ChatCompletionRequest {
            model: self.model.model.model_id.clone(),
            messages: messages.to_vec(),
            max_tokens: max_tokens.unwrap_or(self.model.model.max_output_tokens),
            temperature,
        };

        info!(
            provider = %self.model.provider_name,
            model = %request.model,
            prompt_chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            max_tokens = request.max_tokens,
            "api call"
        );

        let started = Instant::now();
        let response = match self.post_with_retry(&request, key.expose_secret()).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    provider = %self.model.provider_name,
                    model = %request.model,
                    error = %e,
                    "api call failed"
                );
                return Err(e);
            }
        };
        let latency_s = (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;

        let usage = response.usage.unwrap_or_default();
        let pricing = ModelPricing::from_model(&self.model.model);
        let cost_usd = calculate_cost(&pricing, usage.prompt_tokens, usage.completion_tokens);

        let result = ApiResult {
            text: response.text(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total(),
            cost_usd,
            provider: self.model.provider_name.clone(),
            model_id: self.model.model.model_id.clone(),
            alias: self.model.alias.clone(),
            latency_s,
        };
        info!(
            total_tokens = result.total_tokens,
            prompt_tokens = result.prompt_tokens,
            completion_tokens = result.completion_tokens,
            cost_usd = result.cost_usd,
            latency_s = result.latency_s,
            "api response received"
        );
        Ok(result)
    }

    /// POST with up to [`MAX_RETRIES`] retries on transient failures.
    async fn post_with_retry(
        &self,
        request: &ChatCompletionRequest,
        api_key: &str,
    ) -> Result<ChatCompletionResponse, SwitchyardError> {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = self.backoff * 2u32.pow(attempt - 1);
                warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying api request");
                tokio::time::sleep(delay).await;
            }

            let mut builder = self.client.post(&self.api_url).bearer_auth(api_key).json(request);
            for (name, value) in &self.model.provider.extra_headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < MAX_RETRIES => {
                    warn!(error = %e, "transient transport error, will retry");
                    last_error = Some(transport(format!("request failed: {e}"), None, Some(e)));
                    continue;
                }
                Err(e) => {
                    return Err(transport(format!("request failed: {e}"), None, Some(e)));
                }
            };

            let status = response.status();
            debug!(status = %status, attempt, "api response status");

            if status.is_success() {
                let body = response.text().await.map_err(|e| SwitchyardError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| SwitchyardError::Provider {
                    message: format!("failed to parse api response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let message = error_message(status, &body);

            if is_transient_error(status) && attempt < MAX_RETRIES {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(transport(message, Some(status.as_u16()), None));
                continue;
            }
            return Err(transport(message, Some(status.as_u16()), None));
        }

        Err(last_error.unwrap_or_else(|| transport("request failed after retries".into(), None, None)))
    }
}

#[async_trait]
impl ChatAdapter for ApiAdapter {
    fn name(&self) -> &str {
        &self.model.alias
    }

    async fn ask(&self, prompt: &str) -> Result<String, SwitchyardError> {
        ApiAdapter::ask(self, prompt, &[], None, DEFAULT_TEMPERATURE)
            .await
            .map(|result| result.text)
    }
}

fn chat_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        match api_err.error.type_ {
            Some(kind) => format!("api error {status} ({kind}): {}", api_err.error.message),
            None => format!("api error {status}: {}", api_err.error.message),
        }
    } else {
        let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        format!("api error {status}: {snippet}")
    }
}

fn transport(message: String, status: Option<u16>, source: Option<reqwest::Error>) -> SwitchyardError {
    SwitchyardError::Transport {
        message,
        status,
        source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
    }
}
