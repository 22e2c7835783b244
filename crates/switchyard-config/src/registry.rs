// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Alias resolution over the configured providers.

use std::collections::BTreeMap;

use switchyard_core::SwitchyardError;

use crate::model::{AliasTarget, ModelConfig, ProviderConfig, SwitchyardConfig};

/// Everything needed to call one model: endpoint, credential name, pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    /// Logical alias, or the model key when resolved directly.
    pub alias: String,
    pub provider_name: String,
    pub model_key: String,
    pub provider: ProviderConfig,
    pub model: ModelConfig,
}

/// Read-only provider and alias tables, built once from a validated config.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, ProviderConfig>,
    aliases: BTreeMap<String, AliasTarget>,
}

impl ProviderRegistry {
    pub fn from_config(config: &SwitchyardConfig) -> Self {
        Self {
            providers: config.providers.clone(),
            aliases: config.aliases.clone(),
        }
    }

    /// Resolve a logical alias such as `deepseek-v3`.
    pub fn resolve(&self, alias: &str) -> Result<ResolvedModel, SwitchyardError> {
        let target = self.aliases.get(alias).ok_or_else(|| {
            let known: Vec<&str> = self.aliases.keys().map(String::as_str).collect();
            SwitchyardError::Config(format!(
                "unknown model alias `{alias}` (known: {})",
                known.join(", ")
            ))
        })?;
        let mut resolved = self.resolve_model(&target.provider, &target.model)?;
        resolved.alias = alias.to_string();
        Ok(resolved)
    }

    /// Resolve a provider name and model key directly, bypassing aliases.
    pub fn resolve_model(
        &self,
        provider_name: &str,
        model_key: &str,
    ) -> Result<ResolvedModel, SwitchyardError> {
        let provider = self.providers.get(provider_name).ok_or_else(|| {
            SwitchyardError::Config(format!("unknown provider `{provider_name}`"))
        })?;
        let model = provider.models.get(model_key).ok_or_else(|| {
            SwitchyardError::Config(format!(
                "provider `{provider_name}` has no model `{model_key}`"
            ))
        })?;
        Ok(ResolvedModel {
            alias: model_key.to_string(),
            provider_name: provider_name.to_string(),
            model_key: model_key.to_string(),
            provider: provider.clone(),
            model: model.clone(),
        })
    }

    /// Alias names in sorted order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }
}
