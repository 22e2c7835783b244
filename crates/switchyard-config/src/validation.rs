// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.
//!
//! All problems are collected before returning so a single run reports
//! everything wrong with a file.

use crate::diagnostic::ConfigError;
use crate::model::SwitchyardConfig;

/// Validate a deserialized configuration.
pub fn validate_config(config: &SwitchyardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let budget = &config.budget;
    if budget.daily_usd < 0.0 {
        errors.push(ConfigError::validation(format!(
            "budget.daily_usd must be non-negative, got {}",
            budget.daily_usd
        )));
    }
    if budget.warn_at_usd < 0.0 {
        errors.push(ConfigError::validation(format!(
            "budget.warn_at_usd must be non-negative, got {}",
            budget.warn_at_usd
        )));
    }
    if budget.warn_at_usd > budget.daily_usd {
        errors.push(ConfigError::validation(format!(
            "budget.warn_at_usd ({}) must not exceed budget.daily_usd ({})",
            budget.warn_at_usd, budget.daily_usd
        )));
    }

    validate_classifier(config, &mut errors);
    validate_providers(config, &mut errors);

    for (task_type, route) in &config.api.routing {
        for alias in std::iter::once(&route.primary).chain(route.fallback.as_ref()) {
            if !config.aliases.contains_key(alias) {
                errors.push(ConfigError::validation(format!(
                    "api.routing.{task_type} references unknown alias `{alias}`"
                )));
            }
        }
    }

    if config.worker.max_attempts == 0 {
        errors.push(ConfigError::validation("worker.max_attempts must be at least 1"));
    }
    if config.worker.poll_interval_ms == 0 {
        errors.push(ConfigError::validation(
            "worker.poll_interval_ms must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_classifier(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    let classifier = &config.classifier;

    if !classifier.routing.contains_key(switchyard_core::types::GENERAL_QA) {
        errors.push(ConfigError::validation(
            "classifier.routing must define a `general_qa` rule",
        ));
    }

    if classifier.long_context_chars == 0 {
        errors.push(ConfigError::validation(
            "classifier.long_context_chars must be greater than 0",
        ));
    }

    for rule in &classifier.patterns {
        if rule.task_type.trim().is_empty() {
            errors.push(ConfigError::validation(
                "classifier.patterns entries need a task_type",
            ));
        }
        for pattern in &rule.patterns {
            if let Err(e) = regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
            {
                errors.push(ConfigError::validation(format!(
                    "classifier pattern `{pattern}` for `{}` does not compile: {e}",
                    rule.task_type
                )));
            }
        }
    }
}

fn validate_providers(config: &SwitchyardConfig, errors: &mut Vec<ConfigError>) {
    for (name, provider) in &config.providers {
        if provider.base_url.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "providers.{name}.base_url must not be empty"
            )));
        }
        if provider.auth_env.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "providers.{name}.auth_env must not be empty"
            )));
        }
        if provider.timeout_s == 0 {
            errors.push(ConfigError::validation(format!(
                "providers.{name}.timeout_s must be greater than 0"
            )));
        }
        for (key, model) in &provider.models {
            if model.price_input_per_1m < 0.0 || model.price_output_per_1m < 0.0 {
                errors.push(ConfigError::validation(format!(
                    "providers.{name}.models.{key} prices must be non-negative"
                )));
            }
        }
    }

    for (alias, target) in &config.aliases {
        match config.providers.get(&target.provider) {
            None => errors.push(ConfigError::validation(format!(
                "alias `{alias}` references unknown provider `{}`",
                target.provider
            ))),
            Some(provider) if !provider.models.contains_key(&target.model) => {
                errors.push(ConfigError::validation(format!(
                    "alias `{alias}` references unknown model `{}` of provider `{}`",
                    target.model, target.provider
                )))
            }
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AliasTarget, ApiRoute, PatternRule};

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SwitchyardConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails() {
        let mut config = SwitchyardConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn negative_budget_fails() {
        let mut config = SwitchyardConfig::default();
        config.budget.daily_usd = -1.0;
        config.budget.warn_at_usd = -2.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "budget.daily_usd must be non-negative"));
        assert!(has_message(&errors, "budget.warn_at_usd must be non-negative"));
    }

    #[test]
    fn warn_above_daily_fails() {
        let mut config = SwitchyardConfig::default();
        config.budget.warn_at_usd = 6.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "must not exceed"));
    }

    #[test]
    fn missing_general_qa_rule_fails() {
        let mut config = SwitchyardConfig::default();
        config.classifier.routing.remove("general_qa");
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "general_qa"));
    }

    #[test]
    fn dangling_alias_fails() {
        let mut config = SwitchyardConfig::default();
        config.aliases.insert(
            "ghost".to_string(),
            AliasTarget {
                provider: "nowhere".to_string(),
                model: "x".to_string(),
            },
        );
        config.aliases.insert(
            "typo".to_string(),
            AliasTarget {
                provider: "deepseek".to_string(),
                model: "deepseek-chatt".to_string(),
            },
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "unknown provider `nowhere`"));
        assert!(has_message(&errors, "unknown model `deepseek-chatt`"));
    }

    #[test]
    fn api_route_to_unknown_alias_fails() {
        let mut config = SwitchyardConfig::default();
        config.api.routing.insert(
            "code".to_string(),
            ApiRoute {
                primary: "deepseek-v3".to_string(),
                fallback: Some("gpt-9".to_string()),
            },
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "api.routing.code references unknown alias `gpt-9`"));
    }

    #[test]
    fn bad_regex_fails() {
        let mut config = SwitchyardConfig::default();
        config.classifier.patterns.push(PatternRule {
            task_type: "broken".to_string(),
            patterns: vec!["(unclosed".to_string()],
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "does not compile"));
    }

    #[test]
    fn collects_every_error() {
        let mut config = SwitchyardConfig::default();
        config.storage.database_path = String::new();
        config.worker.max_attempts = 0;
        config.worker.poll_interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
