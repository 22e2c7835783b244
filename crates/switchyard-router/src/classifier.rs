// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based task classification and web-service routing.
//!
//! Classifies a prompt plus its attachments into a task type using
//! attachment extensions, a few fixed cues, prompt length and a configured
//! regex table. No LLM pre-call, no network.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::{Regex, RegexBuilder};
use switchyard_config::model::{ClassifierConfig, WebRoute};
use switchyard_core::SwitchyardError;
use switchyard_core::types::GENERAL_QA;
use tracing::debug;

/// Service used when no routing rule yields an available candidate.
pub const LAST_RESORT_SERVICE: &str = "claude";

/// Image attachment extensions (lowercase, without the dot).
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Prompt cues for text extraction from an image (contains, lowercase).
const OCR_CUES: &[&str] = &["ocr", "extract text", "transcribe", "read the text"];

/// Prompt cues for charts and diagrams (contains, lowercase).
const DIAGRAM_CUES: &[&str] = &["diagram", "chart", "flowchart", "graph"];

struct CompiledRule {
    task_type: String,
    patterns: Vec<Regex>,
}

/// Task-type classifier with its web routing table.
pub struct Classifier {
    long_context_chars: usize,
    rules: Vec<CompiledRule>,
    routing: BTreeMap<String, WebRoute>,
}

impl Classifier {
    /// Compile the pattern table. An invalid regex is a configuration error.
    pub fn new(config: &ClassifierConfig) -> Result<Self, SwitchyardError> {
        let mut rules = Vec::with_capacity(config.patterns.len());
        for rule in &config.patterns {
            let patterns = rule
                .patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p).case_insensitive(true).build().map_err(|e| {
                        SwitchyardError::Config(format!(
                            "invalid pattern for task type `{}`: {e}",
                            rule.task_type
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(CompiledRule {
                task_type: rule.task_type.clone(),
                patterns,
            });
        }
        Ok(Self {
            long_context_chars: config.long_context_chars,
            rules,
            routing: config.routing.clone(),
        })
    }

    /// Determine the task type. The first matching step wins.
    pub fn classify(&self, prompt: &str, attachments: &[String]) -> String {
        let lower = prompt.to_lowercase();

        let extensions: Vec<String> = attachments.iter().filter_map(|a| extension(a)).collect();
        if extensions.iter().any(|e| e == "pdf") {
            return "pdf_analysis".to_string();
        }
        if extensions.iter().any(|e| IMAGE_EXTENSIONS.contains(&e.as_str())) {
            return image_task(&lower).to_string();
        }

        if has_word(&lower, "pdf") {
            return "pdf_analysis".to_string();
        }
        if lower.contains("screenshot") {
            return "screenshot_analysis".to_string();
        }
        if has_word(&lower, "ocr") {
            return "ocr".to_string();
        }

        if prompt.chars().count() > self.long_context_chars {
            return "long_context".to_string();
        }

        for rule in &self.rules {
            if rule.patterns.iter().any(|p| p.is_match(prompt)) {
                return rule.task_type.clone();
            }
        }

        GENERAL_QA.to_string()
    }

    /// Ordered candidate services for a task type, primary first.
    ///
    /// Unknown task types use the `general_qa` rule. `available = None`
    /// means every service is considered available.
    pub fn route(&self, task_type: &str, available: Option<&HashSet<String>>) -> Vec<String> {
        let Some(rule) = self
            .routing
            .get(task_type)
            .or_else(|| self.routing.get(GENERAL_QA))
        else {
            return Vec::new();
        };

        let mut candidates = vec![rule.primary.clone()];
        if let (Some(fallback), false) = (&rule.fallback, rule.only) {
            candidates.push(fallback.clone());
        }

        if let Some(available) = available {
            candidates.retain(|c| available.contains(c));
        }
        candidates
    }

    /// Classify and pick a web service. Never returns an empty service.
    pub fn decide(
        &self,
        prompt: &str,
        attachments: &[String],
        available: Option<&HashSet<String>>,
    ) -> (String, String) {
        let task_type = self.classify(prompt, attachments);
        let service = self
            .route(&task_type, available)
            .into_iter()
            .next()
            .unwrap_or_else(|| LAST_RESORT_SERVICE.to_string());
        debug!(task_type = %task_type, service = %service, "prompt classified");
        (task_type, service)
    }
}

fn image_task(lower_prompt: &str) -> &'static str {
    if lower_prompt.contains("screenshot") {
        "screenshot_analysis"
    } else if OCR_CUES.iter().any(|c| lower_prompt.contains(c)) {
        "ocr"
    } else if DIAGRAM_CUES.iter().any(|c| lower_prompt.contains(c)) {
        "diagram_analysis"
    } else {
        "image_analysis"
    }
}

/// Lowercase extension of a path or URL, ignoring any query or fragment.
fn extension(attachment: &str) -> Option<String> {
    let trimmed = attachment.split(['?', '#']).next().unwrap_or(attachment);
    Path::new(trimmed)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn has_word(lower: &str, word: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierConfig::default()).unwrap()
    }

    fn files(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn pdf_attachment_wins() {
        let c = classifier();
        assert_eq!(c.classify("what does this say", &files(&["invoice.pdf"])), "pdf_analysis");
        assert_eq!(c.classify("write python code", &files(&["/tmp/A.PDF"])), "pdf_analysis");
    }

    #[test]
    fn image_attachments_split_by_prompt_cue() {
        let c = classifier();
        let png = files(&["shot.png"]);
        assert_eq!(c.classify("what is wrong in this screenshot", &png), "screenshot_analysis");
        assert_eq!(c.classify("please extract text from it", &png), "ocr");
        assert_eq!(c.classify("explain this flowchart", &png), "diagram_analysis");
        assert_eq!(c.classify("what is this", &png), "image_analysis");
    }

    #[test]
    fn url_attachment_ignores_query_string() {
        let c = classifier();
        let urls = files(&["https://example.com/cat.jpeg?size=large"]);
        assert_eq!(c.classify("describe", &urls), "image_analysis");
    }

    #[test]
    fn prompt_cues_without_attachments() {
        let c = classifier();
        assert_eq!(c.classify("summarize the PDF I sent", &[]), "pdf_analysis");
        assert_eq!(c.classify("Screenshot shows an error dialog", &[]), "screenshot_analysis");
        assert_eq!(c.classify("run ocr on the scan", &[]), "ocr");
        // Word boundary: no bare "pdf" token here.
        assert_ne!(c.classify("pdfsomething", &[]), "pdf_analysis");
    }

    #[test]
    fn long_prompt_is_long_context() {
        let config = ClassifierConfig {
            long_context_chars: 10,
            ..ClassifierConfig::default()
        };
        let c = Classifier::new(&config).unwrap();
        assert_eq!(c.classify("eleven char", &[]), "long_context");
        assert_eq!(c.classify("ten chars!", &[]), GENERAL_QA);
    }

    #[test]
    fn pattern_table_order_decides() {
        let c = classifier();
        assert_eq!(c.classify("Write a Python function for fibonacci", &[]), "code");
        assert_eq!(c.classify("Translate this into German", &[]), "translation");
        assert_eq!(c.classify("give me the key points", &[]), "summarization");
        assert_eq!(c.classify("what is the latest news on fusion", &[]), "research");
        assert_eq!(c.classify("explain quantum computing", &[]), GENERAL_QA);
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let mut config = ClassifierConfig::default();
        config.patterns[0].patterns.push("(unclosed".into());
        let err = Classifier::new(&config).err().expect("invalid regex");
        assert!(matches!(err, SwitchyardError::Config(msg) if msg.contains("code")));
    }

    #[test]
    fn route_respects_only_and_availability() {
        let mut config = ClassifierConfig::default();
        config.routing.get_mut("code").unwrap().only = true;
        let c = Classifier::new(&config).unwrap();

        assert_eq!(c.route("code", None), vec!["claude"]);
        assert_eq!(c.route("research", None), vec!["gemini", "claude"]);

        let available: HashSet<String> = ["claude".to_string()].into();
        assert_eq!(c.route("research", Some(&available)), vec!["claude"]);
    }

    #[test]
    fn unknown_task_type_uses_general_rule() {
        let c = classifier();
        assert_eq!(c.route("poetry", None), c.route(GENERAL_QA, None));
    }

    #[test]
    fn decide_falls_back_to_last_resort() {
        let c = classifier();
        let none: HashSet<String> = HashSet::new();
        let (task_type, service) = c.decide("hello", &[], Some(&none));
        assert_eq!(task_type, GENERAL_QA);
        assert_eq!(service, LAST_RESORT_SERVICE);

        let available: HashSet<String> = ["gemini".to_string()].into();
        let (_, service) = c.decide("hello", &[], Some(&available));
        assert_eq!(service, "gemini");
    }
}
