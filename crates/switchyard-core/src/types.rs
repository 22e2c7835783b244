// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the queue, router, ledger, and adapters.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default task priority (1 = most urgent, 10 = least).
pub const DEFAULT_PRIORITY: i64 = 5;

/// Task type used when nothing more specific matches.
pub const GENERAL_QA: &str = "general_qa";

/// Current time as fractional seconds since the Unix epoch.
pub fn epoch_now() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp_micros() as f64 / 1_000_000.0
}

/// Current UTC date as `YYYY-MM-DD`.
pub fn today_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Lifecycle state of a queued task.
///
/// Transitions: pending -> running -> {done | pending (retry) | failed}.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

/// One unit of orchestrated work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub prompt: String,
    pub task_type: String,
    /// Ordered list of file paths or URLs.
    pub attachments: Vec<String>,
    /// Forced web service; `None` lets the router decide.
    pub service: Option<String>,
    /// Lower is more urgent.
    pub priority: i64,
    pub status: TaskStatus,
    pub result: Option<String>,
    /// Epoch seconds at creation. Part of the dispatch ordering key.
    pub created_at: f64,
    pub attempts: u32,
    /// Reason recorded by the most recent `fail()`.
    pub last_error: Option<String>,
    /// Epoch seconds of the most recent claim.
    pub started_at: Option<f64>,
}

impl Task {
    /// Create a pending task with a fresh id, default priority, and no attachments.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            task_type: GENERAL_QA.to_string(),
            attachments: Vec::new(),
            service: None,
            priority: DEFAULT_PRIORITY,
            status: TaskStatus::Pending,
            result: None,
            created_at: epoch_now(),
            attempts: 0,
            last_error: None,
            started_at: None,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }
}

/// Role of a chat message sent to an OpenAI-compatible endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Result of one metered API call: generated text plus what the ledger needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
    pub provider: String,
    pub model_id: String,
    pub alias: String,
    pub latency_s: f64,
}

/// One row of the usage ledger. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub ts: f64,
    pub date: String,
    pub alias: String,
    pub provider: String,
    pub model_id: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost_usd: f64,
    pub latency_s: f64,
    pub task_type: Option<String>,
    pub task_id: Option<String>,
    pub ok: bool,
}

/// Kind of budget event written to the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BudgetEventKind {
    Warn,
    Exceeded,
}

/// A recorded budget threshold crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEvent {
    pub ts: f64,
    pub date: String,
    pub kind: BudgetEventKind,
    pub spend_usd: f64,
    pub limit_usd: f64,
}

/// Read-only view of today's spend against the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BudgetState {
    /// Below the warning threshold.
    Within { spent: f64, limit: f64 },
    /// At or above the warning threshold but below the limit.
    Warning { spent: f64, limit: f64 },
    /// At or above the daily limit.
    Exceeded { spent: f64, limit: f64 },
}

impl BudgetState {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, BudgetState::Exceeded { .. })
    }

    pub fn spent(&self) -> f64 {
        match *self {
            BudgetState::Within { spent, .. }
            | BudgetState::Warning { spent, .. }
            | BudgetState::Exceeded { spent, .. } => spent,
        }
    }
}
