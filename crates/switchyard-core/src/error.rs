// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Switchyard orchestrator.

use thiserror::Error;

/// The primary error type shared by the queue, ledger, and provider adapters.
///
/// The router never produces one of these for a routing decision; budget and
/// credential problems are folded into a web-path decision instead.
#[derive(Debug, Error)]
pub enum SwitchyardError {
    /// Configuration errors (unknown alias, missing credential, invalid rule).
    /// Fatal for the call that hit them and never retried silently.
    #[error("configuration error: {0}")]
    Config(String),

    /// The daily spending ceiling has been reached.
    #[error("daily budget exceeded: ${spent:.4} spent, limit ${limit:.2}")]
    BudgetExceeded { spent: f64, limit: f64 },

    /// Network or HTTP failure after the bounded retry was exhausted.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status of the last response, if one was received.
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider or web session answered with something unusable.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No task exists with the given id.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// A queue operation was attempted on a task in the wrong state.
    #[error("cannot {action} task {id}: status is {status}")]
    InvalidTransition {
        id: String,
        status: String,
        action: &'static str,
    },

    /// A task used up its attempts and was parked in `failed`.
    #[error("task {id} failed permanently after {attempts} attempts")]
    TaskExhausted { id: String, attempts: u32 },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchyardError {
    /// Returns true when a retry against another alias or a later attempt
    /// could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SwitchyardError::Transport { .. } | SwitchyardError::Provider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exceeded_message_carries_amounts() {
        let err = SwitchyardError::BudgetExceeded {
            spent: 5.25,
            limit: 5.0,
        };
        assert_eq!(
            err.to_string(),
            "daily budget exceeded: $5.2500 spent, limit $5.00"
        );
    }

    #[test]
    fn invalid_transition_names_the_action() {
        let err = SwitchyardError::InvalidTransition {
            id: "abc".into(),
            status: "done".into(),
            action: "complete",
        };
        assert_eq!(err.to_string(), "cannot complete task abc: status is done");
    }

    #[test]
    fn only_transport_and_provider_are_retryable() {
        let transport = SwitchyardError::Transport {
            message: "503".into(),
            status: Some(503),
            source: None,
        };
        assert!(transport.is_retryable());
        assert!(!SwitchyardError::Config("missing key".into()).is_retryable());
        assert!(
            !SwitchyardError::BudgetExceeded {
                spent: 1.0,
                limit: 1.0
            }
            .is_retryable()
        );
    }
}
