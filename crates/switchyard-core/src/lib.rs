// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchyard task orchestrator.
//!
//! This crate provides the error type, the shared task and ledger types, and
//! the trait seams implemented by adapters, the ledger, and credential
//! sources.

pub mod error;
pub mod traits;
pub mod types;

pub use error::SwitchyardError;
pub use types::{
    ApiResult, BudgetEvent, BudgetEventKind, BudgetState, ChatMessage, Role, Task, TaskStatus,
    UsageRecord,
};

pub use traits::{ChatAdapter, CredentialSource, EnvCredentials, SpendGate, WebSessionAdapter};
