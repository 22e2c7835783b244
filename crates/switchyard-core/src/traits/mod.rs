// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the orchestrator and its collaborators.

pub mod chat;
pub mod credentials;
pub mod spend;

pub use chat::{ChatAdapter, WebSessionAdapter};
pub use credentials::{CredentialSource, EnvCredentials};
pub use spend::SpendGate;
