// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters that turn a prompt into an answer.

use async_trait::async_trait;

use crate::error::SwitchyardError;

/// Anything that can answer a single prompt.
///
/// Implemented by the metered API adapter and by browser-session adapters.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Short identifier used in logs (alias or web service name).
    fn name(&self) -> &str;

    /// Send `prompt` and return the generated text.
    async fn ask(&self, prompt: &str) -> Result<String, SwitchyardError>;
}

/// A logged-in browser session to a subscription chat service.
///
/// Sessions are lazily started by the orchestrator the first time a task is
/// routed to them.
#[async_trait]
pub trait WebSessionAdapter: ChatAdapter {
    /// Bring the session up. Returns `false` when the service is unreachable
    /// or not logged in.
    async fn start(&self, headless: bool) -> bool;

    /// Tear down the session. Default is a no-op.
    async fn stop(&self) {}
}
