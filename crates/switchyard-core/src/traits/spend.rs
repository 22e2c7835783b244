// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only access to the daily spending state.

use async_trait::async_trait;

use crate::error::SwitchyardError;
use crate::types::BudgetState;

/// Reports where today's spend stands against the ceiling.
///
/// Implementations must not write budget events; the router polls this on
/// every decision.
#[async_trait]
pub trait SpendGate: Send + Sync {
    async fn budget_state(&self) -> Result<BudgetState, SwitchyardError>;
}
