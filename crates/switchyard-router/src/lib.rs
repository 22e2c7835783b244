// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task classification and execution-path routing.
//!
//! - [`Classifier`]: rule-based task typing and web-service selection
//! - [`ApiRouter`]: chooses between a metered API alias and a web session,
//!   reading only credential presence and the budget state

pub mod classifier;
pub mod router;

pub use classifier::{Classifier, LAST_RESORT_SERVICE};
pub use router::{
    AliasStatus, ApiRouter, BUDGET_EXHAUSTED_REASON, RoutePath, RoutingDecision, RoutingOverride,
};
