// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cost metering for Switchyard.
//!
//! - **Ledger**: one row per metered call, successful or failed
//! - **Budget**: daily ceiling with de-duplicated warn/exceeded events
//! - **Pricing**: per-million-token cost calculation
//! - **Report**: daily stats, recent calls, multi-day history

pub mod budget;
pub mod ledger;
pub mod pricing;
pub mod recording;
pub mod report;

pub use ledger::CostMonitor;
pub use pricing::{ModelPricing, calculate_cost};
pub use report::{DailySpend, DayStats, SpendBreakdown};
