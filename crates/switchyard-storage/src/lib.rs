// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Switchyard.
//!
//! One database file holds the task queue, the usage ledger, and budget
//! events. Schema changes ship as embedded refinery migrations.

pub mod database;
pub mod migrations;
pub mod queue;

pub use database::{Database, map_tr_err};
pub use queue::{QueueStats, TaskQueue};
