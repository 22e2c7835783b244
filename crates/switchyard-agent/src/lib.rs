// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task execution for the Switchyard orchestrator.
//!
//! The [`Orchestrator`] turns a prompt into an answer along the path the
//! router picks. The [`Worker`] drains the persistent queue through it and
//! stops on a [`CancellationToken`](tokio_util::sync::CancellationToken).

pub mod orchestrator;
pub mod shutdown;
pub mod worker;

pub use orchestrator::{Execution, Orchestrator};
pub use shutdown::install_signal_handler;
pub use worker::{Processed, Worker};
