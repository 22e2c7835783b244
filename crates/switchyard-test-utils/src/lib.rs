// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Switchyard integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without browsers or real providers.
//!
//! # Components
//!
//! - [`MockWebSession`] - Mock web session with pre-configured replies
//! - [`StaticCredentials`] - Credential source backed by a map
//! - [`TestHarness`] - Temp database, queue, cost monitor and orchestrator

pub mod credentials;
pub mod harness;
pub mod mock_session;

pub use credentials::StaticCredentials;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_session::MockWebSession;
