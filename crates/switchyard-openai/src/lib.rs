// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter for OpenAI-compatible Chat Completions providers.
//!
//! DashScope, DeepSeek, Groq, Mistral and any other endpoint that speaks
//! `POST /chat/completions` with bearer auth are served by one
//! [`ApiAdapter`], configured per alias from the provider table.

pub mod client;
pub mod types;

pub use client::{ApiAdapter, DEFAULT_TEMPERATURE};
