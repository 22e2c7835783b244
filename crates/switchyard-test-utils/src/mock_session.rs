// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock web session for deterministic testing.
//!
//! `MockWebSession` implements `WebSessionAdapter` with pre-configured
//! replies and captures every prompt it was asked.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use switchyard_core::{ChatAdapter, SwitchyardError, WebSessionAdapter};
use tokio::sync::Mutex;

/// A mock browser session that answers from a FIFO queue.
///
/// When the queue is empty, a default "mock response" text is returned.
pub struct MockWebSession {
    service: String,
    responses: Arc<Mutex<VecDeque<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    starts: AtomicUsize,
    start_ok: AtomicBool,
    fail_asks: AtomicBool,
}

impl MockWebSession {
    /// Create a session for `service` with an empty reply queue.
    pub fn new(service: &str) -> Self {
        Self::with_responses(service, Vec::new())
    }

    /// Create a session pre-loaded with the given replies.
    pub fn with_responses(service: &str, responses: Vec<String>) -> Self {
        Self {
            service: service.to_string(),
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            prompts: Arc::new(Mutex::new(Vec::new())),
            starts: AtomicUsize::new(0),
            start_ok: AtomicBool::new(true),
            fail_asks: AtomicBool::new(false),
        }
    }

    pub async fn add_response(&self, text: String) {
        self.responses.lock().await.push_back(text);
    }

    /// Make every subsequent `start` report failure.
    pub fn refuse_start(&self) {
        self.start_ok.store(false, Ordering::SeqCst);
    }

    /// Make every subsequent `ask` return a provider error.
    pub fn fail_asks(&self, fail: bool) {
        self.fail_asks.store(fail, Ordering::SeqCst);
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatAdapter for MockWebSession {
    fn name(&self) -> &str {
        &self.service
    }

    async fn ask(&self, prompt: &str) -> Result<String, SwitchyardError> {
        self.prompts.lock().await.push(prompt.to_string());
        if self.fail_asks.load(Ordering::SeqCst) {
            return Err(SwitchyardError::Provider {
                message: format!("{} session lost", self.service),
                source: None,
            });
        }
        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string()))
    }
}

#[async_trait]
impl WebSessionAdapter for MockWebSession {
    async fn start(&self, _headless: bool) -> bool {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.start_ok.load(Ordering::SeqCst)
    }
}
