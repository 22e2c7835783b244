// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential source.

use std::collections::HashMap;

use secrecy::SecretString;
use switchyard_core::CredentialSource;

/// Credentials from a fixed map instead of the process environment.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    keys: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential. Blank values are treated as unset.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.keys.insert(name.to_string(), value.to_string());
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn lookup(&self, name: &str) -> Option<SecretString> {
        self.keys
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::from(v.to_string()))
    }
}
