// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential lookup for metered providers.

use secrecy::{ExposeSecret, SecretString};

/// Resolves a credential name (e.g. `DEEPSEEK_API_KEY`) to a secret.
pub trait CredentialSource: Send + Sync {
    /// Returns the secret, or `None` when it is unset or blank.
    fn lookup(&self, name: &str) -> Option<SecretString>;

    fn is_present(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// Reads credentials from the process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn lookup(&self, name: &str) -> Option<SecretString> {
        let value = std::env::var(name).ok()?;
        let secret = SecretString::from(value.trim().to_string());
        if secret.expose_secret().is_empty() {
            None
        } else {
            Some(secret)
        }
    }
}
