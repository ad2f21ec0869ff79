//! Backend API configuration

use super::EnvLookup;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend API configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend base URL
    /// Env: TABYS_API_URL
    /// Default: "http://localhost:8000"
    pub base_url: String,

    /// Request timeout in seconds
    /// Env: TABYS_API_TIMEOUT
    /// Default: 30
    pub timeout_secs: u64,

    /// Shared secret sent as `X-Bot-Secret` when confirming account links
    /// Env: TABYS_BOT_LINK_SECRET
    /// Default: unset (linking disabled)
    pub link_secret: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8000".to_string(), timeout_secs: 30, link_secret: None }
    }
}

// Keep the link secret out of logs
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("link_secret", &self.link_secret.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn merge(&mut self, other: Self) {
        self.base_url = other.base_url;
        self.timeout_secs = other.timeout_secs;
        self.link_secret = other.link_secret;
    }

    /// Link secret, when set to something non-blank
    pub fn link_secret(&self) -> Option<&str> {
        self.link_secret.as_deref().filter(|secret| !secret.trim().is_empty())
    }

    pub fn apply_env(&mut self, env: &EnvLookup) {
        if let Some(url) = env("TABYS_API_URL") {
            self.base_url = url;
        }

        if let Some(timeout) = env("TABYS_API_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }

        if let Some(secret) = env("TABYS_BOT_LINK_SECRET") {
            self.link_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("Invalid backend base_url: must start with http:// or https://");
        }

        if self.timeout_secs == 0 {
            bail!("Invalid backend timeout_secs: must be greater than 0");
        }

        Ok(())
    }
}
