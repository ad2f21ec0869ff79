//! Key-value store configuration

use super::EnvLookup;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Key-value store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connection URL
    /// Env: TABYS_REDIS_URL
    /// Default: "redis://localhost:6379/0"
    pub url: String,

    /// Per-command timeout in seconds
    /// Env: TABYS_REDIS_TIMEOUT
    /// Default: 5
    pub timeout_secs: u64,

    /// Prefix of session keys
    /// Env: TABYS_SESSION_NAMESPACE
    /// Default: "tg_session"
    pub session_namespace: String,

    /// Prefix of rate-limit counter keys
    /// Env: TABYS_RATE_NAMESPACE
    /// Default: "tg_rate"
    pub rate_namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            timeout_secs: 5,
            session_namespace: "tg_session".to_string(),
            rate_namespace: "tg_rate".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn merge(&mut self, other: Self) {
        self.url = other.url;
        self.timeout_secs = other.timeout_secs;
        self.session_namespace = other.session_namespace;
        self.rate_namespace = other.rate_namespace;
    }

    pub fn apply_env(&mut self, env: &EnvLookup) {
        if let Some(url) = env("TABYS_REDIS_URL") {
            self.url = url;
        }

        if let Some(timeout) = env("TABYS_REDIS_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }

        if let Some(ns) = env("TABYS_SESSION_NAMESPACE") {
            self.session_namespace = ns;
        }

        if let Some(ns) = env("TABYS_RATE_NAMESPACE") {
            self.rate_namespace = ns;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("redis://") || self.url.starts_with("rediss://")) {
            bail!("Invalid store url: must start with redis:// or rediss://");
        }

        if self.timeout_secs == 0 {
            bail!("Invalid store timeout_secs: must be greater than 0");
        }

        if self.session_namespace.is_empty() || self.rate_namespace.is_empty() {
            bail!("Invalid store namespaces: must not be empty");
        }

        if self.session_namespace == self.rate_namespace {
            bail!("Invalid store namespaces: sessions and rate counters must differ");
        }

        Ok(())
    }
}
