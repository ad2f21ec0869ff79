//! Sessions configuration

use super::EnvLookup;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sessions configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Session lifetime in seconds, renewed on every use
    /// Env: TABYS_SESSION_TTL
    /// Default: 86400 (24 hours)
    pub ttl_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { ttl_secs: 86_400 }
    }
}

impl SessionsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn merge(&mut self, other: Self) {
        self.ttl_secs = other.ttl_secs;
    }

    pub fn apply_env(&mut self, env: &EnvLookup) {
        if let Some(ttl) = env("TABYS_SESSION_TTL") {
            if let Ok(t) = ttl.parse() {
                self.ttl_secs = t;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            bail!("Invalid session ttl_secs: must be greater than 0");
        }

        Ok(())
    }
}
