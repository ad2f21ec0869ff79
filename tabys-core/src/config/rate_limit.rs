//! Rate limiting configuration

use super::EnvLookup;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Max login attempts per window
    /// Env: TABYS_LOGIN_RATE_LIMIT
    /// Default: 5
    pub login_max: u32,

    /// Max general requests per window
    /// Env: TABYS_GENERAL_RATE_LIMIT
    /// Default: 30
    pub general_max: u32,

    /// Window length in seconds
    /// Env: TABYS_RATE_WINDOW
    /// Default: 60
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { login_max: 5, general_max: 30, window_secs: 60 }
    }
}

impl RateLimitConfig {
    pub fn merge(&mut self, other: Self) {
        self.login_max = other.login_max;
        self.general_max = other.general_max;
        self.window_secs = other.window_secs;
    }

    pub fn apply_env(&mut self, env: &EnvLookup) {
        if let Some(max) = env("TABYS_LOGIN_RATE_LIMIT") {
            if let Ok(m) = max.parse() {
                self.login_max = m;
            }
        }

        if let Some(max) = env("TABYS_GENERAL_RATE_LIMIT") {
            if let Ok(m) = max.parse() {
                self.general_max = m;
            }
        }

        if let Some(window) = env("TABYS_RATE_WINDOW") {
            if let Ok(w) = window.parse() {
                self.window_secs = w;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.login_max == 0 || self.general_max == 0 {
            bail!("Invalid rate limits: must be greater than 0");
        }

        if self.window_secs == 0 {
            bail!("Invalid rate window_secs: must be greater than 0");
        }

        Ok(())
    }
}
