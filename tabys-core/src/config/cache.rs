//! Content cache configuration

use super::EnvLookup;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of cached collection pages in seconds
    /// Env: TABYS_CONTENT_CACHE_TTL
    /// Default: 600 (10 minutes)
    pub content_ttl_secs: u64,

    /// Items requested per page
    /// Env: TABYS_PAGE_SIZE
    /// Default: 10
    pub page_size: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { content_ttl_secs: 600, page_size: 10 }
    }
}

impl CacheConfig {
    pub fn content_ttl(&self) -> Duration {
        Duration::from_secs(self.content_ttl_secs)
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, env: &EnvLookup) {
        if let Some(ttl) = env("TABYS_CONTENT_CACHE_TTL") {
            if let Ok(t) = ttl.parse() {
                self.content_ttl_secs = t;
            }
        }

        if let Some(size) = env("TABYS_PAGE_SIZE") {
            if let Ok(s) = size.parse() {
                self.page_size = s;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.content_ttl_secs == 0 {
            bail!("Invalid content_ttl_secs: must be greater than 0");
        }

        if !(1..=50).contains(&self.page_size) {
            bail!("Invalid page_size: must be between 1 and 50");
        }

        Ok(())
    }
}
