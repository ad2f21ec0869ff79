//! Logging configuration

use super::EnvLookup;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: TABYS_LOG_LEVEL
    pub level: String,
    /// "text" or "json"
    /// Env: TABYS_LOG_FORMAT
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "text".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, env: &EnvLookup) {
        if let Some(level) = env("TABYS_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = env("TABYS_LOG_FORMAT") {
            self.format = format;
        }
    }

    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        match self.level.to_ascii_lowercase().as_str() {
            "off" => Ok(log::LevelFilter::Off),
            "error" => Ok(log::LevelFilter::Error),
            "warn" | "warning" => Ok(log::LevelFilter::Warn),
            "info" => Ok(log::LevelFilter::Info),
            "debug" => Ok(log::LevelFilter::Debug),
            "trace" => Ok(log::LevelFilter::Trace),
            other => bail!("Invalid log level: {}", other),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.level_filter()?;
        if !["text", "json"].contains(&self.format.as_str()) {
            bail!("Invalid log format: must be text or json");
        }
        Ok(())
    }
}
