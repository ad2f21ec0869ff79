//! Configuration system for Tabys
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Environment Variables** (`TABYS_*`)
//! 2. **Config File** (tabys.toml)
//! 3. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use tabys_core::config::TabysConfig;
//!
//! let config = TabysConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod backend;
pub mod cache;
pub mod logging;
pub mod rate_limit;
pub mod sessions;
pub mod store;

pub use backend::BackendConfig;
pub use cache::CacheConfig;
pub use logging::LoggingConfig;
pub use rate_limit::RateLimitConfig;
pub use sessions::SessionsConfig;
pub use store::StoreConfig;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lookup used to read overrides, `std::env::var` outside of tests
pub type EnvLookup = dyn Fn(&str) -> Option<String>;

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "tabys.toml";

/// Complete Tabys configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabysConfig {
    pub backend: BackendConfig,
    pub store: StoreConfig,
    pub sessions: SessionsConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl TabysConfig {
    /// Load configuration with full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file (skipped when missing), then the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.backend.merge(other.backend);
        self.store.merge(other.store);
        self.sessions.merge(other.sessions);
        self.rate_limit.merge(other.rate_limit);
        self.cache.merge(other.cache);
        self.logging.merge(other.logging);
    }

    /// Apply `TABYS_*` environment variables
    pub fn apply_env_vars(&mut self) {
        self.apply_env(&|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_env(&mut self, env: &EnvLookup) {
        self.backend.apply_env(env);
        self.store.apply_env(env);
        self.sessions.apply_env(env);
        self.rate_limit.apply_env(env);
        self.cache.apply_env(env);
        self.logging.apply_env(env);
    }

    /// Validate configuration
    ///
    /// Every section is checked; the error lists the first problem of each
    /// failing section.
    pub fn validate(&self) -> Result<()> {
        let problems: Vec<String> = [
            self.backend.validate(),
            self.store.validate(),
            self.sessions.validate(),
            self.rate_limit.validate(),
            self.cache.validate(),
            self.logging.validate(),
        ]
        .into_iter()
        .filter_map(|result| result.err().map(|e| e.to_string()))
        .collect();

        match problems.as_slice() {
            [] => Ok(()),
            [only] => bail!("{}", only),
            many => bail!("Invalid configuration:\n  - {}", many.join("\n  - ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TabysConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.store.url, "redis://localhost:6379/0");
        assert_eq!(config.store.session_namespace, "tg_session");
        assert_eq!(config.store.rate_namespace, "tg_rate");
        assert_eq!(config.sessions.ttl_secs, 86_400);
        assert_eq!(config.rate_limit.login_max, 5);
        assert_eq!(config.rate_limit.general_max, 30);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.cache.content_ttl_secs, 600);
        assert_eq!(config.cache.page_size, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation() {
        assert!(TabysConfig::default().validate().is_ok());

        let mut config = TabysConfig::default();
        config.cache.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = TabysConfig::default();
        config.cache.page_size = 51;
        assert!(config.validate().is_err());

        let mut config = TabysConfig::default();
        config.backend.base_url = "ftp://example.org".into();
        assert!(config.validate().is_err());

        let mut config = TabysConfig::default();
        config.store.url = "http://localhost:6379".into();
        assert!(config.validate().is_err());

        let mut config = TabysConfig::default();
        config.rate_limit.window_secs = 0;
        assert!(config.validate().is_err());

        let mut config = TabysConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = TabysConfig::default();
        config.store.rate_namespace = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_reports_every_section() {
        let mut config = TabysConfig::default();
        config.backend.base_url = "ftp://example.org".into();
        config.cache.page_size = 0;
        config.logging.format = "xml".into();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.starts_with("Invalid configuration:"));
        assert!(message.contains("base_url"));
        assert!(message.contains("page_size"));
        assert!(message.contains("format"));
        assert_eq!(message.lines().count(), 4);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TabysConfig::default();
        config.apply_env(&lookup(&[
            ("TABYS_API_URL", "https://api.tabys.kz"),
            ("TABYS_REDIS_URL", "rediss://cache:6380/2"),
            ("TABYS_SESSION_TTL", "3600"),
            ("TABYS_LOGIN_RATE_LIMIT", "3"),
            ("TABYS_PAGE_SIZE", "not-a-number"),
            ("TABYS_LOG_LEVEL", "debug"),
            ("TABYS_BOT_LINK_SECRET", "s3cret"),
        ]));

        assert_eq!(config.backend.link_secret(), Some("s3cret"));
        assert!(!format!("{:?}", config.backend).contains("s3cret"));

        assert_eq!(config.backend.base_url, "https://api.tabys.kz");
        assert_eq!(config.store.url, "rediss://cache:6380/2");
        assert_eq!(config.sessions.ttl_secs, 3600);
        assert_eq!(config.rate_limit.login_max, 3);
        // unparseable values are ignored
        assert_eq!(config.cache.page_size, 10);
        assert_eq!(config.logging.level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[backend]
base_url = "https://admin.example.org"

[rate_limit]
general_max = 60
"#
        )
        .unwrap();

        let config = TabysConfig::from_file(file.path()).unwrap();
        assert_eq!(config.backend.base_url, "https://admin.example.org");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.rate_limit.general_max, 60);
        assert_eq!(config.rate_limit.login_max, 5);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TabysConfig::load_from(dir.path().join("absent.toml")).is_ok());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend\nbase_url = 1").unwrap();
        let err = TabysConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML config"));
    }
}
