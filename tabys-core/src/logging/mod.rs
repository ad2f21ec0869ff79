//! Tabys logging
//!
//! Everything logs through the standard `log` facade; [`init_logging`]
//! installs `env_logger` as the backend once at startup. The helpers below
//! give audit events a fixed prefix so they can be grepped out of mixed
//! output:
//!
//! - `[AUTH:SUCCESS]` / `[AUTH:FAILED]` - login, logout and restore outcomes
//! - `[RBAC:DENIED]` - permission checks that failed
//! - `[API]` - backend calls
//!
//! # Example
//!
//! ```rust,no_run
//! use tabys_core::config::LoggingConfig;
//!
//! tabys_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("Bot starting");
//! ```

use crate::config::LoggingConfig;
use crate::rbac::{Module, Operation};
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Dependencies that are too chatty at info level
const NOISY_TARGETS: [&str; 4] = ["reqwest", "hyper", "hyper_util", "redis"];

/// Initialize logging
///
/// The configured level is the default; `RUST_LOG` directives, when set, are
/// applied on top. Safe to call multiple times; only the first call installs
/// the logger.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level = config.level_filter()?;
    let json = config.format == "json";

    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        // Another logger may already be installed by the host program
        let _ = builder(level, json, rust_log.as_deref()).try_init();
    });

    log::info!("Logging configured with level: {}", level);
    Ok(())
}

fn builder(level: log::LevelFilter, json: bool, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    for target in NOISY_TARGETS {
        builder.filter_module(target, level.min(log::LevelFilter::Warn));
    }
    if let Some(spec) = rust_log {
        builder.parse_filters(spec);
    }

    if json {
        builder.format(|buf, record| {
            let entry = serde_json::json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", entry)
        });
    } else {
        builder.format_timestamp_millis();
    }
    builder
}

/// Authentication event
pub fn auth_event(event: &str, external_user_id: &str, success: bool, detail: Option<&str>) {
    let status = if success { "SUCCESS" } else { "FAILED" };
    let mut msg = format!("[AUTH:{}] {} | user_id={}", status, event, external_user_id);
    if let Some(detail) = detail {
        msg.push_str(" | ");
        msg.push_str(detail);
    }

    if success {
        log::info!("{}", msg);
    } else {
        log::warn!("{}", msg);
    }
}

/// Failed permission check
pub fn permission_denied(role: &str, module: Module, operation: Operation) {
    log::warn!("[RBAC:DENIED] role={} | cannot {} {}", role, operation, module);
}

/// Backend call; `status` is `Err` with a short description on transport failure
pub fn api_call(method: &str, path: &str, status: Result<u16, &str>) {
    match status {
        Ok(code) if code < 400 => log::info!("[API] {} {} | {}", method, path, code),
        Ok(code) => log::warn!("[API] {} {} | {}", method, path, code),
        Err(error) => log::error!("[API] {} {} | ERROR: {}", method, path, error),
    }
}

/// Render a secret as its first four characters plus its length
pub fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…({})", prefix, token.chars().count())
}
