pub mod config;
pub mod permissions;
pub mod probe;
pub mod rate_limit;
pub mod session;

use anyhow::Result;
use std::path::Path;
use tabys_core::{App, TabysConfig};

/// Load the config and start logging
fn load_config(path: &Path) -> Result<TabysConfig> {
    let config = TabysConfig::load_from(path)?;
    config.validate()?;
    tabys_core::logging::init_logging(&config.logging)?;
    Ok(config)
}

/// Load the config and connect
async fn connect(path: &Path) -> Result<App> {
    App::connect(load_config(path)?).await
}
