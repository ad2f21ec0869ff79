use super::load_config;
use anyhow::{bail, Result};
use std::path::Path;
use tabys_core::gateway::HttpGateway;
use tabys_core::kv::{KvBackend, RedisKv};

pub async fn run(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let mut failures = 0;

    let kv = RedisKv::new(&config.store.url, config.store.timeout())?;
    match kv.ping().await {
        Ok(()) => println!("redis    ok"),
        Err(e) => {
            println!("redis    FAILED: {}", e);
            failures += 1;
        }
    }
    kv.close().await?;

    let gateway = HttpGateway::from_config(&config.backend);
    match gateway.probe().await {
        Ok(status) => println!("backend  ok (HTTP {})", status),
        Err(e) => {
            println!("backend  FAILED: {}", e);
            failures += 1;
        }
    }
    gateway.shutdown();

    if failures > 0 {
        bail!("{} of 2 checks failed", failures);
    }
    Ok(())
}
