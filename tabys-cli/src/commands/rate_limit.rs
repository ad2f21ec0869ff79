use super::connect;
use anyhow::Result;
use std::path::Path;

pub async fn reset(config: &Path, user: &str, action: &str) -> Result<()> {
    let app = connect(config).await?;
    let cleared = app.limiter().reset(user, action).await;
    app.close().await;

    if cleared? {
        println!("Cleared {} counter of {}", action, user);
    } else {
        println!("No {} counter for {}", action, user);
    }
    Ok(())
}
