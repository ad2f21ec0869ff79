use super::connect;
use anyhow::Result;
use std::path::Path;
use tabys_core::logging::mask_token;
use tabys_core::session::Session;

pub async fn show(config: &Path, user: &str) -> Result<()> {
    let app = connect(config).await?;
    let session = app.sessions().get_session(user).await?;
    let ttl = app.sessions().remaining_ttl(user).await?;
    app.close().await;

    match session {
        Some(session) => {
            print!("{}", describe(&session));
            if let Some(ttl) = ttl {
                println!("expires in  {}s", ttl.as_secs());
            }
        }
        None => println!("No session for {}", user),
    }
    Ok(())
}

pub async fn revoke(config: &Path, user: &str, notify_backend: bool) -> Result<()> {
    let app = connect(config).await?;
    let result = if notify_backend {
        app.logout(user).await.map(|outcome| outcome.had_session).map_err(anyhow::Error::from)
    } else {
        app.sessions().delete_session(user).await.map_err(anyhow::Error::from)
    };
    app.close().await;

    if result? {
        println!("Session of {} revoked", user);
    } else {
        println!("No session for {}", user);
    }
    Ok(())
}

/// Session fields with the access token masked
pub fn describe(session: &Session) -> String {
    format!(
        "user        {}\nadmin       {} ({})\nrole        {}\ntoken       {}\ncreated     {}\nlast seen   {}\n",
        session.external_user_id,
        session.backend_admin_id,
        session.label(),
        session.role,
        mask_token(&session.access_token),
        session.created_at.to_rfc3339(),
        session.last_activity.to_rfc3339(),
    )
}
