//! Login, logout, restore and account-link flows
//!
//! [`AuthService`] ties the backend's one-time-token exchange to the local
//! session store. A failed verification never writes a session; a failed
//! backend logout never blocks the local delete.

use crate::gateway::{AdminBackend, ApiError, LinkOutcome, ProfileHints};
use crate::logging;
use crate::session::{Session, SessionError, SessionManager};
use std::sync::Arc;

/// Length of a one-time token
pub const TOKEN_LEN: usize = 8;

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("One-time token is missing")]
    MissingToken,

    #[error("One-time token must be 8 letters or digits")]
    InvalidTokenFormat,

    #[error("Already authenticated as {role}")]
    AlreadyAuthenticated { role: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result of a logout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoutOutcome {
    /// A local session existed and was deleted
    pub had_session: bool,
    /// The backend acknowledged the logout
    pub backend_notified: bool,
}

/// Trim, upper-case and check a one-time token
pub fn normalize_token(raw: &str) -> Result<String, AuthError> {
    let token = raw.trim().to_uppercase();
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    if token.len() != TOKEN_LEN || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AuthError::InvalidTokenFormat);
    }
    Ok(token)
}

#[derive(Clone)]
pub struct AuthService {
    backend: Arc<dyn AdminBackend>,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(backend: Arc<dyn AdminBackend>, sessions: SessionManager) -> Self {
        Self { backend, sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Verify a one-time token and open a session
    pub async fn login(
        &self,
        external_user_id: &str,
        raw_token: &str,
        hints: &ProfileHints,
    ) -> Result<Session, AuthError> {
        if let Some(existing) = self.sessions.get_session(external_user_id).await? {
            return Err(AuthError::AlreadyAuthenticated { role: existing.role.to_string() });
        }

        let token = match normalize_token(raw_token) {
            Ok(token) => token,
            Err(e) => {
                logging::auth_event("login", external_user_id, false, Some("Invalid OTP format"));
                return Err(e);
            }
        };

        let grant = match self.backend.verify_one_time_token(&token, external_user_id, hints).await
        {
            Ok(grant) => grant,
            Err(e) => {
                logging::auth_event("login", external_user_id, false, Some(e.user_message()));
                return Err(e.into());
            }
        };

        let detail = format!("admin_id={} role={}", grant.admin_id, grant.role);
        let session = self
            .sessions
            .create_session(
                external_user_id,
                grant.admin_id,
                grant.role.clone(),
                &grant.access_token,
                grant.display_name(),
            )
            .await?;
        logging::auth_event("login", external_user_id, true, Some(&detail));
        Ok(session)
    }

    /// Close the session locally, notifying the backend first
    pub async fn logout(&self, external_user_id: &str) -> Result<LogoutOutcome, AuthError> {
        if !self.sessions.session_exists(external_user_id).await? {
            return Ok(LogoutOutcome { had_session: false, backend_notified: false });
        }

        let backend_notified = match self.backend.logout(external_user_id).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Backend logout failed: {}", e);
                false
            }
        };

        let had_session = self.sessions.delete_session(external_user_id).await?;
        logging::auth_event("logout", external_user_id, true, None);
        Ok(LogoutOutcome { had_session, backend_notified })
    }

    /// Re-open a session from the backend without a new token
    pub async fn restore(&self, external_user_id: &str) -> Result<Session, AuthError> {
        let grant = match self.backend.restore_session(external_user_id).await {
            Ok(grant) => grant,
            Err(e) => {
                logging::auth_event("restore", external_user_id, false, Some(e.user_message()));
                return Err(e.into());
            }
        };

        let session = self
            .sessions
            .create_session(
                external_user_id,
                grant.admin_id,
                grant.role.clone(),
                &grant.access_token,
                grant.display_name(),
            )
            .await?;
        logging::auth_event("restore", external_user_id, true, None);
        Ok(session)
    }

    /// Bind this chat identity to a regular user account
    ///
    /// Opens no session; the outcome only decides what the user is told.
    pub async fn link_account(
        &self,
        external_user_id: &str,
        raw_token: &str,
        hints: &ProfileHints,
    ) -> Result<LinkOutcome, AuthError> {
        let token = raw_token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        match self.backend.confirm_link(token, external_user_id, hints).await {
            Ok(outcome) => {
                let reason = match &outcome {
                    LinkOutcome::Linked { .. } => None,
                    LinkOutcome::InvalidToken => Some("Invalid or expired link token"),
                    LinkOutcome::Refused { detail } => Some(detail.as_str()),
                    LinkOutcome::AlreadyLinked => Some("Already linked to another account"),
                };
                logging::auth_event("link", external_user_id, reason.is_none(), reason);
                Ok(outcome)
            }
            Err(e) => {
                logging::auth_event("link", external_user_id, false, Some(e.user_message()));
                Err(e.into())
            }
        }
    }
}
