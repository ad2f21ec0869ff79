//! Session lifecycle management
//!
//! The SessionManager creates, reads, refreshes and deletes session records
//! and owns the TTL policy: every write renews the record to the full
//! configured window (sliding expiration). Presence in the store is the only
//! signal of "authenticated"; expiry removes a session silently, so callers
//! treat "not found" exactly like "logged out".

use super::store::{Session, SessionResult, SessionStore};
use crate::kv::KeyTtl;
use crate::rbac::Role;
use std::time::Duration;

/// Default session lifetime (24 hours)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(86_400);

/// Session manager configuration
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Lifetime granted on creation and on every refresh
    pub ttl: Duration,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_SESSION_TTL }
    }
}

impl SessionManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Session manager that handles session lifecycle
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tabys_core::kv::MemoryKv;
/// use tabys_core::rbac::Role;
/// use tabys_core::session::{SessionManager, SessionStore};
///
/// let manager = SessionManager::new(SessionStore::new(Arc::new(MemoryKv::new())));
/// let session = manager.create_session("42", 7, Role::Npo, "token", None).await?;
/// ```
#[derive(Clone)]
pub struct SessionManager {
    store: SessionStore,
    config: SessionManagerConfig,
}

impl SessionManager {
    pub fn new(store: SessionStore) -> Self {
        Self::with_config(store, SessionManagerConfig::default())
    }

    pub fn with_config(store: SessionStore, config: SessionManagerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    /// Create and persist a session, replacing any prior one for the identity
    pub async fn create_session(
        &self,
        external_user_id: &str,
        backend_admin_id: i64,
        role: Role,
        access_token: &str,
        display_name: Option<String>,
    ) -> SessionResult<Session> {
        let session =
            Session::new(external_user_id, backend_admin_id, role, access_token, display_name);
        self.store.save(&session, self.config.ttl).await?;
        log::info!("Session created for external_user_id={}", external_user_id);
        Ok(session)
    }

    /// Load a session; corrupt records are evicted and reported as absent
    pub async fn get_session(&self, external_user_id: &str) -> SessionResult<Option<Session>> {
        self.store.load(external_user_id).await
    }

    /// Mark activity and rewrite the record with a renewed TTL
    ///
    /// Returns false when the record is gone (logged out or expired since it
    /// was read); nothing is written then. Concurrent refreshes of the same
    /// identity race; the last write wins, which only affects `last_activity`.
    pub async fn refresh_session(&self, session: &mut Session) -> SessionResult<bool> {
        session.touch();
        self.store.save_existing(session, self.config.ttl).await
    }

    /// Renew the TTL without rewriting the record
    pub async fn touch_ttl(&self, external_user_id: &str) -> SessionResult<bool> {
        self.store.expire(external_user_id, self.config.ttl).await
    }

    /// Delete a session; returns whether one existed
    pub async fn delete_session(&self, external_user_id: &str) -> SessionResult<bool> {
        let removed = self.store.remove(external_user_id).await?;
        if removed {
            log::info!("Session deleted for external_user_id={}", external_user_id);
        }
        Ok(removed)
    }

    pub async fn session_exists(&self, external_user_id: &str) -> SessionResult<bool> {
        self.store.contains(external_user_id).await
    }

    /// Remaining lifetime of a session, `None` when absent
    pub async fn remaining_ttl(&self, external_user_id: &str) -> SessionResult<Option<Duration>> {
        Ok(match self.store.session_ttl(external_user_id).await? {
            KeyTtl::Expires(d) => Some(d),
            KeyTtl::Persistent | KeyTtl::Missing => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use std::sync::Arc;

    fn manager() -> SessionManager {
        SessionManager::new(SessionStore::new(Arc::new(MemoryKv::new())))
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let manager = manager();
        manager.create_session("X", 11, Role::Administrator, "tok", None).await.unwrap();

        let session = manager.get_session("X").await.unwrap().unwrap();
        assert_eq!(session.created_at, session.last_activity);
        assert_eq!(session.role, Role::Administrator);
        assert_eq!(session.backend_admin_id, 11);
        assert_eq!(session.access_token, "tok");
        assert!(manager.session_exists("X").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_overwrites() {
        let manager = manager();
        manager.create_session("X", 1, Role::Npo, "first", None).await.unwrap();
        manager.create_session("X", 2, Role::Msb, "second", Some("B".into())).await.unwrap();

        let session = manager.get_session("X").await.unwrap().unwrap();
        assert_eq!(session.backend_admin_id, 2);
        assert_eq!(session.role, Role::Msb);
        assert_eq!(session.access_token, "second");
        assert_eq!(session.display_name.as_deref(), Some("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_renews_ttl_and_activity() {
        let manager = manager();
        let mut session = manager.create_session("X", 1, Role::Npo, "t", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(
            manager.remaining_ttl("X").await.unwrap(),
            Some(DEFAULT_SESSION_TTL - Duration::from_secs(3600))
        );

        // wall clock still moves while tokio time is paused
        std::thread::sleep(std::time::Duration::from_millis(5));
        let before = session.last_activity;
        assert!(manager.refresh_session(&mut session).await.unwrap());
        assert!(session.last_activity > before);
        assert_eq!(manager.remaining_ttl("X").await.unwrap(), Some(DEFAULT_SESSION_TTL));

        let stored = manager.get_session("X").await.unwrap().unwrap();
        assert_eq!(stored.last_activity, session.last_activity);
        assert_eq!(stored.created_at, session.created_at);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expires() {
        let config = SessionManagerConfig::new().with_ttl(Duration::from_secs(60));
        let manager = SessionManager::with_config(
            SessionStore::new(Arc::new(MemoryKv::new())),
            config,
        );
        manager.create_session("X", 1, Role::Npo, "t", None).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(manager.touch_ttl("X").await.unwrap());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(manager.get_session("X").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(manager.get_session("X").await.unwrap().is_none());
        assert!(!manager.touch_ttl("X").await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_after_delete_stays_deleted() {
        let manager = manager();
        manager.create_session("U1", 1, Role::Npo, "t", None).await.unwrap();

        let mut loaded = manager.get_session("U1").await.unwrap().unwrap();
        assert!(manager.delete_session("U1").await.unwrap());

        assert!(!manager.refresh_session(&mut loaded).await.unwrap());
        assert!(manager.get_session("U1").await.unwrap().is_none());
        assert_eq!(manager.remaining_ttl("U1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let manager = manager();
        manager.create_session("X", 1, Role::Npo, "t", None).await.unwrap();

        assert!(manager.delete_session("X").await.unwrap());
        assert!(manager.get_session("X").await.unwrap().is_none());
        assert!(!manager.delete_session("X").await.unwrap());
        assert_eq!(manager.remaining_ttl("X").await.unwrap(), None);
    }
}
