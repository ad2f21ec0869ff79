//! Session record and its key-value persistence

use crate::kv::{KeyTtl, KvBackend, KvError};
use crate::logging::mask_token;
use crate::rbac::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Authenticated binding between a chat identity and a backend admin
///
/// Stored as JSON with named fields. Optional fields default to absent and
/// unknown fields are ignored, so records written by another schema version
/// still load.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identity from the chat transport
    pub external_user_id: String,

    /// Admin id on the backend
    pub backend_admin_id: i64,

    pub role: Role,

    /// Bearer credential for backend calls (secret)
    pub access_token: String,

    #[serde(default)]
    pub display_name: Option<String>,

    /// Set once at creation
    pub created_at: DateTime<Utc>,

    /// Updated on every authenticated interaction
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// New session with `created_at == last_activity == now`
    pub fn new(
        external_user_id: impl Into<String>,
        backend_admin_id: i64,
        role: Role,
        access_token: impl Into<String>,
        display_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            external_user_id: external_user_id.into(),
            backend_admin_id,
            role,
            access_token: access_token.into(),
            display_name,
            created_at: now,
            last_activity: now,
        }
    }

    /// Update last activity time
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Display name, or a placeholder built from the admin id
    pub fn label(&self) -> String {
        self.display_name.clone().unwrap_or_else(|| format!("Admin #{}", self.backend_admin_id))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Decode a stored payload; bytes that are not UTF-8 fail like bad JSON
    pub fn from_slice(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

// Keep the bearer credential out of logs
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("external_user_id", &self.external_user_id)
            .field("backend_admin_id", &self.backend_admin_id)
            .field("role", &self.role)
            .field("access_token", &mask_token(&self.access_token))
            .field("display_name", &self.display_name)
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .finish()
    }
}

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] KvError),

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Key namespaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    pub sessions: String,
    pub rate: String,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self { sessions: "tg_session".to_string(), rate: "tg_rate".to_string() }
    }
}

/// TTL-bounded persistence for sessions and rate counters
///
/// Keys are the only addressing mechanism:
/// - sessions: `{sessions}:{external_user_id}`
/// - counters: `{rate}:{external_user_id}:{action}`
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvBackend>,
    keys: KeySpace,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvBackend>) -> Self {
        Self::with_keys(kv, KeySpace::default())
    }

    pub fn with_keys(kv: Arc<dyn KvBackend>, keys: KeySpace) -> Self {
        Self { kv, keys }
    }

    pub fn backend(&self) -> Arc<dyn KvBackend> {
        Arc::clone(&self.kv)
    }

    pub fn session_key(&self, external_user_id: &str) -> String {
        format!("{}:{}", self.keys.sessions, external_user_id)
    }

    pub fn rate_key(&self, external_user_id: &str, action: &str) -> String {
        format!("{}:{}:{}", self.keys.rate, external_user_id, action)
    }

    /// Write the full record, replacing any previous one and its TTL
    pub async fn save(&self, session: &Session, ttl: Duration) -> SessionResult<()> {
        let payload = session.to_json()?;
        self.kv.set_ex(&self.session_key(&session.external_user_id), &payload, ttl).await?;
        Ok(())
    }

    /// Rewrite a record only while it is still stored; returns whether it was
    ///
    /// A record deleted since it was read stays deleted.
    pub async fn save_existing(&self, session: &Session, ttl: Duration) -> SessionResult<bool> {
        let payload = session.to_json()?;
        let key = self.session_key(&session.external_user_id);
        Ok(self.kv.set_ex_if_exists(&key, &payload, ttl).await?)
    }

    /// Read a record
    ///
    /// A payload that does not decode is evicted and reported as absent.
    pub async fn load(&self, external_user_id: &str) -> SessionResult<Option<Session>> {
        let key = self.session_key(external_user_id);
        let Some(payload) = self.kv.get(&key).await? else {
            return Ok(None);
        };

        match Session::from_slice(&payload) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                log::error!("Failed to parse session data for {}: {}", external_user_id, e);
                self.kv.delete(&key).await?;
                Ok(None)
            }
        }
    }

    pub async fn remove(&self, external_user_id: &str) -> SessionResult<bool> {
        Ok(self.kv.delete(&self.session_key(external_user_id)).await?)
    }

    pub async fn contains(&self, external_user_id: &str) -> SessionResult<bool> {
        Ok(self.kv.exists(&self.session_key(external_user_id)).await?)
    }

    /// Reset the session TTL without rewriting the record
    pub async fn expire(&self, external_user_id: &str, ttl: Duration) -> SessionResult<bool> {
        Ok(self.kv.expire(&self.session_key(external_user_id), ttl).await?)
    }

    pub async fn session_ttl(&self, external_user_id: &str) -> SessionResult<KeyTtl> {
        Ok(self.kv.ttl(&self.session_key(external_user_id)).await?)
    }

    /// Atomically bump a rate counter, returning the new count and its TTL
    pub async fn increment_counter(
        &self,
        external_user_id: &str,
        action: &str,
    ) -> SessionResult<(i64, KeyTtl)> {
        Ok(self.kv.incr_with_ttl(&self.rate_key(external_user_id, action)).await?)
    }

    pub async fn expire_counter(
        &self,
        external_user_id: &str,
        action: &str,
        window: Duration,
    ) -> SessionResult<bool> {
        Ok(self.kv.expire(&self.rate_key(external_user_id, action), window).await?)
    }

    pub async fn counter_ttl(&self, external_user_id: &str, action: &str) -> SessionResult<KeyTtl> {
        Ok(self.kv.ttl(&self.rate_key(external_user_id, action)).await?)
    }

    pub async fn clear_counter(&self, external_user_id: &str, action: &str) -> SessionResult<bool> {
        Ok(self.kv.delete(&self.rate_key(external_user_id, action)).await?)
    }
}
