//! Composition root
//!
//! [`App`] owns the key-value connection and the backend client and wires
//! the services on top of them. Nothing in the crate keeps global state;
//! tests build isolated instances with [`App::from_parts`].

use crate::auth::{AuthError, AuthService, LogoutOutcome};
use crate::config::TabysConfig;
use crate::content::ContentService;
use crate::gate::{GateOutcome, InboundEvent, RequestGate};
use crate::gateway::{AdminBackend, HttpGateway, ProfileHints};
use crate::kv::{KvBackend, RedisKv};
use crate::session::{
    KeySpace, RateLimiter, Session, SessionManager, SessionManagerConfig, SessionResult,
    SessionStore,
};
use anyhow::{Context, Result};
use std::sync::Arc;

pub struct App {
    config: TabysConfig,
    kv: Arc<dyn KvBackend>,
    backend: Arc<dyn AdminBackend>,
    sessions: SessionManager,
    limiter: RateLimiter,
    gate: RequestGate,
    auth: AuthService,
    content: ContentService,
}

impl App {
    /// Validate the config, connect to Redis and build every service
    pub async fn connect(config: TabysConfig) -> Result<Self> {
        config.validate()?;

        let kv = RedisKv::new(&config.store.url, config.store.timeout())?;
        kv.connect().await.context("Failed to connect to Redis")?;
        let backend = HttpGateway::from_config(&config.backend);

        log::info!("Tabys core ready");
        log::info!("   Backend: {}", backend.base_url());
        log::info!("   Session TTL: {}s", config.sessions.ttl_secs);
        log::info!(
            "   Rate limits: login {}/{}s, general {}/{}s",
            config.rate_limit.login_max,
            config.rate_limit.window_secs,
            config.rate_limit.general_max,
            config.rate_limit.window_secs
        );

        Ok(Self::from_parts(config, Arc::new(kv), Arc::new(backend)))
    }

    /// Build on top of already constructed backends
    pub fn from_parts(
        config: TabysConfig,
        kv: Arc<dyn KvBackend>,
        backend: Arc<dyn AdminBackend>,
    ) -> Self {
        let keys = KeySpace {
            sessions: config.store.session_namespace.clone(),
            rate: config.store.rate_namespace.clone(),
        };
        let store = SessionStore::with_keys(Arc::clone(&kv), keys);
        let sessions = SessionManager::with_config(
            store.clone(),
            SessionManagerConfig::new().with_ttl(config.sessions.ttl()),
        );
        let limiter = RateLimiter::new(store);
        let gate = RequestGate::new(sessions.clone(), limiter.clone(), &config.rate_limit);
        let auth = AuthService::new(Arc::clone(&backend), sessions.clone());
        let content = ContentService::new(Arc::clone(&backend), &config.cache);

        Self { config, kv, backend, sessions, limiter, gate, auth, content }
    }

    pub fn config(&self) -> &TabysConfig {
        &self.config
    }

    pub fn kv(&self) -> &Arc<dyn KvBackend> {
        &self.kv
    }

    pub fn backend(&self) -> &Arc<dyn AdminBackend> {
        &self.backend
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn content(&self) -> &ContentService {
        &self.content
    }

    /// Run an inbound event through the request gate
    pub async fn handle(&self, event: &InboundEvent) -> SessionResult<GateOutcome> {
        self.gate.process(event).await
    }

    /// Log in and drop pages cached under an earlier session of the identity
    pub async fn login(
        &self,
        external_user_id: &str,
        raw_token: &str,
        hints: &ProfileHints,
    ) -> Result<Session, AuthError> {
        let session = self.auth.login(external_user_id, raw_token, hints).await?;
        self.content.invalidate_user(external_user_id);
        Ok(session)
    }

    /// Restore a session from the backend, dropping stale cached pages
    pub async fn restore(&self, external_user_id: &str) -> Result<Session, AuthError> {
        let session = self.auth.restore(external_user_id).await?;
        self.content.invalidate_user(external_user_id);
        Ok(session)
    }

    /// Log out and forget the identity's cached pages
    pub async fn logout(&self, external_user_id: &str) -> Result<LogoutOutcome, AuthError> {
        let outcome = self.auth.logout(external_user_id).await?;
        self.content.invalidate_user(external_user_id);
        Ok(outcome)
    }

    /// Release the backend client and the Redis connection
    pub async fn close(&self) {
        self.backend.close().await;
        if let Err(e) = self.kv.close().await {
            log::warn!("Failed to close key-value store: {}", e);
        }
    }
}
