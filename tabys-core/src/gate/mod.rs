//! Request gate
//!
//! Every inbound event passes through [`RequestGate::process`] before a
//! handler sees it. In order:
//!
//! 1. rate-limit the identity for the event's action; a denial short-circuits
//!    before any session access
//! 2. load the identity's session, refreshing it on a hit
//! 3. build the access-control context from the session's role
//!
//! Handlers receive a [`RequestContext`] and must branch on
//! [`RequestContext::is_authenticated`] before trusting the session.

use crate::config::RateLimitConfig;
use crate::rbac::RbacContext;
use crate::session::{RateLimitPolicy, RateLimiter, Session, SessionManager, SessionResult};
use std::time::Duration;

/// Unit of work from the chat transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Text message; `from` is absent for channel posts and similar
    Message { from: Option<String>, text: String },
    /// Inline button press
    Callback { from: Option<String>, data: String },
    /// Anything else the transport delivers
    Other,
}

impl InboundEvent {
    pub fn message(from: impl Into<String>, text: impl Into<String>) -> Self {
        InboundEvent::Message { from: Some(from.into()), text: text.into() }
    }

    pub fn callback(from: impl Into<String>, data: impl Into<String>) -> Self {
        InboundEvent::Callback { from: Some(from.into()), data: data.into() }
    }

    /// External identity of the sender
    pub fn identity(&self) -> Option<&str> {
        match self {
            InboundEvent::Message { from, .. } | InboundEvent::Callback { from, .. } => {
                from.as_deref()
            }
            InboundEvent::Other => None,
        }
    }

    /// True for `/login` and `/login@botname` commands
    pub fn is_login_command(&self) -> bool {
        let InboundEvent::Message { text, .. } = self else {
            return false;
        };
        text.split_whitespace()
            .next()
            .and_then(|command| command.split('@').next())
            .is_some_and(|command| command == "/login")
    }

    /// Token of a `/start link_<TOKEN>` deep link
    pub fn link_token(&self) -> Option<&str> {
        let InboundEvent::Message { text, .. } = self else {
            return None;
        };
        let mut words = text.split_whitespace();
        let command = words.next()?.split('@').next()?;
        if command != "/start" {
            return None;
        }
        words.next()?.strip_prefix("link_").filter(|token| !token.is_empty())
    }
}

/// Authentication state of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Authenticated(Session),
    Anonymous,
}

/// Everything a handler needs to know about the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    auth: AuthState,
    rbac: RbacContext,
    rate_limit_remaining: Option<u32>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { auth: AuthState::Anonymous, rbac: RbacContext::anonymous(), rate_limit_remaining: None }
    }

    pub fn authenticated(session: Session) -> Self {
        let rbac = RbacContext::for_role(session.role.clone());
        Self { auth: AuthState::Authenticated(session), rbac, rate_limit_remaining: None }
    }

    pub fn with_rate_limit_remaining(mut self, remaining: Option<u32>) -> Self {
        self.rate_limit_remaining = remaining;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.auth {
            AuthState::Authenticated(session) => Some(session),
            AuthState::Anonymous => None,
        }
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn rbac(&self) -> &RbacContext {
        &self.rbac
    }

    /// Requests left in the current window, when the event was rate limited
    pub fn rate_limit_remaining(&self) -> Option<u32> {
        self.rate_limit_remaining
    }

    pub fn into_session(self) -> Option<Session> {
        match self.auth {
            AuthState::Authenticated(session) => Some(session),
            AuthState::Anonymous => None,
        }
    }
}

/// Result of gating one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Rate limit hit; the handler must not run
    TooManyRequests { action: String, retry_after: Option<Duration> },
    Proceed(RequestContext),
}

/// Composition of rate limiting, session lookup and access control
#[derive(Clone)]
pub struct RequestGate {
    sessions: SessionManager,
    limiter: RateLimiter,
    login: RateLimitPolicy,
    general: RateLimitPolicy,
}

impl RequestGate {
    pub fn new(sessions: SessionManager, limiter: RateLimiter, config: &RateLimitConfig) -> Self {
        Self {
            sessions,
            limiter,
            login: RateLimitPolicy::login(config),
            general: RateLimitPolicy::general(config),
        }
    }

    /// Policy that applies to `event`, if any
    ///
    /// Only messages are counted; callbacks ride on an earlier message.
    pub fn policy_for(&self, event: &InboundEvent) -> Option<&RateLimitPolicy> {
        match event {
            InboundEvent::Message { from: Some(_), .. }
                if event.is_login_command() || event.link_token().is_some() =>
            {
                Some(&self.login)
            }
            InboundEvent::Message { from: Some(_), .. } => Some(&self.general),
            _ => None,
        }
    }

    pub async fn process(&self, event: &InboundEvent) -> SessionResult<GateOutcome> {
        let mut remaining = None;
        if let (Some(user), Some(policy)) = (event.identity(), self.policy_for(event)) {
            let decision = self.limiter.check(user, policy).await?;
            if !decision.allowed {
                return Ok(GateOutcome::TooManyRequests {
                    action: policy.action.clone(),
                    retry_after: decision.retry_after,
                });
            }
            remaining = Some(decision.remaining);
        }

        let ctx = match event.identity() {
            Some(user) => self.resolve(user).await?,
            None => RequestContext::anonymous(),
        };
        Ok(GateOutcome::Proceed(ctx.with_rate_limit_remaining(remaining)))
    }

    /// Session lookup and refresh for one identity
    pub async fn resolve(&self, external_user_id: &str) -> SessionResult<RequestContext> {
        match self.sessions.get_session(external_user_id).await? {
            Some(mut session) => {
                if !self.sessions.refresh_session(&mut session).await? {
                    // logged out between the read and the refresh
                    return Ok(RequestContext::anonymous());
                }
                log::debug!(
                    "User {} authenticated as admin_id={}",
                    external_user_id,
                    session.backend_admin_id
                );
                Ok(RequestContext::authenticated(session))
            }
            None => Ok(RequestContext::anonymous()),
        }
    }
}
