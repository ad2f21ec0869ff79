//! Fixed-window rate limiting per (identity, action)
//!
//! Each request atomically increments the window counter and reads its TTL.
//! The first increment of a window finds no expiry and attaches one, so the
//! counter disappears when the window elapses. Bursts straddling a window
//! boundary are accepted.

use super::store::{SessionResult, SessionStore};
use crate::config::RateLimitConfig;
use crate::kv::KeyTtl;
use std::time::Duration;

/// Limit for one named action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub action: String,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(action: impl Into<String>, max_requests: u32, window: Duration) -> Self {
        Self { action: action.into(), max_requests, window }
    }

    /// Login attempts (`login`)
    pub fn login(config: &RateLimitConfig) -> Self {
        Self::new("login", config.login_max, Duration::from_secs(config.window_secs))
    }

    /// Everything else (`general`)
    pub fn general(config: &RateLimitConfig) -> Self {
        Self::new("general", config.general_max, Duration::from_secs(config.window_secs))
    }
}

/// Result of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the window resets, reported on denial
    pub retry_after: Option<Duration>,
}

/// Rate limiter over the session store's counters
#[derive(Clone)]
pub struct RateLimiter {
    store: SessionStore,
}

impl RateLimiter {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Count one request against `policy`
    pub async fn check(
        &self,
        external_user_id: &str,
        policy: &RateLimitPolicy,
    ) -> SessionResult<RateLimitDecision> {
        let (count, ttl) = self.store.increment_counter(external_user_id, &policy.action).await?;

        let mut window_left = ttl.remaining();
        if ttl == KeyTtl::Persistent {
            self.store.expire_counter(external_user_id, &policy.action, policy.window).await?;
            window_left = Some(policy.window);
        }

        let max = i64::from(policy.max_requests);
        let allowed = count <= max;
        let remaining = (max - count).max(0) as u32;

        if !allowed {
            log::warn!(
                "Rate limit exceeded for user={} action={}",
                external_user_id,
                policy.action
            );
        }

        Ok(RateLimitDecision {
            allowed,
            remaining,
            retry_after: if allowed { None } else { window_left },
        })
    }

    /// Clear the counter unconditionally
    pub async fn reset(&self, external_user_id: &str, action: &str) -> SessionResult<bool> {
        self.store.clear_counter(external_user_id, action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvBackend, MemoryKv};
    use std::sync::Arc;

    fn limiter() -> (RateLimiter, MemoryKv) {
        let kv = MemoryKv::new();
        (RateLimiter::new(SessionStore::new(Arc::new(kv.clone()))), kv)
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_per_minute() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new("login", 5, Duration::from_secs(60));

        for expected in [4, 3, 2, 1, 0] {
            let decision = limiter.check("U1", &policy).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected);
            assert_eq!(decision.retry_after, None);
        }

        let sixth = limiter.check("U1", &policy).await.unwrap();
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
        assert_eq!(sixth.retry_after, Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(61)).await;
        let after = limiter.check("U1", &policy).await.unwrap();
        assert!(after.allowed);
        assert_eq!(after.remaining, 4);
    }

    #[tokio::test]
    async fn test_actions_are_independent() {
        let (limiter, _) = limiter();
        let login = RateLimitPolicy::new("login", 1, Duration::from_secs(60));
        let general = RateLimitPolicy::new("general", 30, Duration::from_secs(60));

        assert!(limiter.check("U1", &login).await.unwrap().allowed);
        assert!(!limiter.check("U1", &login).await.unwrap().allowed);

        let decision = limiter.check("U1", &general).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 29);

        // other identities have their own counters
        assert!(limiter.check("U2", &login).await.unwrap().allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_hit_attaches_window() {
        let (limiter, kv) = limiter();
        let policy = RateLimitPolicy::new("general", 30, Duration::from_secs(60));

        limiter.check("U1", &policy).await.unwrap();
        assert_eq!(
            kv.ttl("tg_rate:U1:general").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(60))
        );
    }

    #[tokio::test]
    async fn test_reset() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new("login", 1, Duration::from_secs(60));

        limiter.check("U1", &policy).await.unwrap();
        assert!(!limiter.check("U1", &policy).await.unwrap().allowed);

        assert!(limiter.reset("U1", "login").await.unwrap());
        assert!(limiter.check("U1", &policy).await.unwrap().allowed);
        assert!(limiter.reset("U1", "login").await.unwrap());
        assert!(!limiter.reset("U1", "login").await.unwrap());
    }

    #[test]
    fn test_policies_from_config() {
        let config = RateLimitConfig::default();
        assert_eq!(
            RateLimitPolicy::login(&config),
            RateLimitPolicy::new("login", 5, Duration::from_secs(60))
        );
        assert_eq!(
            RateLimitPolicy::general(&config),
            RateLimitPolicy::new("general", 30, Duration::from_secs(60))
        );
    }
}
