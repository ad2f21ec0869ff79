//! Key-value backends for sessions and rate counters
//!
//! The session store only needs a handful of primitives with TTL semantics:
//! set-with-expiry (unconditional or only over a live key), get, delete,
//! exists, expire, ttl, and an atomic increment-and-read-ttl used by the rate
//! limiter. Values go in as text and come back as raw bytes; decoding is the
//! caller's concern. Implement [`KvBackend`] to
//! plug in a different service.
//!
//! - [`RedisKv`] - networked store, used in production
//! - [`MemoryKv`] - in-process map, for tests and local development

mod memory;
mod redis;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;

use std::time::Duration;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist
    Missing,
    /// Key exists without an expiry
    Persistent,
    /// Key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Map a raw `TTL` reply (-2 missing, -1 no expiry, seconds otherwise)
    pub fn from_reply(secs: i64) -> Self {
        match secs {
            -2 => KeyTtl::Missing,
            s if s < 0 => KeyTtl::Persistent,
            s => KeyTtl::Expires(Duration::from_secs(s as u64)),
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(*d),
            _ => None,
        }
    }
}

/// Key-value backend errors
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Key-value store is not connected")]
    NotConnected,

    #[error("Key-value connection error: {0}")]
    Connection(String),

    #[error("Key-value command failed: {0}")]
    Command(String),

    #[error("Key-value operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type KvResult<T> = std::result::Result<T, KvError>;

/// Key-value backend trait
///
/// All operations are potential suspension points; implementations must be
/// safe for concurrent use by many in-flight requests.
#[async_trait::async_trait]
pub trait KvBackend: Send + Sync {
    /// Check connectivity
    async fn ping(&self) -> KvResult<()>;

    /// Store `value` under `key`, replacing any previous value and expiry
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()>;

    /// Like [`KvBackend::set_ex`], but only when `key` is live; returns whether
    /// it was written
    async fn set_ex_if_exists(&self, key: &str, value: &str, ttl: Duration) -> KvResult<bool>;

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>>;

    /// Remove a key; returns whether it existed
    async fn delete(&self, key: &str) -> KvResult<bool>;

    async fn exists(&self, key: &str) -> KvResult<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Set the expiry of an existing key; returns false when the key is missing
    async fn expire(&self, key: &str, ttl: Duration) -> KvResult<bool>;

    async fn ttl(&self, key: &str) -> KvResult<KeyTtl>;

    /// Atomically increment a counter and read its TTL in the same step
    async fn incr_with_ttl(&self, key: &str) -> KvResult<(i64, KeyTtl)>;

    /// Release the connection; later calls fail with [`KvError::NotConnected`]
    async fn close(&self) -> KvResult<()> {
        Ok(())
    }
}

// Implement KvBackend for Arc<B> to allow sharing one backend
#[async_trait::async_trait]
impl<B: KvBackend + ?Sized> KvBackend for std::sync::Arc<B> {
    async fn ping(&self) -> KvResult<()> {
        (**self).ping().await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        (**self).set_ex(key, value, ttl).await
    }

    async fn set_ex_if_exists(&self, key: &str, value: &str, ttl: Duration) -> KvResult<bool> {
        (**self).set_ex_if_exists(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        (**self).delete(key).await
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        (**self).exists(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> KvResult<bool> {
        (**self).expire(key, ttl).await
    }

    async fn ttl(&self, key: &str) -> KvResult<KeyTtl> {
        (**self).ttl(key).await
    }

    async fn incr_with_ttl(&self, key: &str) -> KvResult<(i64, KeyTtl)> {
        (**self).incr_with_ttl(key).await
    }

    async fn close(&self) -> KvResult<()> {
        (**self).close().await
    }
}
