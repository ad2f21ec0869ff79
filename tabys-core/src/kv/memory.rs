//! In-memory key-value backend
//!
//! Thread-safe map behind a tokio RwLock with per-key deadlines. Expired keys
//! are evicted lazily when touched. Deadlines use `tokio::time::Instant`, so
//! tests can drive expiry with a paused clock.
//! Data is lost on restart; use [`super::RedisKv`] when several bot processes
//! share sessions.

use super::{KeyTtl, KvBackend, KvError, KvResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }

    fn ttl(&self, now: Instant) -> KeyTtl {
        match self.expires_at {
            Some(deadline) => KeyTtl::Expires(deadline.saturating_duration_since(now)),
            None => KeyTtl::Persistent,
        }
    }
}

/// In-memory key-value store
///
/// # Example
///
/// ```
/// use tabys_core::kv::MemoryKv;
///
/// let kv = MemoryKv::new();
/// ```
#[derive(Clone, Default)]
pub struct MemoryKv {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().await.values().filter(|e| !e.is_expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Store a raw value without expiry (test fixtures, corrupt payloads)
    pub async fn insert_raw(&self, key: &str, value: impl AsRef<[u8]>) {
        let mut entries = self.entries.write().await;
        let entry = Entry { value: value.as_ref().to_vec(), expires_at: None };
        entries.insert(key.to_string(), entry);
    }
}

#[async_trait::async_trait]
impl KvBackend for MemoryKv {
    async fn ping(&self) -> KvResult<()> {
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry { value: value.as_bytes().to_vec(), expires_at: Some(Instant::now() + ttl) },
        );
        Ok(())
    }

    async fn set_ex_if_exists(&self, key: &str, value: &str, ttl: Duration) -> KvResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.value = value.as_bytes().to_vec();
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: evict under the write lock
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        Ok(entries.remove(key).is_some_and(|e| !e.is_expired(now)))
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.get(key).is_some_and(|e| !e.is_expired(now)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> KvResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> KvResult<KeyTtl> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => entry.ttl(now),
            _ => KeyTtl::Missing,
        })
    }

    async fn incr_with_ttl(&self, key: &str) -> KvResult<(i64, KeyTtl)> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let current = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.clone()),
            _ => None,
        };

        let (count, expires_at) = match current {
            Some(entry) => {
                let count: i64 = std::str::from_utf8(&entry.value)
                    .ok()
                    .and_then(|text| text.parse().ok())
                    .ok_or_else(|| {
                        KvError::Command(format!("value at {} is not an integer", key))
                    })?;
                (count + 1, entry.expires_at)
            }
            None => (1, None),
        };

        let entry = Entry { value: count.to_string().into_bytes(), expires_at };
        let ttl = entry.ttl(now);
        entries.insert(key.to_string(), entry);
        Ok((count, ttl))
    }
}
