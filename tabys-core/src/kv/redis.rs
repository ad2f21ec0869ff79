//! Redis key-value backend
//!
//! Uses a single multiplexed `ConnectionManager`, created on first use (or on
//! an explicit [`RedisKv::connect`]) and shared by every in-flight request.
//! Every command is bounded by the configured timeout.

use super::{KeyTtl, KvBackend, KvError, KvResult};
use ::redis::aio::ConnectionManager;
use ::redis::{AsyncCommands, Client, RedisError, RedisResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Redis-backed store
pub struct RedisKv {
    client: Client,
    timeout: Duration,
    conn: RwLock<Option<ConnectionManager>>,
    closed: AtomicBool,
}

impl RedisKv {
    /// Prepare a backend for `url` (`redis://` or `rediss://`); no I/O yet
    pub fn new(url: &str, timeout: Duration) -> KvResult<Self> {
        let client = Client::open(url).map_err(|e| KvError::Connection(e.to_string()))?;
        Ok(Self { client, timeout, conn: RwLock::new(None), closed: AtomicBool::new(false) })
    }

    /// Establish the connection now and verify it with a PING
    pub async fn connect(&self) -> KvResult<()> {
        self.ping().await?;
        log::info!("Connected to Redis");
        Ok(())
    }

    async fn connection(&self) -> KvResult<ConnectionManager> {
        if self.closed.load(Ordering::Acquire) {
            return Err(KvError::NotConnected);
        }
        if let Some(conn) = self.conn.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut slot = self.conn.write().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = match tokio::time::timeout(self.timeout, self.client.get_connection_manager())
            .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(KvError::Connection(e.to_string())),
            Err(_) => return Err(KvError::Timeout(self.timeout)),
        };
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Run one command under the timeout
    async fn run<T, F>(&self, fut: F) -> KvResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(map_redis_error(e)),
            Err(_) => Err(KvError::Timeout(self.timeout)),
        }
    }
}

fn map_redis_error(err: RedisError) -> KvError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        KvError::Connection(err.to_string())
    } else if err.is_timeout() {
        KvError::Connection(format!("timeout: {}", err))
    } else {
        KvError::Command(err.to_string())
    }
}

#[async_trait::async_trait]
impl KvBackend for RedisKv {
    async fn ping(&self) -> KvResult<()> {
        let mut conn = self.connection().await?;
        let _pong: String =
            self.run(async move { ::redis::cmd("PING").query_async(&mut conn).await }).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        self.run(async move { conn.set_ex::<_, _, ()>(key, value, secs).await }).await
    }

    async fn set_ex_if_exists(&self, key: &str, value: &str, ttl: Duration) -> KvResult<bool> {
        let mut conn = self.connection().await?;
        let secs = ttl.as_secs().max(1);
        // SET .. XX replies nil when the key is gone
        let reply: Option<String> = self
            .run(async move {
                ::redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("EX")
                    .arg(secs)
                    .arg("XX")
                    .query_async(&mut conn)
                    .await
            })
            .await?;
        Ok(reply.is_some())
    }

    // Raw bytes, so a payload that is not UTF-8 reaches the caller's decoder
    async fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        self.run(async move { conn.get::<_, Option<Vec<u8>>>(key).await }).await
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = self.run(async move { conn.del::<_, i64>(key).await }).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut conn = self.connection().await?;
        self.run(async move { conn.exists::<_, bool>(key).await }).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> KvResult<bool> {
        let mut conn = self.connection().await?;
        let secs = ttl.as_secs().max(1) as i64;
        self.run(async move { conn.expire::<_, bool>(key, secs).await }).await
    }

    async fn ttl(&self, key: &str) -> KvResult<KeyTtl> {
        let mut conn = self.connection().await?;
        let secs: i64 = self.run(async move { conn.ttl::<_, i64>(key).await }).await?;
        Ok(KeyTtl::from_reply(secs))
    }

    async fn incr_with_ttl(&self, key: &str) -> KvResult<(i64, KeyTtl)> {
        let mut conn = self.connection().await?;
        // MULTI/EXEC so the count and the TTL are read together
        let (count, ttl): (i64, i64) = self
            .run(async move {
                ::redis::pipe().atomic().incr(key, 1).ttl(key).query_async(&mut conn).await
            })
            .await?;
        Ok((count, KeyTtl::from_reply(ttl)))
    }

    async fn close(&self) -> KvResult<()> {
        self.closed.store(true, Ordering::Release);
        if self.conn.write().await.take().is_some() {
            log::info!("Redis connection closed");
        }
        Ok(())
    }
}
