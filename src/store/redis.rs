//! Redis-backed key-value store.

use super::{KeyTtl, KeyValueStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisResult};
use std::{future::Future, time::Duration};
use tracing::{error, info_span, Instrument};

/// Shared Redis handle.
///
/// Wraps a [`ConnectionManager`], which multiplexes every command over one
/// connection and reconnects on failure. Cloning is cheap and all clones share
/// the connection, so one `RedisStore` is opened at startup and handed to every
/// component. Each command is bounded by `timeout`.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Open the shared connection.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the server cannot be reached
    /// within `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout {
                command: "CONNECT",
                timeout,
            })??;
        Ok(Self { conn, timeout })
    }

    async fn bounded<T, F>(&self, command: &'static str, key: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        let span = info_span!(
            "kv.command",
            db.system = "redis",
            db.operation = command,
            kv.key = key
        );
        match tokio::time::timeout(self.timeout, fut).instrument(span).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                error!("Redis {command} failed: {err}");
                Err(err.into())
            }
            Err(_) => {
                error!("Redis {command} timed out after {:?}", self.timeout);
                Err(StoreError::Timeout {
                    command,
                    timeout: self.timeout,
                })
            }
        }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded("GET", key, async move { conn.get(key).await })
            .await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        // PSETEX rejects a zero expiry.
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        self.bounded("PSETEX", key, async move {
            conn.pset_ex(key, value, millis).await
        })
        .await
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let mut conn = self.conn.clone();
        let reply: i64 = self
            .bounded("PTTL", key, async move { conn.pttl(key).await })
            .await?;
        Ok(KeyTtl::from_pttl_reply(reply))
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .bounded("DEL", key, async move { conn.del(key).await })
            .await?;
        Ok(removed > 0)
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        self.bounded("LRANGE", key, async move {
            conn.lrange(key, start, stop).await
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _pong: String = self
            .bounded("PING", "", async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;
        Ok(())
    }
}
