//! Key-value state store adapter.
//!
//! The gate keeps two kinds of short-lived shared state outside the process:
//! session records and rate counters. Both only need a small contract from the
//! store (string keys and values, per-key expiry, list reads), described by
//! [`KeyValueStore`].
//!
//! Two implementations are provided:
//!
//! - [`RedisStore`] talks to Redis through a shared, multiplexed connection and
//!   bounds every command with a timeout so a partitioned store degrades into
//!   rejected requests instead of hung ones.
//! - [`MemoryStore`] keeps everything in process and follows the tokio clock,
//!   which lets tests pause and advance time across TTL boundaries.

mod error;
mod memory;
mod redis;

pub use self::error::{StoreError, StoreResult};
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use std::time::Duration;

/// Remaining lifetime of a key, as reported by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (or already expired).
    Missing,
    /// The key exists without an expiry.
    Persistent,
    /// The key expires after the given duration, at millisecond precision.
    Expires(Duration),
}

impl KeyTtl {
    /// Map the integer reply of a Redis `PTTL` command.
    #[must_use]
    pub fn from_pttl_reply(reply: i64) -> Self {
        match reply {
            -1 => Self::Persistent,
            n if n < 0 => Self::Missing,
            n => Self::Expires(Duration::from_millis(n.unsigned_abs())),
        }
    }
}

/// Contract the gate needs from a networked key-value store.
///
/// Implementations must be safe to share between request tasks. Each call is a
/// single store round trip; no call spans more than one key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Remaining lifetime of `key`, to the millisecond.
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// Delete `key`. Returns `true` if a key was removed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Read the elements `start..=stop` of the list under `key`. Negative
    /// indexes count from the end, so `(0, -1)` reads the whole list.
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>>;

    /// Cheap liveness check used by the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}
