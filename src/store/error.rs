//! Key-value store error types.

use std::time::Duration;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures talking to the key-value store.
///
/// Every variant is treated as "store unavailable" by the gate: callers fail
/// closed and never admit a request on a store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store operation `{command}` timed out after {timeout:?}")]
    Timeout {
        command: &'static str,
        timeout: Duration,
    },
    #[error("store connection error: {0}")]
    Connection(String),
    #[error("corrupt value under key `{key}`: {reason}")]
    Corrupt { key: String, reason: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        Self::Connection(err.to_string())
    }
}
