//! In-process key-value store.
//!
//! Expiry is checked lazily on access against [`tokio::time::Instant`], so a
//! test running with a paused clock can move across TTL boundaries with
//! `tokio::time::advance`. All clones share the same data.

use super::{KeyTtl, KeyValueStore, StoreResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::Instant;

#[derive(Clone, Debug)]
enum Value {
    Text(String),
    List(Vec<String>),
}

#[derive(Clone, Debug)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, Entry>>>,
    writes: Arc<AtomicU64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list stored under `key`. The list never expires.
    pub fn put_list<I, S>(&self, key: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = Entry {
            value: Value::List(items.into_iter().map(Into::into).collect()),
            expires_at: None,
        };
        self.data.lock().insert(key.to_string(), entry);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of mutating operations that reached the store.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let mut data = self.data.lock();
        match data.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.clone()),
            Some(_) => {
                data.remove(key);
                None
            }
            None => None,
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.data.lock().len())
            .field("writes", &self.writes())
            .finish()
    }
}

fn list_bounds(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = isize::try_from(len).ok()?;
    let resolve = |index: isize| if index < 0 { len + index } else { index };
    let start = resolve(start).max(0);
    let stop = resolve(stop).min(len - 1);
    if len == 0 || start > stop {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.live_entry(key).and_then(|entry| match entry.value {
            Value::Text(text) => Some(text),
            Value::List(_) => None,
        }))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let entry = Entry {
            value: Value::Text(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        };
        self.data.lock().insert(key.to_string(), entry);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let now = Instant::now();
        Ok(match self.live_entry(key) {
            None => KeyTtl::Missing,
            Some(Entry {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Expires(at.saturating_duration_since(now)),
        })
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        if self.live_entry(key).is_none() {
            return Ok(false);
        }
        let removed = self.data.lock().remove(key).is_some();
        if removed {
            self.writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> StoreResult<Vec<String>> {
        let Some(Entry {
            value: Value::List(items),
            ..
        }) = self.live_entry(key)
        else {
            return Ok(Vec::new());
        };
        Ok(list_bounds(items.len(), start, stop)
            .map(|(from, to)| items[from..=to].to_vec())
            .unwrap_or_default())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn values_expire_after_ttl() {
        let store = MemoryStore::new();
        store
            .set_with_expiry("k", "v", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_counts_down() {
        let store = MemoryStore::new();
        store
            .set_with_expiry("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(
            store.ttl("k").await.unwrap(),
            KeyTtl::Expires(Duration::from_secs(50))
        );
    }

    #[tokio::test]
    async fn delete_missing_key_is_not_a_write() {
        let store = MemoryStore::new();
        assert!(!store.delete("absent").await.unwrap());
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn list_range_follows_redis_indexing() {
        let store = MemoryStore::new();
        store.put_list("l", ["a", "b", "c"]);
        assert_eq!(store.list_range("l", 0, -1).await.unwrap(), ["a", "b", "c"]);
        assert_eq!(store.list_range("l", 1, 1).await.unwrap(), ["b"]);
        assert_eq!(store.list_range("l", -2, 10).await.unwrap(), ["b", "c"]);
        assert!(store.list_range("l", 2, 1).await.unwrap().is_empty());
        assert!(store.list_range("missing", 0, -1).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_keeps_millisecond_precision() {
        let store = MemoryStore::new();
        store
            .set_with_expiry("k", "v", Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(
            store.ttl("k").await.unwrap(),
            KeyTtl::Expires(Duration::from_millis(59_500))
        );
    }
}
