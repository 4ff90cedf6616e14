// Cache-aside over an opaque key-value store.
// The store is handed in explicitly; nothing here keeps global state.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;

use crate::error::Result;

/// A JSON-capable key-value store with per-key expiry.
/// A `ttl_seconds` of zero means the entry does not expire.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn expire(&self, key: &str, seconds: u64) -> Result<()>;
}

/// Time-to-live of every cache entry class, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    pub search: u64,
    pub random: u64,
    pub id: u64,
    pub autocomplete: u64,
    /// Zero-result autocomplete entries.
    pub autocomplete_empty: u64,
    /// Negative-result markers of search and random.
    pub empty: u64,
}

impl Default for CacheTtl {
    fn default() -> Self {
        CacheTtl {
            search: 60 * 60,
            random: 60 * 10,
            id: 60 * 60 * 24,
            autocomplete: 60 * 60 * 24,
            autocomplete_empty: 60 * 60 * 2,
            empty: 60 * 5,
        }
    }
}

// MARK: Keys

/// Colon-separated composite key: `booru:operation:part:part...`.
/// Parts are escaped so that a `:` inside a tag expression cannot shift the boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(booru: &str, operation: &str) -> Self {
        CacheKey(format!("{}:{}", booru, operation))
    }

    /// Append one result-shaping parameter. An empty part stays empty.
    pub fn part(mut self, part: impl Display) -> Self {
        self.0.push(':');
        for c in part.to_string().chars() {
            match c {
                '%' => self.0.push_str("%25"),
                ':' => self.0.push_str("%3A"),
                c => self.0.push(c),
            }
        }
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// MARK: Cache-aside

/// A value and whether it was served from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub from_cache: bool,
}

/// Read-through caching around `fetcher`.
///
/// A hit returns without calling `fetcher`. A miss, or `force`, calls it and writes a
/// successful result back under `key`. Store faults degrade to a miss or a skipped write.
pub async fn with_cache<T, F, Fut>(
    store: &dyn CacheStore,
    key: &CacheKey,
    ttl_seconds: u64,
    force: bool,
    fetcher: F,
) -> Result<Cached<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !force {
        match store.get(key.as_str()).await {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(value) => {
                    tracing::debug!("Cache hit for {}", key);
                    return Ok(Cached {
                        value,
                        from_cache: true,
                    });
                }
                Err(err) => {
                    tracing::warn!("Dropping unreadable cache entry {}: {}", key, err);
                    if let Err(err) = store.delete(key.as_str()).await {
                        tracing::warn!("Cannot delete cache entry {}: {}", key, err);
                    }
                }
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("Cache read failed for {}: {}", key, err),
        }
    }

    let value = fetcher().await?;
    match serde_json::to_value(&value) {
        Ok(json) => match store.set(key.as_str(), &json, ttl_seconds).await {
            Ok(()) => tracing::info!("Stored {} for {} s", key, ttl_seconds),
            Err(err) => tracing::warn!("Cache write failed for {}: {}", key, err),
        },
        Err(err) => tracing::warn!("Cannot encode cache entry {}: {}", key, err),
    }

    Ok(Cached {
        value,
        from_cache: false,
    })
}

/// Whether a negative-result marker exists under `key`. Only presence matters.
pub async fn is_known_empty(store: &dyn CacheStore, key: &CacheKey) -> bool {
    match store.get(key.as_str()).await {
        Ok(marker) => marker.is_some(),
        Err(err) => {
            tracing::warn!("Cache read failed for {}: {}", key, err);
            false
        }
    }
}

/// Record that the query behind `key` returned nothing.
pub async fn mark_empty(store: &dyn CacheStore, key: &CacheKey, ttl_seconds: u64) {
    match store.set(key.as_str(), &Value::Bool(true), ttl_seconds).await {
        Ok(()) => tracing::info!("Marked {} as empty for {} s", key, ttl_seconds),
        Err(err) => tracing::warn!("Cache write failed for {}: {}", key, err),
    }
}

// MARK: In-memory store

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// Process-local store. Expiry follows tokio's clock, so tests can pause and advance time.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| !e.expired(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn deadline(seconds: u64) -> Option<Instant> {
    (seconds > 0).then(|| Instant::now() + Duration::from_secs(seconds))
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expired(Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl_seconds: u64) -> Result<()> {
        let entry = MemoryEntry {
            value: value.clone(),
            expires_at: deadline(ttl_seconds),
        };
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.expired(now));
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<()> {
        if let Some(entry) = self.entries.lock().await.get_mut(key) {
            entry.expires_at = deadline(seconds);
        }
        Ok(())
    }
}
