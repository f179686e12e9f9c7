//! TTL cache over Redis.
//!
//! The cache is an optimization, never a correctness dependency: a dead
//! backend or a corrupt payload reads as a miss, and write failures are
//! logged and dropped. Values are JSON strings with per-key expiry enforced
//! by the store (`SET ... EX`), so expired entries read as absent without
//! anyone deleting them.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    AsyncCommands, Client,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::Instant;
use tracing::warn;

pub const HOUR_SECS: u64 = 60 * 60;

/// Canonical cache key for a human-entered name.
///
/// "MIT", " mit " and "Mit" must collide to one entry; plain ASCII folding,
/// no locale-aware tricks, so keys stay stable across deploys.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Key-value store with per-entry expiry.
///
/// Neither method can fail from the caller's point of view. Lookup clients
/// and route handlers share one instance; their keys are namespaced by
/// source (`wikidata:`, `hipolabs:`, `programs:`, ...).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Absent on miss, expiry, or any backend failure.
    async fn get_raw(&self, key: &str) -> Option<String>;

    /// Best effort; the value reads as absent after `ttl_secs`.
    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64);
}

impl dyn CacheStore {
    /// Read and deserialize; a corrupt stored payload is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "discarding corrupt cache payload");
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set_raw(key, &raw, ttl_secs).await,
            Err(err) => warn!(key, error = %err, "unserializable cache payload"),
        }
    }
}

/// Redis-backed store, shared process-wide.
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager_with_config(config).await?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get_raw(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) {
        let mut conn = self.conn.clone();
        if let Err(err) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            warn!(key, error = %err, "cache write failed");
        }
    }
}

/// In-memory store with the same expiry semantics as Redis.
///
/// Used by tests and by local runs without a Redis to talk to. Expired
/// entries are left in place and simply read as absent.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get_raw(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap();
        let (value, expires_at) = entries.get(key)?;
        if Instant::now() >= *expires_at {
            return None;
        }
        Some(value.clone())
    }

    async fn set_raw(&self, key: &str, value: &str, ttl_secs: u64) {
        let expires_at = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        assert_eq!(normalize("  MIT "), "mit");
        assert_eq!(normalize("Universitas Indonesia"), "universitas indonesia");
        assert_eq!(normalize("mit"), normalize(" MIT\t"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(" Institut Teknologi Bandung ");
        assert_eq!(normalize(&once), once);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_within_ttl() {
        let cache: Box<dyn CacheStore> = Box::new(MemoryCache::new());

        cache.set_json("k", &vec![1, 2, 3], 60).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get_json::<Vec<i32>>("k").await, Some(vec![1, 2, 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_reads_as_absent() {
        let cache: Box<dyn CacheStore> = Box::new(MemoryCache::new());

        cache.set_json("k", &"v", 60).await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get_json::<String>("k").await, None);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_a_miss() {
        let cache: Box<dyn CacheStore> = Box::new(MemoryCache::new());

        cache.set_raw("k", "{not json", 60).await;
        assert_eq!(cache.get_json::<Vec<i32>>("k").await, None);
    }

    #[tokio::test]
    async fn test_missing_key_is_a_miss() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get_raw("nope").await, None);
    }
}
