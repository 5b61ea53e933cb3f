use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::core::ResultCache;
use crate::models::{ListingSearchQuery, MatchResult};

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// TTL tiers for the different query shapes the service caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Per-request match sets
    MatchSet,
    /// Open browsing listing searches
    ListingSearch,
    /// Aggregate statistics and featured-listing queries
    Aggregate,
}

impl CacheTier {
    pub fn ttl_secs(&self) -> u64 {
        match self {
            CacheTier::MatchSet => 600,
            CacheTier::ListingSearch => 300,
            CacheTier::Aggregate => 3600,
        }
    }
}

/// Two-level cache manager
///
/// L1 is an in-process moka cache, L2 is Redis shared across instances.
/// The L1 TTL is pinned to the shortest tier so no entry outlives its
/// Redis counterpart; Redis gets the exact per-tier TTL via SETEX.
pub struct CacheManager {
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
}

impl CacheManager {
    pub async fn new(redis_url: &str, l1_size: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(CacheTier::ListingSearch.ttl_secs()))
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
        })
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut *conn).await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);
            self.l1_cache
                .insert(key.to_string(), json.as_bytes().to_vec())
                .await;
            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in both tiers with the tier's TTL
    pub async fn set<T>(&self, key: &str, value: &T, tier: CacheTier) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(key)
            .arg(tier.ttl_secs())
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        drop(conn);

        tracing::trace!("Cache set: {} (ttl {}s)", key, tier.ttl_secs());
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        let mut conn = self.redis.lock().await;
        redis::cmd("DEL").arg(key).query_async::<()>(&mut *conn).await?;
        Ok(())
    }

    /// Invalidate all cache entries matching a pattern
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        // L1 has no pattern scan; clearing it is cheap at this size
        self.l1_cache.invalidate_all();

        let mut conn = self.redis.lock().await;
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut *conn).await?;
        if !keys.is_empty() {
            redis::cmd("DEL").arg(keys).query_async::<()>(&mut *conn).await?;
        }

        tracing::debug!("Invalidated cache pattern: {}", pattern);
        Ok(())
    }
}

/// Canonical, versioned cache key builder
///
/// The version segment lets a deploy with changed result shapes roll over
/// without reading stale payloads.
pub struct CacheKey;

impl CacheKey {
    const VERSION: &'static str = "v1";

    /// Key for a per-request match set
    pub fn matches(request_id: &str, strategy: &str) -> String {
        format!("match:{}:{}:{}", Self::VERSION, request_id, strategy)
    }

    /// Pattern covering every strategy's match set for one request
    pub fn matches_pattern(request_id: &str) -> String {
        format!("match:{}:{}:*", Self::VERSION, request_id)
    }

    /// Key for an open browsing search, hashed from the canonical filter set
    pub fn listing_search(query: &ListingSearchQuery) -> String {
        // Field order is fixed by the struct, so equal filters always
        // serialize to identical bytes
        let canonical = serde_json::to_vec(query).unwrap_or_default();
        let digest = blake3::hash(&canonical).to_hex();
        format!("search:{}:{}", Self::VERSION, digest)
    }

    /// Key for aggregate marketplace statistics
    pub fn stats() -> String {
        format!("stats:{}", Self::VERSION)
    }
}

/// The engine-facing cache seam
///
/// Wraps an optional `CacheManager`: when Redis was unreachable at startup,
/// or an individual operation fails, the engine silently recomputes.
#[derive(Clone)]
pub struct MatchCache {
    inner: Option<Arc<CacheManager>>,
}

impl MatchCache {
    pub fn new(manager: Option<Arc<CacheManager>>) -> Self {
        Self { inner: manager }
    }

    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn manager(&self) -> Option<&Arc<CacheManager>> {
        self.inner.as_ref()
    }
}

#[async_trait]
impl ResultCache for MatchCache {
    async fn get_matches(&self, request_id: &str, strategy: &str) -> Option<MatchResult> {
        let manager = self.inner.as_ref()?;
        match manager.get(&CacheKey::matches(request_id, strategy)).await {
            Ok(result) => Some(result),
            Err(CacheError::CacheMiss(_)) => None,
            Err(e) => {
                tracing::warn!("Cache read failed, bypassing: {}", e);
                None
            }
        }
    }

    async fn put_matches(&self, request_id: &str, strategy: &str, result: &MatchResult) {
        let Some(manager) = self.inner.as_ref() else {
            return;
        };
        let key = CacheKey::matches(request_id, strategy);
        if let Err(e) = manager.set(&key, result, CacheTier::MatchSet).await {
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    async fn invalidate_matches(&self, request_id: &str) {
        let Some(manager) = self.inner.as_ref() else {
            return;
        };
        let pattern = CacheKey::matches_pattern(request_id);
        if let Err(e) = manager.invalidate_pattern(&pattern).await {
            tracing::warn!("Cache invalidation failed for {}: {}", pattern, e);
        }
    }
}
