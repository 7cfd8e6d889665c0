//! Generic moka-backed, rkyv-serialized cache for one entity class.
//!
//! Mirrors `ironstar-analytics-infra::analytics_cache::AnalyticsCache`: a
//! `moka::future::Cache<String, Vec<u8>>` storing rkyv bytes, with TTL/TTI
//! eviction and a predicate-based bulk invalidation hook. `CacheStore`
//! (`crate::store`) composes one of these per entity class, each with the
//! TTL that class's lifecycle calls for.

use moka::future::Cache;
use std::future::Future;
use std::time::Duration;

use crate::error::CacheError;

/// One entity class's cache: a keyed store of rkyv-serialized bytes with
/// its own TTL/TTI policy.
#[derive(Clone)]
pub struct EntityCache {
    cache: Cache<String, Vec<u8>>,
}

impl EntityCache {
    #[must_use]
    pub fn with_ttl(max_capacity: u64, time_to_live: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(time_to_live)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    #[must_use]
    pub fn with_ttl_and_tti(max_capacity: u64, time_to_live: Duration, time_to_idle: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(time_to_live)
            .time_to_idle(time_to_idle)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: String, value: Vec<u8>) {
        self.cache.insert(key, value).await;
    }

    /// Get a cached value or compute and insert it on cache miss. Used for
    /// single-flight-by-convention reads; true single-flight across
    /// concurrent callers is provided separately by `moka::future::Cache::get_with`,
    /// used directly in `epinetix-warming` where de-duplicating concurrent
    /// warm requests matters.
    ///
    /// # Errors
    ///
    /// Returns whatever error the compute closure returns.
    pub async fn get_or_insert_with<F, Fut>(&self, key: String, compute: F) -> Result<Vec<u8>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, CacheError>>,
    {
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }
        let value = compute().await?;
        self.cache.insert(key, value.clone()).await;
        Ok(value)
    }

    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    pub fn invalidate_where<F>(&self, predicate: F)
    where
        F: Fn(&String, &Vec<u8>) -> bool + Send + Sync + 'static,
    {
        let _ = self.cache.invalidate_entries_if(move |k, v| predicate(k, v));
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// Serialize a value to rkyv bytes.
///
/// # Errors
///
/// Returns [`CacheError::serialization`] if serialization fails.
pub fn serialize<T>(value: &T) -> Result<Vec<u8>, CacheError>
where
    T: for<'a> rkyv::Serialize<
            rkyv::api::high::HighSerializer<
                rkyv::util::AlignedVec,
                rkyv::ser::allocator::ArenaHandle<'a>,
                rkyv::rancor::Error,
            >,
        >,
{
    let aligned = rkyv::to_bytes::<rkyv::rancor::Error>(value)
        .map_err(|e| CacheError::serialization(format!("rkyv serialization failed: {e}")))?;
    Ok(aligned.to_vec())
}

/// Deserialize a value from rkyv bytes.
///
/// # Errors
///
/// Returns [`CacheError::serialization`] if deserialization or validation fails.
pub fn deserialize<T>(bytes: &[u8]) -> Result<T, CacheError>
where
    T: rkyv::Archive,
    T::Archived: for<'a> rkyv::bytecheck::CheckBytes<rkyv::api::high::HighValidator<'a, rkyv::rancor::Error>>
        + rkyv::Deserialize<T, rkyv::rancor::Strategy<rkyv::de::Pool, rkyv::rancor::Error>>,
{
    rkyv::from_bytes::<T, rkyv::rancor::Error>(bytes)
        .map_err(|e| CacheError::serialization(format!("rkyv deserialization failed: {e}")))
}
