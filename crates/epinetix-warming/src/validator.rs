//! Freshness inspection for hourly bins, without touching raw events.

use chrono::{DateTime, Utc};
use epinetix_cache::CacheStore;
use epinetix_core::HourKey;

use crate::error::WarmingError;

const GAP_LOOKBACK_HOURS: u32 = 672;
const BULK_SAMPLE_STRIDE: u32 = 24;
const BULK_SAMPLE_COUNT: u32 = 28;
const BULK_SAMPLE_REQUIRED: usize = 20;

/// Action a caller should take after inspecting a range's freshness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeAction {
    /// Every hour in the range is fresh; serve straight from cache.
    Proceed,
    /// Only the current hour is stale; a single-hour warm suffices.
    RefreshCurrent,
    /// More than the current hour is missing; warm the whole range.
    LoadRange,
}

/// Result of [`CacheValidator::range_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeStatus {
    pub action: RangeAction,
    pub current_hour_expired: bool,
    pub historical_complete: bool,
    pub missing_hours: Vec<HourKey>,
}

/// Inspects cached hourly bins for freshness without reading raw events.
pub struct CacheValidator {
    cache: std::sync::Arc<CacheStore>,
}

impl CacheValidator {
    #[must_use]
    pub fn new(cache: std::sync::Arc<CacheStore>) -> Self {
        Self { cache }
    }

    /// Classify `[start_hour, end_hour]` (inclusive) as fully cached, only
    /// needing a current-hour refresh, or needing a full range load.
    ///
    /// # Errors
    ///
    /// Returns [`WarmingError`] if a cache read fails.
    pub async fn range_status(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        start_hour: &HourKey,
        end_hour: &HourKey,
        now: DateTime<Utc>,
    ) -> Result<RangeStatus, WarmingError> {
        let mut missing_hours = Vec::new();
        let mut hour = *start_hour;
        loop {
            if !self.is_fresh(tenant_id, epinet_id, &hour, now).await? {
                missing_hours.push(hour);
            }
            if hour == *end_hour {
                break;
            }
            hour = hour.next();
        }

        let current = HourKey::from_datetime(now);
        let current_hour_expired = missing_hours.contains(&current);
        let historical_complete = missing_hours.iter().all(|h| *h == current);

        let action = if missing_hours.is_empty() {
            RangeAction::Proceed
        } else if missing_hours.len() == 1 && current_hour_expired {
            RangeAction::RefreshCurrent
        } else {
            RangeAction::LoadRange
        };

        Ok(RangeStatus {
            action,
            current_hour_expired,
            historical_complete,
            missing_hours,
        })
    }

    /// Walk backward from the current hour, returning the prefix of missing
    /// hour keys, stopping at the first fresh hit (or after 672 hours).
    ///
    /// # Errors
    ///
    /// Returns [`WarmingError`] if a cache read fails.
    pub async fn find_cache_gap(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<HourKey>, WarmingError> {
        let mut gap = Vec::new();
        let mut hour = HourKey::from_datetime(now);
        for _ in 0..GAP_LOOKBACK_HOURS {
            if self.is_fresh(tenant_id, epinet_id, &hour, now).await? {
                break;
            }
            gap.push(hour);
            hour = hour.previous();
        }
        Ok(gap)
    }

    /// Sample every 24th hour over the trailing 672 hours; the epinet counts
    /// as bulk-initialized if at least 20 of those 28 samples are fresh.
    ///
    /// # Errors
    ///
    /// Returns [`WarmingError`] if a cache read fails.
    pub async fn is_bulk_initialized(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, WarmingError> {
        let mut fresh_count = 0usize;
        let mut hour = HourKey::from_datetime(now);
        for i in 0..BULK_SAMPLE_COUNT {
            if i > 0 {
                for _ in 0..BULK_SAMPLE_STRIDE {
                    hour = hour.previous();
                }
            }
            if self.is_fresh(tenant_id, epinet_id, &hour, now).await? {
                fresh_count += 1;
            }
        }
        Ok(fresh_count >= BULK_SAMPLE_REQUIRED)
    }

    async fn is_fresh(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        hour: &HourKey,
        now: DateTime<Utc>,
    ) -> Result<bool, WarmingError> {
        let hour_str = hour.to_string();
        let bin = self
            .cache
            .get_hourly_bin(tenant_id, epinet_id, &hour_str)
            .await?;
        Ok(bin.is_some_and(|b| b.is_fresh(now.timestamp_millis())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epinetix_cache::HourlyEpinetBin;

    fn bin(hour_key: &str, computed_at: DateTime<Utc>, ttl_secs: u64) -> HourlyEpinetBin {
        HourlyEpinetBin::build(
            "epinet-1".to_string(),
            hour_key.to_string(),
            Vec::new(),
            Vec::new(),
            computed_at.timestamp_millis(),
            ttl_secs,
        )
        .expect("empty bin is always valid")
    }

    #[tokio::test]
    async fn range_status_proceeds_when_all_fresh() {
        let cache = std::sync::Arc::new(CacheStore::new());
        let now = Utc::now();
        let hour = HourKey::from_datetime(now);
        cache
            .set_hourly_bin("tenant-1", &bin(&hour.to_string(), now, 900), true)
            .await
            .unwrap();

        let validator = CacheValidator::new(cache);
        let status = validator
            .range_status("tenant-1", "epinet-1", &hour, &hour, now)
            .await
            .unwrap();
        assert_eq!(status.action, RangeAction::Proceed);
        assert!(status.missing_hours.is_empty());
    }

    #[tokio::test]
    async fn range_status_refreshes_current_when_only_current_missing() {
        let cache = std::sync::Arc::new(CacheStore::new());
        let now = Utc::now();
        let current = HourKey::from_datetime(now);
        let previous = current.previous();
        cache
            .set_hourly_bin("tenant-1", &bin(&previous.to_string(), now, 86_400), false)
            .await
            .unwrap();

        let validator = CacheValidator::new(cache);
        let status = validator
            .range_status("tenant-1", "epinet-1", &previous, &current, now)
            .await
            .unwrap();
        assert_eq!(status.action, RangeAction::RefreshCurrent);
        assert!(status.current_hour_expired);
        assert!(status.historical_complete);
    }

    #[tokio::test]
    async fn range_status_loads_range_when_historical_hours_missing() {
        let cache = std::sync::Arc::new(CacheStore::new());
        let now = Utc::now();
        let current = HourKey::from_datetime(now);
        let previous = current.previous();

        let validator = CacheValidator::new(cache);
        let status = validator
            .range_status("tenant-1", "epinet-1", &previous, &current, now)
            .await
            .unwrap();
        assert_eq!(status.action, RangeAction::LoadRange);
        assert!(!status.historical_complete);
    }

    #[tokio::test]
    async fn find_cache_gap_stops_at_first_fresh_hit() {
        let cache = std::sync::Arc::new(CacheStore::new());
        let now = Utc::now();
        let current = HourKey::from_datetime(now);
        let two_ago = current.previous().previous();
        cache
            .set_hourly_bin("tenant-1", &bin(&two_ago.to_string(), now, 86_400), false)
            .await
            .unwrap();

        let validator = CacheValidator::new(cache);
        let gap = validator
            .find_cache_gap("tenant-1", "epinet-1", now)
            .await
            .unwrap();
        assert_eq!(gap, vec![current, current.previous()]);
    }

    #[tokio::test]
    async fn is_bulk_initialized_requires_twenty_of_twenty_eight_samples() {
        let cache = std::sync::Arc::new(CacheStore::new());
        let now = Utc::now();
        let validator = CacheValidator::new(cache);
        assert!(!validator
            .is_bulk_initialized("tenant-1", "epinet-1", now)
            .await
            .unwrap());
    }
}
