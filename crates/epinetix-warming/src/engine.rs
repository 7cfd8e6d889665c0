//! Builds hourly epinet bins from raw events and publishes them to the cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use epinetix_cache::{CacheStore, HourlyEpinetBin, StepInfo, TransitionInfo};
use epinetix_core::HourKey;
use epinetix_events::EventRepository;

use crate::error::WarmingError;
use crate::matcher::{action_event_matches_step, belief_event_matches_step, node_id};
use crate::types::{EpinetAnalysis, EpinetConfig};

/// Resolves a human-readable title for a content object, so bins don't carry
/// bare ids. `ContentServices` (out of scope here) is the real implementation;
/// tests use a trivial in-memory one.
pub trait ContentTitleLookup: Send + Sync {
    fn title_for(&self, object_type: &str, object_id: &str) -> Option<String>;
}

const UNKNOWN_CONTENT: &str = "Unknown Content";

/// Sizing knobs for [`WarmingEngine`], mirroring `EPINETIX_EVENT_COUNT_THRESHOLD`
/// and the TTL configuration in SPEC_FULL.md §10.
#[derive(Debug, Clone, Copy)]
pub struct WarmingConfig {
    pub event_count_threshold: i64,
    pub batch_hours_fallback: i64,
    pub current_hour_ttl_secs: u64,
    pub historical_ttl_secs: u64,
    /// Maximum number of concurrent `warm_range` calls this engine admits at
    /// once (§5: "bounded by a per-tenant semaphore, default one active warm
    /// per tenant"). Clamped to at least 1.
    pub warm_concurrency_per_tenant: usize,
}

impl Default for WarmingConfig {
    fn default() -> Self {
        Self {
            event_count_threshold: 200_000,
            batch_hours_fallback: 168,
            current_hour_ttl_secs: 900,
            historical_ttl_secs: 86_400,
            warm_concurrency_per_tenant: 1,
        }
    }
}

pub struct WarmingEngine<L: ContentTitleLookup + 'static> {
    events: EventRepository,
    cache: Arc<CacheStore>,
    content_lookup: Arc<L>,
    config: WarmingConfig,
    /// Single-flight coordination: concurrent warm requests for the same
    /// `(tenant, epinet, hour)` key share one build via `try_get_with`.
    inflight: moka::future::Cache<String, Arc<HourlyEpinetBin>>,
    /// Bounds concurrent `warm_range` calls on this (per-tenant) engine —
    /// the thundering-herd guard, independent of the single-flight dedup
    /// above which only collapses identical `(epinet, hour)` keys.
    warm_semaphore: tokio::sync::Semaphore,
}

impl<L: ContentTitleLookup + 'static> WarmingEngine<L> {
    #[must_use]
    pub fn new(
        events: EventRepository,
        cache: Arc<CacheStore>,
        content_lookup: Arc<L>,
        config: WarmingConfig,
    ) -> Self {
        let inflight = moka::future::Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(30))
            .build();
        let warm_semaphore = tokio::sync::Semaphore::new(config.warm_concurrency_per_tenant.max(1));
        Self {
            events,
            cache,
            content_lookup,
            config,
            inflight,
            warm_semaphore,
        }
    }

    /// Warm every hour in `[start_hour, end_hour]` (inclusive) for `config`,
    /// skipping hours whose cached bin is already fresh. Returns the hour
    /// keys that were actually (re)built.
    ///
    /// # Errors
    ///
    /// Returns [`WarmingError`] if event reads, content lookups, or cache
    /// writes fail, or if `config` has no steps.
    pub async fn warm_range(
        &self,
        tenant_id: &str,
        config: &EpinetConfig,
        start_hour: &HourKey,
        end_hour: &HourKey,
        now: DateTime<Utc>,
    ) -> Result<Vec<HourKey>, WarmingError> {
        if config.steps.is_empty() {
            return Err(WarmingError::invalid_config(format!(
                "epinet {} has no steps",
                config.epinet_id
            )));
        }

        // `close()` is never called on this semaphore, so `acquire` cannot fail.
        #[allow(clippy::expect_used)]
        let _permit = self
            .warm_semaphore
            .acquire()
            .await
            .expect("warming semaphore closed");

        let full_range = hour_range(start_hour, end_hour);
        let analysis = EpinetAnalysis::analyze(config);

        let start_time = start_hour.start();
        let end_time = end_hour.next().start();
        let total_count = self.events.count_events(start_time, end_time).await?;
        let batch_hours = if total_count > self.config.event_count_threshold {
            self.config.batch_hours_fallback
        } else {
            i64::try_from(full_range.len()).unwrap_or(i64::MAX).max(1)
        };
        let batch_hours = usize::try_from(batch_hours.max(1)).unwrap_or(1);

        let mut rebuilt = Vec::new();
        for chunk in full_range.chunks(batch_hours) {
            rebuilt.extend(
                self.warm_batch(tenant_id, config, &analysis, chunk, now)
                    .await?,
            );
        }
        Ok(rebuilt)
    }

    async fn warm_batch(
        &self,
        tenant_id: &str,
        config: &EpinetConfig,
        analysis: &EpinetAnalysis,
        chunk: &[HourKey],
        now: DateTime<Utc>,
    ) -> Result<Vec<HourKey>, WarmingError> {
        let Some(first) = chunk.first() else {
            return Ok(Vec::new());
        };
        let Some(last) = chunk.last() else {
            return Ok(Vec::new());
        };
        let chunk_start = first.start();
        let chunk_end = last.next().start();

        let action_verbs: Vec<String> = analysis.action_verbs.iter().cloned().collect();
        let belief_values: Vec<String> = analysis
            .belief_values
            .iter()
            .chain(analysis.identify_as_values.iter())
            .cloned()
            .collect();

        let action_events = self
            .events
            .find_action_events(chunk_start, chunk_end, &action_verbs)
            .await?;
        let belief_events = self
            .events
            .find_belief_events(chunk_start, chunk_end, &belief_values)
            .await?;

        let mut actions_by_hour: HashMap<String, Vec<_>> = HashMap::new();
        for event in action_events {
            actions_by_hour
                .entry(HourKey::from_datetime(event.created_at).to_string())
                .or_default()
                .push(event);
        }
        let mut beliefs_by_hour: HashMap<String, Vec<_>> = HashMap::new();
        for event in belief_events {
            beliefs_by_hour
                .entry(HourKey::from_datetime(event.updated_at).to_string())
                .or_default()
                .push(event);
        }

        let mut rebuilt = Vec::new();
        for hour_key in chunk {
            let hour_str = hour_key.to_string();
            if let Some(existing) = self
                .cache
                .get_hourly_bin(tenant_id, &config.epinet_id, &hour_str)
                .await?
            {
                if existing.is_fresh(now.timestamp_millis()) {
                    continue;
                }
            }

            let actions = actions_by_hour.remove(&hour_str).unwrap_or_default();
            let beliefs = beliefs_by_hour.remove(&hour_str).unwrap_or_default();
            self.warm_hour(tenant_id, config, hour_key, actions, beliefs, now)
                .await?;
            rebuilt.push(hour_key.clone());
        }
        Ok(rebuilt)
    }

    async fn warm_hour(
        &self,
        tenant_id: &str,
        config: &EpinetConfig,
        hour_key: &HourKey,
        actions: Vec<epinetix_events::ActionEvent>,
        beliefs: Vec<epinetix_events::BeliefEvent>,
        now: DateTime<Utc>,
    ) -> Result<Arc<HourlyEpinetBin>, WarmingError> {
        let inflight_key = format!("{tenant_id}|{}|{hour_key}", config.epinet_id);
        let is_current = hour_key.is_current(now);
        let ttl_secs = if is_current {
            self.config.current_hour_ttl_secs
        } else {
            self.config.historical_ttl_secs
        };

        // Owned clones: `try_get_with` spawns the init future on its own task
        // so concurrent callers can join it, which requires `'static`.
        let tenant_id = tenant_id.to_string();
        let config = config.clone();
        let hour_key = hour_key.clone();
        let cache = Arc::clone(&self.cache);
        let content_lookup = Arc::clone(&self.content_lookup);

        let result = self
            .inflight
            .try_get_with(inflight_key, async move {
                let bin = build_bin(content_lookup.as_ref(), &config, &hour_key, actions, beliefs, now, ttl_secs)?;
                cache.set_hourly_bin(&tenant_id, &bin, is_current).await?;
                Ok::<_, WarmingError>(Arc::new(bin))
            })
            .await;

        result.map_err(|arc_err| match Arc::try_unwrap(arc_err) {
            Ok(err) => err,
            Err(shared) => WarmingError::invalid_config(shared.to_string()),
        })
    }
}

fn build_bin<L: ContentTitleLookup>(
    content_lookup: &L,
    config: &EpinetConfig,
    hour_key: &HourKey,
    actions: Vec<epinetix_events::ActionEvent>,
    beliefs: Vec<epinetix_events::BeliefEvent>,
    now: DateTime<Utc>,
    ttl_secs: u64,
) -> Result<HourlyEpinetBin, WarmingError> {
    let mut steps: Vec<(String, StepInfo)> = Vec::new();
    let mut visitor_nodes: HashMap<String, Vec<(String, u32)>> = HashMap::new();

    for (index, step) in config.steps.iter().enumerate() {
        #[allow(clippy::as_conversions)]
        let step_index = (index + 1) as u32;

        for event in &actions {
            let Some(matched_value) = action_event_matches_step(event, step) else {
                continue;
            };
            let id = node_id(
                step.gate_type,
                step_index,
                Some(matched_value),
                Some(&event.object_id),
            );
            let name = content_lookup
                .title_for(&event.object_type, &event.object_id)
                .unwrap_or_else(|| UNKNOWN_CONTENT.to_string());
            record_visit(&mut steps, &mut visitor_nodes, id, name, step_index, &event.fingerprint_id);
        }

        for event in &beliefs {
            let Some(matched_value) = belief_event_matches_step(event, step) else {
                continue;
            };
            let id = node_id(step.gate_type, step_index, Some(matched_value), None);
            record_visit(
                &mut steps,
                &mut visitor_nodes,
                id,
                matched_value.to_string(),
                step_index,
                &event.fingerprint_id,
            );
        }
    }

    let transitions = build_transitions(&visitor_nodes);

    HourlyEpinetBin::build(
        config.epinet_id.clone(),
        hour_key.to_string(),
        steps,
        transitions,
        now.timestamp_millis(),
        ttl_secs,
    )
    .map_err(WarmingError::from)
}

fn record_visit(
    steps: &mut Vec<(String, StepInfo)>,
    visitor_nodes: &mut HashMap<String, Vec<(String, u32)>>,
    node_id: String,
    name: String,
    step_index: u32,
    fingerprint_id: &str,
) {
    match steps.iter_mut().find(|(id, _)| id == &node_id) {
        Some((_, info)) => {
            if !info.visitors.iter().any(|v| v == fingerprint_id) {
                info.visitors.push(fingerprint_id.to_string());
            }
        }
        None => steps.push((
            node_id.clone(),
            StepInfo {
                name,
                step_index,
                visitors: vec![fingerprint_id.to_string()],
            },
        )),
    }
    let entry = visitor_nodes.entry(fingerprint_id.to_string()).or_default();
    if !entry.iter().any(|(id, _)| id == &node_id) {
        entry.push((node_id, step_index));
    }
}

fn build_transitions(
    visitor_nodes: &HashMap<String, Vec<(String, u32)>>,
) -> Vec<(String, Vec<(String, TransitionInfo)>)> {
    let mut transitions: Vec<(String, Vec<(String, TransitionInfo)>)> = Vec::new();

    for (fingerprint_id, nodes) in visitor_nodes {
        let mut sorted = nodes.clone();
        sorted.sort_by_key(|(_, step_index)| *step_index);
        for pair in sorted.windows(2) {
            let (from_id, from_index) = &pair[0];
            let (to_id, to_index) = &pair[1];
            if to_index != &(from_index + 1) {
                continue;
            }
            let from_entry = match transitions.iter_mut().position(|(id, _)| id == from_id) {
                Some(pos) => pos,
                None => {
                    transitions.push((from_id.clone(), Vec::new()));
                    transitions.len() - 1
                }
            };
            #[allow(clippy::indexing_slicing)]
            let edges = &mut transitions[from_entry].1;
            match edges.iter_mut().find(|(id, _)| id == to_id) {
                Some((_, info)) => info.visitors.push(fingerprint_id.clone()),
                None => edges.push((
                    to_id.clone(),
                    TransitionInfo {
                        visitors: vec![fingerprint_id.clone()],
                    },
                )),
            }
        }
    }

    transitions
}

#[cfg(test)]
impl<L: ContentTitleLookup + 'static> WarmingEngine<L> {
    fn available_permits(&self) -> usize {
        self.warm_semaphore.available_permits()
    }
}

fn hour_range(start: &HourKey, end: &HourKey) -> Vec<HourKey> {
    let mut hours = Vec::new();
    let mut current = start.clone();
    loop {
        hours.push(current.clone());
        if &current == end {
            break;
        }
        current = current.next();
    }
    hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EpinetStep;
    use epinetix_cache::GateType;
    use epinetix_events::ActionEvent;
    use epinetix_tenant::BackendConnection;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::BTreeSet;

    struct StaticTitles;
    impl ContentTitleLookup for StaticTitles {
        fn title_for(&self, _object_type: &str, object_id: &str) -> Option<String> {
            Some(format!("Title for {object_id}"))
        }
    }

    async fn seeded_pool(rows: &[(&str, &str, &str, &str, &str)]) -> sqlx::SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE actions (object_id TEXT, object_type TEXT, verb TEXT, fingerprint_id TEXT, created_at TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE beliefs (id TEXT PRIMARY KEY, slug TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE heldbeliefs (belief_id TEXT, fingerprint_id TEXT, verb TEXT, object TEXT, updated_at TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (object_id, object_type, verb, fingerprint_id, created_at) in rows {
            sqlx::query("INSERT INTO actions VALUES (?, ?, ?, ?, ?)")
                .bind(object_id)
                .bind(object_type)
                .bind(verb)
                .bind(fingerprint_id)
                .bind(created_at)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    }

    fn linear_config() -> EpinetConfig {
        EpinetConfig {
            epinet_id: "epinet-1".to_string(),
            title: "Funnel".to_string(),
            steps: vec![
                EpinetStep {
                    gate_type: GateType::CommitmentAction,
                    values: BTreeSet::from(["VIEWED".to_string()]),
                    object_type: Some("Pane".to_string()),
                    object_ids: BTreeSet::new(),
                },
                EpinetStep {
                    gate_type: GateType::ConversionAction,
                    values: BTreeSet::from(["CLICKED".to_string()]),
                    object_type: Some("Pane".to_string()),
                    object_ids: BTreeSet::new(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn warm_range_builds_single_visitor_linear_funnel() {
        let pool = seeded_pool(&[
            ("pane1", "Pane", "VIEWED", "fp1", "2026-07-31T09:05:00Z"),
            ("pane1", "Pane", "CLICKED", "fp1", "2026-07-31T09:10:00Z"),
        ])
        .await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let cache = Arc::new(CacheStore::new());
        let engine = WarmingEngine::new(repo, cache.clone(), Arc::new(StaticTitles), WarmingConfig::default());

        let hour = HourKey::parse("2026-07-31-09").unwrap();
        let now = hour.start() + chrono::Duration::minutes(20);
        let rebuilt = engine
            .warm_range("acme", &linear_config(), &hour, &hour, now)
            .await
            .unwrap();
        assert_eq!(rebuilt, vec![hour.clone()]);

        let bin = cache
            .get_hourly_bin("acme", "epinet-1", "2026-07-31-09")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bin.steps().len(), 2);
        assert_eq!(bin.transitions().len(), 1);
        let (_, edges) = &bin.transitions()[0];
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].1.visitors.len(), 1);
    }

    #[tokio::test]
    async fn warm_range_skips_fresh_hours() {
        let pool = seeded_pool(&[]).await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let cache = Arc::new(CacheStore::new());
        let engine = WarmingEngine::new(repo, cache.clone(), Arc::new(StaticTitles), WarmingConfig::default());

        let hour = HourKey::parse("2026-07-31-09").unwrap();
        let now = hour.start();
        engine
            .warm_range("acme", &linear_config(), &hour, &hour, now)
            .await
            .unwrap();

        let rebuilt_again = engine
            .warm_range("acme", &linear_config(), &hour, &hour, now)
            .await
            .unwrap();
        assert!(rebuilt_again.is_empty(), "already-fresh hour should be skipped");
    }

    #[tokio::test]
    async fn warm_semaphore_sized_by_config_and_released_after_use() {
        let pool = seeded_pool(&[]).await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let cache = Arc::new(CacheStore::new());
        let config = WarmingConfig {
            warm_concurrency_per_tenant: 2,
            ..WarmingConfig::default()
        };
        let engine = WarmingEngine::new(repo, cache, Arc::new(StaticTitles), config);
        assert_eq!(engine.available_permits(), 2);

        let hour = HourKey::parse("2026-07-31-09").unwrap();
        let now = hour.start();
        engine
            .warm_range("acme", &linear_config(), &hour, &hour, now)
            .await
            .unwrap();

        assert_eq!(engine.available_permits(), 2, "permit released after warm_range completes");
    }

    #[tokio::test]
    async fn warm_concurrency_of_zero_clamps_to_one() {
        let pool = seeded_pool(&[]).await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let cache = Arc::new(CacheStore::new());
        let config = WarmingConfig {
            warm_concurrency_per_tenant: 0,
            ..WarmingConfig::default()
        };
        let engine = WarmingEngine::new(repo, cache, Arc::new(StaticTitles), config);
        assert_eq!(engine.available_permits(), 1);
    }

    #[tokio::test]
    async fn non_consecutive_steps_produce_no_transition() {
        let pool = seeded_pool(&[("pane1", "Pane", "CLICKED", "fp1", "2026-07-31T09:10:00Z")]).await;
        let repo = EventRepository::new(BackendConnection::Sqlite(pool));
        let cache = Arc::new(CacheStore::new());
        let engine = WarmingEngine::new(repo, cache.clone(), Arc::new(StaticTitles), WarmingConfig::default());

        let hour = HourKey::parse("2026-07-31-09").unwrap();
        let now = hour.start();
        engine
            .warm_range("acme", &linear_config(), &hour, &hour, now)
            .await
            .unwrap();

        let bin = cache
            .get_hourly_bin("acme", "epinet-1", "2026-07-31-09")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bin.steps().len(), 1, "only the CLICKED step matched");
        assert!(bin.transitions().is_empty());
    }
}
