//! Tenant-scoped, tiered cache store.
//!
//! One [`CacheStore`] is shared process-wide. Every method takes a tenant id
//! explicitly; there is no ambient tenant. Readers take no lock beyond what
//! `moka::future::Cache` already provides internally; the only explicit lock
//! here guards the belief-slug index used for O(affected) broadcast lookups.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;
use std::time::Duration;

use crate::entity_cache::{deserialize, serialize, EntityCache};
use crate::error::CacheError;
use crate::types::{FingerprintState, HourlyEpinetBin, HtmlFragment, StoryfragmentBeliefRegistry};

/// Content entities: 24h TTL (§3 Ownership & lifecycle).
const CONTENT_TTL: Duration = Duration::from_secs(24 * 3600);
/// Current-hour bins: short TTL so the in-progress hour refreshes often.
const CURRENT_HOUR_BIN_TTL: Duration = Duration::from_secs(15 * 60);
/// Historical (closed) hours: long TTL, they never change once published.
const HISTORICAL_BIN_TTL: Duration = Duration::from_secs(24 * 3600);
/// Registries and HTML fragments are invalidated explicitly; TTL is a backstop.
const REGISTRY_TTL: Duration = Duration::from_secs(24 * 3600);
const HTML_FRAGMENT_TTL: Duration = Duration::from_secs(24 * 3600);
const FINGERPRINT_TTL: Duration = Duration::from_secs(24 * 3600);

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

pub struct CacheStore {
    content: EntityCache,
    current_hour_bins: EntityCache,
    historical_bins: EntityCache,
    registries: EntityCache,
    fingerprints: EntityCache,
    html_fragments: EntityCache,
    /// slug -> set of (tenant_id, storyfragment_id) registries that reference it.
    slug_index: RwLock<HashMap<String, BTreeSet<(String, String)>>>,
    /// (tenant_id, dependency_tag) -> set of (pane_id, variant_tag) fragment
    /// keys tagged with it, for `invalidate_by_dependency`'s cascade.
    dependency_index: RwLock<HashMap<(String, String), BTreeSet<(String, String)>>>,
}

impl CacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            content: EntityCache::with_ttl(DEFAULT_MAX_CAPACITY, CONTENT_TTL),
            current_hour_bins: EntityCache::with_ttl(DEFAULT_MAX_CAPACITY, CURRENT_HOUR_BIN_TTL),
            historical_bins: EntityCache::with_ttl(DEFAULT_MAX_CAPACITY, HISTORICAL_BIN_TTL),
            registries: EntityCache::with_ttl(DEFAULT_MAX_CAPACITY, REGISTRY_TTL),
            fingerprints: EntityCache::with_ttl(DEFAULT_MAX_CAPACITY, FINGERPRINT_TTL),
            html_fragments: EntityCache::with_ttl(DEFAULT_MAX_CAPACITY, HTML_FRAGMENT_TTL),
            slug_index: RwLock::new(HashMap::new()),
            dependency_index: RwLock::new(HashMap::new()),
        }
    }

    // -- content entities (opaque bytes; caller owns the schema) --------

    pub async fn get_content(&self, tenant_id: &str, kind: &str, id: &str) -> Option<Vec<u8>> {
        self.content.get(&content_key(tenant_id, kind, id)).await
    }

    pub async fn set_content(&self, tenant_id: &str, kind: &str, id: &str, bytes: Vec<u8>) {
        self.content.insert(content_key(tenant_id, kind, id), bytes).await;
    }

    pub async fn invalidate_content(&self, tenant_id: &str, kind: &str, id: &str) {
        self.content.invalidate(&content_key(tenant_id, kind, id)).await;
    }

    // -- hourly epinet bins ----------------------------------------------

    /// Look up a bin, checking the current-hour tier first, then historical.
    pub async fn get_hourly_bin(
        &self,
        tenant_id: &str,
        epinet_id: &str,
        hour_key: &str,
    ) -> Result<Option<HourlyEpinetBin>, CacheError> {
        let key = bin_key(tenant_id, epinet_id, hour_key);
        if let Some(bytes) = self.current_hour_bins.get(&key).await {
            return Ok(Some(deserialize(&bytes)?));
        }
        if let Some(bytes) = self.historical_bins.get(&key).await {
            return Ok(Some(deserialize(&bytes)?));
        }
        Ok(None)
    }

    /// Publish a bin. `is_current` selects the TTL tier; bins are never
    /// mutated after publish, only replaced.
    pub async fn set_hourly_bin(
        &self,
        tenant_id: &str,
        bin: &HourlyEpinetBin,
        is_current: bool,
    ) -> Result<(), CacheError> {
        let key = bin_key(tenant_id, &bin.epinet_id, &bin.hour_key);
        let bytes = serialize(bin)?;
        if is_current {
            self.current_hour_bins.insert(key, bytes).await;
        } else {
            self.historical_bins.insert(key, bytes).await;
        }
        Ok(())
    }

    // -- belief registries -------------------------------------------------

    pub async fn get_storyfragment_registry(
        &self,
        tenant_id: &str,
        storyfragment_id: &str,
    ) -> Result<Option<StoryfragmentBeliefRegistry>, CacheError> {
        let key = registry_key(tenant_id, storyfragment_id);
        match self.registries.get(&key).await {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn set_storyfragment_registry(
        &self,
        tenant_id: &str,
        registry: &StoryfragmentBeliefRegistry,
    ) -> Result<(), CacheError> {
        let key = registry_key(tenant_id, &registry.storyfragment_id);
        let bytes = serialize(registry)?;
        self.registries.insert(key, bytes).await;

        #[allow(clippy::expect_used)]
        let mut index = self.slug_index.write().expect("belief slug index lock poisoned");
        for slug in registry.all_referenced_slugs() {
            index
                .entry(slug)
                .or_default()
                .insert((tenant_id.to_string(), registry.storyfragment_id.clone()));
        }
        Ok(())
    }

    pub async fn invalidate_storyfragment_registry(&self, tenant_id: &str, storyfragment_id: &str) {
        let key = registry_key(tenant_id, storyfragment_id);
        self.registries.invalidate(&key).await;

        #[allow(clippy::expect_used)]
        let mut index = self.slug_index.write().expect("belief slug index lock poisoned");
        for registries in index.values_mut() {
            registries.remove(&(tenant_id.to_string(), storyfragment_id.to_string()));
        }
    }

    /// Storyfragment ids in `tenant_id` whose registry references `slug`.
    /// O(affected): looks up the slug once rather than scanning every
    /// registry in the cache.
    #[must_use]
    pub fn storyfragments_referencing(&self, tenant_id: &str, slug: &str) -> Vec<String> {
        #[allow(clippy::expect_used)]
        let index = self.slug_index.read().expect("belief slug index lock poisoned");
        index
            .get(slug)
            .into_iter()
            .flatten()
            .filter(|(tenant, _)| tenant == tenant_id)
            .map(|(_, storyfragment_id)| storyfragment_id.clone())
            .collect()
    }

    // -- fingerprint state ---------------------------------------------------

    pub async fn get_fingerprint_state(
        &self,
        tenant_id: &str,
        fingerprint_id: &str,
    ) -> Result<Option<FingerprintState>, CacheError> {
        let key = fingerprint_key(tenant_id, fingerprint_id);
        match self.fingerprints.get(&key).await {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn set_fingerprint_state(
        &self,
        tenant_id: &str,
        state: &FingerprintState,
    ) -> Result<(), CacheError> {
        let key = fingerprint_key(tenant_id, &state.fingerprint_id);
        let bytes = serialize(state)?;
        self.fingerprints.insert(key, bytes).await;
        Ok(())
    }

    // -- HTML fragments -----------------------------------------------------

    pub async fn get_html_fragment(
        &self,
        tenant_id: &str,
        pane_id: &str,
        variant_tag: &str,
    ) -> Result<Option<HtmlFragment>, CacheError> {
        let key = html_key(tenant_id, pane_id, variant_tag);
        match self.html_fragments.get(&key).await {
            Some(bytes) => Ok(Some(deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn set_html_fragment(
        &self,
        tenant_id: &str,
        pane_id: &str,
        variant_tag: &str,
        fragment: &HtmlFragment,
    ) -> Result<(), CacheError> {
        let key = html_key(tenant_id, pane_id, variant_tag);
        let bytes = serialize(fragment)?;
        self.html_fragments.insert(key, bytes).await;

        #[allow(clippy::expect_used)]
        let mut index = self
            .dependency_index
            .write()
            .expect("html dependency index lock poisoned");
        for tag in &fragment.dependencies {
            index
                .entry((tenant_id.to_string(), tag.clone()))
                .or_default()
                .insert((pane_id.to_string(), variant_tag.to_string()));
        }
        Ok(())
    }

    pub async fn invalidate_html_fragment(&self, tenant_id: &str, pane_id: &str, variant_tag: &str) {
        let key = html_key(tenant_id, pane_id, variant_tag);
        self.html_fragments.invalidate(&key).await;
    }

    /// Invalidate every cached HTML fragment (any variant) for `pane_id` in
    /// `tenant_id`. Used by `epinetix-beliefs::BeliefBroadcaster` once it has
    /// resolved the affected panes for a belief change.
    pub async fn invalidate_html_fragments_for_pane(&self, tenant_id: &str, pane_id: &str) {
        let prefix = format!("{tenant_id}|{pane_id}|");
        self.html_fragments.invalidate_where(move |k, _| k.starts_with(&prefix));
        self.html_fragments.run_pending_tasks().await;
    }

    /// Invalidate every cached HTML fragment tagged with `tag` in
    /// `tenant_id` (`invalidateByDependency`, SPEC_FULL §4.1) — a cascade
    /// keyed on the fragment's own declared dependencies, distinct from the
    /// pane-scoped invalidation `BeliefBroadcaster` drives.
    pub async fn invalidate_by_dependency(&self, tenant_id: &str, tag: &str) {
        let targets: Vec<(String, String)> = {
            #[allow(clippy::expect_used)]
            let mut index = self
                .dependency_index
                .write()
                .expect("html dependency index lock poisoned");
            index
                .remove(&(tenant_id.to_string(), tag.to_string()))
                .map(|set| set.into_iter().collect())
                .unwrap_or_default()
        };
        for (pane_id, variant_tag) in targets {
            let key = html_key(tenant_id, &pane_id, &variant_tag);
            self.html_fragments.invalidate(&key).await;
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

fn content_key(tenant_id: &str, kind: &str, id: &str) -> String {
    format!("{tenant_id}|{kind}|{id}")
}

fn bin_key(tenant_id: &str, epinet_id: &str, hour_key: &str) -> String {
    format!("{tenant_id}|{epinet_id}|{hour_key}")
}

fn registry_key(tenant_id: &str, storyfragment_id: &str) -> String {
    format!("{tenant_id}|{storyfragment_id}")
}

fn fingerprint_key(tenant_id: &str, fingerprint_id: &str) -> String {
    format!("{tenant_id}|{fingerprint_id}")
}

fn html_key(tenant_id: &str, pane_id: &str, variant_tag: &str) -> String {
    format!("{tenant_id}|{pane_id}|{variant_tag}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaneBeliefData, StepInfo};

    #[tokio::test]
    async fn content_roundtrips() {
        let store = CacheStore::new();
        store.set_content("acme", "storyfragment", "sf1", vec![1, 2, 3]).await;
        assert_eq!(
            store.get_content("acme", "storyfragment", "sf1").await,
            Some(vec![1, 2, 3])
        );
        store.invalidate_content("acme", "storyfragment", "sf1").await;
        assert_eq!(store.get_content("acme", "storyfragment", "sf1").await, None);
    }

    #[tokio::test]
    async fn hourly_bin_roundtrips_through_current_tier() {
        let store = CacheStore::new();
        let bin = HourlyEpinetBin::build(
            "epinet-1",
            "2026-07-31-09",
            vec![(
                "a".to_string(),
                StepInfo {
                    name: "A".to_string(),
                    step_index: 1,
                    visitors: vec!["fp1".to_string()],
                },
            )],
            vec![],
            0,
            900,
        )
        .unwrap();

        store.set_hourly_bin("acme", &bin, true).await.unwrap();
        let fetched = store
            .get_hourly_bin("acme", "epinet-1", "2026-07-31-09")
            .await
            .unwrap();
        assert_eq!(fetched, Some(bin));
    }

    #[tokio::test]
    async fn registry_index_enables_affected_lookup() {
        let store = CacheStore::new();
        let registry = StoryfragmentBeliefRegistry {
            storyfragment_id: "sf1".to_string(),
            pane_belief_payloads: vec![(
                "pane1".to_string(),
                PaneBeliefData {
                    held_beliefs: vec![("GNOSIS".to_string(), vec!["*".to_string()])],
                    ..Default::default()
                },
            )],
            pane_widget_beliefs: vec![],
            all_widget_beliefs: vec![],
            required_beliefs: vec!["GNOSIS".to_string()],
            last_updated_unix_ms: 0,
        };
        store.set_storyfragment_registry("acme", &registry).await.unwrap();

        assert_eq!(
            store.storyfragments_referencing("acme", "GNOSIS"),
            vec!["sf1".to_string()]
        );
        assert!(store.storyfragments_referencing("globex", "GNOSIS").is_empty());

        store.invalidate_storyfragment_registry("acme", "sf1").await;
        assert!(store.storyfragments_referencing("acme", "GNOSIS").is_empty());
    }

    #[tokio::test]
    async fn html_fragment_invalidation_clears_all_variants_for_pane() {
        let store = CacheStore::new();
        let fragment = HtmlFragment {
            pane_id: "pane1".to_string(),
            variant: crate::types::HtmlVariant::Default,
            html: "<div></div>".to_string(),
            dependencies: vec!["GNOSIS".to_string()],
        };
        store
            .set_html_fragment("acme", "pane1", "default", &fragment)
            .await
            .unwrap();
        store
            .set_html_fragment("acme", "pane1", "hidden", &fragment)
            .await
            .unwrap();

        store.invalidate_html_fragments_for_pane("acme", "pane1").await;

        assert!(store
            .get_html_fragment("acme", "pane1", "default")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_html_fragment("acme", "pane1", "hidden")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn invalidate_by_dependency_clears_every_tagged_fragment() {
        let store = CacheStore::new();
        let tagged = HtmlFragment {
            pane_id: "pane1".to_string(),
            variant: crate::types::HtmlVariant::Default,
            html: "<div></div>".to_string(),
            dependencies: vec!["GNOSIS".to_string()],
        };
        let untagged = HtmlFragment {
            pane_id: "pane2".to_string(),
            variant: crate::types::HtmlVariant::Default,
            html: "<div></div>".to_string(),
            dependencies: vec![],
        };
        store
            .set_html_fragment("acme", "pane1", "default", &tagged)
            .await
            .unwrap();
        store
            .set_html_fragment("acme", "pane2", "default", &untagged)
            .await
            .unwrap();

        store.invalidate_by_dependency("acme", "GNOSIS").await;

        assert!(store
            .get_html_fragment("acme", "pane1", "default")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .get_html_fragment("acme", "pane2", "default")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn invalidate_by_dependency_is_tenant_scoped() {
        let store = CacheStore::new();
        let fragment = HtmlFragment {
            pane_id: "pane1".to_string(),
            variant: crate::types::HtmlVariant::Default,
            html: "<div></div>".to_string(),
            dependencies: vec!["GNOSIS".to_string()],
        };
        store
            .set_html_fragment("acme", "pane1", "default", &fragment)
            .await
            .unwrap();

        store.invalidate_by_dependency("globex", "GNOSIS").await;

        assert!(store
            .get_html_fragment("acme", "pane1", "default")
            .await
            .unwrap()
            .is_some());
    }
}
