//! Builds a storyfragment's belief registry from its loaded panes.

use std::collections::BTreeSet;
use std::sync::Arc;

use epinetix_cache::{CacheStore, PaneBeliefData, StoryfragmentBeliefRegistry};

use crate::error::BeliefError;
use crate::types::PaneInput;

const MATCH_ACROSS_KEY: &str = "MATCH-ACROSS";
const LINKED_BELIEFS_KEY: &str = "LINKED-BELIEFS";
const WIDGET_PREFIXES: [&str; 3] = ["belief(", "toggle(", "identifyAs("];

pub struct BeliefRegistryService {
    cache: Arc<CacheStore>,
}

impl BeliefRegistryService {
    #[must_use]
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self { cache }
    }

    /// Return the cached registry for `storyfragment_id`, or build and
    /// publish one from `panes`.
    ///
    /// # Errors
    ///
    /// Returns [`BeliefError`] if a cache read or write fails.
    pub async fn build_from_loaded_panes(
        &self,
        tenant_id: &str,
        storyfragment_id: &str,
        panes: &[PaneInput],
    ) -> Result<StoryfragmentBeliefRegistry, BeliefError> {
        if let Some(cached) = self.cache.get_storyfragment_registry(tenant_id, storyfragment_id).await? {
            return Ok(cached);
        }

        let mut pane_belief_payloads = Vec::new();
        let mut pane_widget_beliefs = Vec::new();
        let mut all_widget_beliefs: BTreeSet<String> = BTreeSet::new();
        let mut required_beliefs: BTreeSet<String> = BTreeSet::new();

        for pane in panes {
            let (held_beliefs, match_across) = split_special_key(&pane.held_beliefs, MATCH_ACROSS_KEY);
            let (held_beliefs, linked_beliefs) = extract_linked(&held_beliefs, LINKED_BELIEFS_KEY);
            let (withheld_beliefs, _) = split_special_key(&pane.withheld_beliefs, MATCH_ACROSS_KEY);

            for (slug, _) in &held_beliefs {
                required_beliefs.insert(slug.clone());
            }
            for (slug, _) in &withheld_beliefs {
                required_beliefs.insert(slug.clone());
            }
            required_beliefs.extend(match_across.iter().cloned());
            required_beliefs.extend(linked_beliefs.iter().cloned());

            let widget_slugs = scan_widget_beliefs(&pane.widget_copy);
            if !widget_slugs.is_empty() {
                all_widget_beliefs.extend(widget_slugs.iter().cloned());
                pane_widget_beliefs.push((pane.pane_id.clone(), widget_slugs));
            }

            pane_belief_payloads.push((
                pane.pane_id.clone(),
                PaneBeliefData {
                    held_beliefs,
                    withheld_beliefs,
                    match_across,
                    linked_beliefs,
                    held_badges: Vec::new(),
                },
            ));
        }

        required_beliefs.extend(all_widget_beliefs.iter().cloned());

        let registry = StoryfragmentBeliefRegistry {
            storyfragment_id: storyfragment_id.to_string(),
            pane_belief_payloads,
            pane_widget_beliefs,
            all_widget_beliefs: all_widget_beliefs.into_iter().collect(),
            required_beliefs: required_beliefs.into_iter().collect(),
            last_updated_unix_ms: chrono::Utc::now().timestamp_millis(),
        };

        self.cache.set_storyfragment_registry(tenant_id, &registry).await?;
        Ok(registry)
    }
}

fn split_special_key(
    entries: &[(String, Vec<String>)],
    key: &str,
) -> (Vec<(String, Vec<String>)>, Vec<String>) {
    let mut regular = Vec::new();
    let mut extracted = Vec::new();
    for (slug, values) in entries {
        if slug == key {
            extracted.extend(values.iter().cloned());
        } else {
            regular.push((slug.clone(), values.clone()));
        }
    }
    (regular, extracted)
}

fn extract_linked(
    entries: &[(String, Vec<String>)],
    key: &str,
) -> (Vec<(String, Vec<String>)>, Vec<String>) {
    split_special_key(entries, key)
}

fn scan_widget_beliefs(widget_copy: &[String]) -> Vec<String> {
    let mut slugs: BTreeSet<String> = BTreeSet::new();
    for copy in widget_copy {
        let Some(prefix) = WIDGET_PREFIXES.iter().find(|p| copy.starts_with(*p)) else {
            continue;
        };
        let Some(rest) = copy.strip_prefix(prefix) else { continue };
        let Some(slug) = rest.split(')').next().and_then(|inner| inner.split(',').next()) else {
            continue;
        };
        let slug = slug.trim();
        if !slug.is_empty() {
            slugs.insert(slug.to_string());
        }
    }
    slugs.into_iter().collect()
}
