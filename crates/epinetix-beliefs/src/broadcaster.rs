//! Turns a belief mutation into targeted HTML fragment invalidation.

use std::collections::BTreeSet;
use std::sync::Arc;

use epinetix_cache::CacheStore;

use crate::error::BeliefError;
use crate::types::BroadcastTarget;

/// Whether any session is currently rendering a given storyfragment.
///
/// Implemented downstream by the session fan-out layer; kept as a trait here
/// so this crate never depends on the transport that tracks live viewers.
pub trait ViewerTracker: Send + Sync {
    fn has_viewers(&self, tenant_id: &str, storyfragment_id: &str) -> bool;
}

pub struct BeliefBroadcaster<T: ViewerTracker> {
    cache: Arc<CacheStore>,
    viewers: T,
}

impl<T: ViewerTracker> BeliefBroadcaster<T> {
    #[must_use]
    pub fn new(cache: Arc<CacheStore>, viewers: T) -> Self {
        Self { cache, viewers }
    }

    /// Find every storyfragment referencing any of `changed_slugs` and
    /// invalidate the HTML fragments of its affected panes, but only for
    /// storyfragments with at least one live viewer.
    ///
    /// # Errors
    ///
    /// Returns [`BeliefError`] if a cache read fails.
    pub async fn broadcast_change(
        &self,
        tenant_id: &str,
        changed_slugs: &[String],
    ) -> Result<Vec<BroadcastTarget>, BeliefError> {
        let mut storyfragment_ids: BTreeSet<String> = BTreeSet::new();
        for slug in changed_slugs {
            storyfragment_ids.extend(self.cache.storyfragments_referencing(tenant_id, slug));
        }

        let mut targets = Vec::new();
        for storyfragment_id in storyfragment_ids {
            if !self.viewers.has_viewers(tenant_id, &storyfragment_id) {
                continue;
            }
            let Some(registry) = self.cache.get_storyfragment_registry(tenant_id, &storyfragment_id).await? else {
                continue;
            };
            let affected_panes = registry.affected_panes(changed_slugs);
            if affected_panes.is_empty() {
                continue;
            }
            for pane_id in &affected_panes {
                self.cache.invalidate_html_fragments_for_pane(tenant_id, pane_id).await;
            }
            targets.push(BroadcastTarget { storyfragment_id, affected_panes });
        }
        Ok(targets)
    }
}
