//! Tracks which storyfragments currently have at least one live observer.

use std::collections::HashMap;
use std::sync::RwLock;

use epinetix_beliefs::ViewerTracker;

/// In-memory viewer counter, keyed by `(tenant_id, storyfragment_id)`.
///
/// A "viewer" is one open SSE/WebSocket connection currently rendering that
/// storyfragment. Registration is reference-counted so multiple panes on the
/// same storyfragment, or multiple tabs from the same visitor, don't clobber
/// each other's deregistration.
pub struct ViewerRegistry {
    counts: RwLock<HashMap<(String, String), u32>>,
}

impl Default for ViewerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: RwLock::new(HashMap::new()),
        }
    }

    /// Record a new observer of `storyfragment_id`. Returns the resulting count.
    pub fn register(&self, tenant_id: &str, storyfragment_id: &str) -> u32 {
        #[expect(clippy::expect_used, reason = "viewer registry lock is never poisoned by a panic")]
        let mut counts = self.counts.write().expect("viewer registry lock poisoned");
        let entry = counts
            .entry((tenant_id.to_string(), storyfragment_id.to_string()))
            .or_insert(0);
        *entry += 1;
        *entry
    }

    /// Remove one observer of `storyfragment_id`. A no-op if the count is
    /// already zero.
    pub fn deregister(&self, tenant_id: &str, storyfragment_id: &str) {
        #[expect(clippy::expect_used, reason = "viewer registry lock is never poisoned by a panic")]
        let mut counts = self.counts.write().expect("viewer registry lock poisoned");
        let key = (tenant_id.to_string(), storyfragment_id.to_string());
        if let Some(count) = counts.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                counts.remove(&key);
            }
        }
    }
}

impl ViewerTracker for ViewerRegistry {
    fn has_viewers(&self, tenant_id: &str, storyfragment_id: &str) -> bool {
        #[expect(clippy::expect_used, reason = "viewer registry lock is never poisoned by a panic")]
        let counts = self.counts.read().expect("viewer registry lock poisoned");
        counts
            .get(&(tenant_id.to_string(), storyfragment_id.to_string()))
            .is_some_and(|count| *count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_storyfragment_has_no_viewers() {
        let registry = ViewerRegistry::new();
        assert!(!registry.has_viewers("acme", "sf1"));
    }

    #[test]
    fn register_then_deregister_clears_viewer_state() {
        let registry = ViewerRegistry::new();
        registry.register("acme", "sf1");
        assert!(registry.has_viewers("acme", "sf1"));

        registry.deregister("acme", "sf1");
        assert!(!registry.has_viewers("acme", "sf1"));
    }

    #[test]
    fn reference_counts_multiple_observers() {
        let registry = ViewerRegistry::new();
        registry.register("acme", "sf1");
        registry.register("acme", "sf1");
        registry.deregister("acme", "sf1");

        assert!(registry.has_viewers("acme", "sf1"), "one observer should remain");
    }

    #[test]
    fn tenants_are_isolated() {
        let registry = ViewerRegistry::new();
        registry.register("acme", "sf1");
        assert!(!registry.has_viewers("globex", "sf1"));
    }

    #[test]
    fn deregister_below_zero_is_a_no_op() {
        let registry = ViewerRegistry::new();
        registry.deregister("acme", "sf1");
        assert!(!registry.has_viewers("acme", "sf1"));
    }
}
