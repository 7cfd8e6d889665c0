//! Zenoh key expressions for belief-change fan-out.
//!
//! Every key lives under [`EVENTS_ROOT`], scoped per tenant so a single
//! embedded session can serve every tenant without cross-tenant leakage.

/// Root prefix for every key this crate publishes or subscribes under.
pub const EVENTS_ROOT: &str = "epinetix/events";

/// Matches every belief-broadcast key for every tenant.
pub const ALL_BELIEF_EVENTS: &str = "epinetix/events/*/belief/**";

/// Key a single [`crate::bus::BeliefChangeMessage`] is published under.
#[must_use]
pub fn belief_broadcast_key(tenant_id: &str, storyfragment_id: &str) -> String {
    format!("{EVENTS_ROOT}/{tenant_id}/belief/{storyfragment_id}")
}

/// Subscription pattern for every belief broadcast belonging to one tenant.
#[must_use]
pub fn belief_broadcast_pattern(tenant_id: &str) -> String {
    format!("{EVENTS_ROOT}/{tenant_id}/belief/**")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_key_is_scoped_per_tenant_and_storyfragment() {
        assert_eq!(belief_broadcast_key("acme", "sf1"), "epinetix/events/acme/belief/sf1");
    }

    #[test]
    fn broadcast_pattern_covers_every_storyfragment_for_a_tenant() {
        assert_eq!(belief_broadcast_pattern("acme"), "epinetix/events/acme/belief/**");
    }
}
