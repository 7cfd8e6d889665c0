//! Prometheus metrics infrastructure.
//!
//! Installs the `metrics` facade with a Prometheus exporter recorder and
//! exposes a handle for rendering the Prometheus text exposition format at
//! the `/metrics` endpoint.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Warming duration histogram in seconds (labels: tenant_id, epinet_id).
pub const WARMING_DURATION_SECONDS: &str = "warming_duration_seconds";

/// Cache hits per entity class (labels: entity_class).
pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";

/// Cache misses per entity class (labels: entity_class).
pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";

/// Raw action/belief rows dropped for failing to parse (labels: reason).
pub const EVENTS_DROPPED_TOTAL: &str = "events_dropped_total";

/// Hourly bins discarded for violating an invariant (e.g. a transition
/// referencing a non-existent step).
pub const BINS_DISCARDED_TOTAL: &str = "bins_discarded_total";

/// Number of `(storyfragment, pane)` pairs invalidated per belief broadcast.
pub const BROADCAST_FANOUT_SIZE: &str = "broadcast_fanout_size";

/// Initialize the Prometheus metrics recorder and return a handle for rendering.
///
/// Must be called exactly once during startup, before any metrics are
/// emitted.
///
/// # Errors
///
/// Returns an error if a global recorder has already been installed or the
/// builder configuration is invalid.
pub fn init_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_histogram!(
        WARMING_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Duration of hourly-bin warming runs"
    );
    metrics::describe_counter!(
        CACHE_HITS_TOTAL,
        metrics::Unit::Count,
        "Cache hits by entity class"
    );
    metrics::describe_counter!(
        CACHE_MISSES_TOTAL,
        metrics::Unit::Count,
        "Cache misses by entity class"
    );
    metrics::describe_counter!(
        EVENTS_DROPPED_TOTAL,
        metrics::Unit::Count,
        "Raw rows dropped for failing to parse"
    );
    metrics::describe_counter!(
        BINS_DISCARDED_TOTAL,
        metrics::Unit::Count,
        "Hourly bins discarded for violating an invariant"
    );
    metrics::describe_histogram!(
        BROADCAST_FANOUT_SIZE,
        metrics::Unit::Count,
        "Pane count invalidated per belief broadcast"
    );
}

/// Create a non-global Prometheus handle for testing.
#[doc(hidden)]
pub fn test_prometheus_handle() -> PrometheusHandle {
    let recorder = PrometheusBuilder::new().build_recorder();
    recorder.handle()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prometheus_handle_renders_valid_output() {
        let handle = test_prometheus_handle();
        let output = handle.render();
        assert!(output.is_empty() || output.len() < 1_000_000);
    }

    #[test]
    fn metric_name_constants_follow_prometheus_conventions() {
        assert!(CACHE_HITS_TOTAL.ends_with("_total"));
        assert!(CACHE_MISSES_TOTAL.ends_with("_total"));
        assert!(EVENTS_DROPPED_TOTAL.ends_with("_total"));
        assert!(BINS_DISCARDED_TOTAL.ends_with("_total"));
        assert!(WARMING_DURATION_SECONDS.ends_with("_seconds"));
    }
}
