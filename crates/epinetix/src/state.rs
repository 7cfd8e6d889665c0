//! Application state: the composition root wiring every library crate
//! together behind the minimal operational HTTP surface this binary serves.
//!
//! A production deployment wires a real content router on top of these
//! same library services (`epinetix-analytics`, `epinetix-warming`,
//! `epinetix-beliefs`) via `FromRef<AppState>`; this binary itself only
//! exposes health, metrics, and graceful shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use metrics_exporter_prometheus::PrometheusHandle;

use epinetix_beliefs::BeliefRegistryService;
use epinetix_cache::CacheStore;
use epinetix_fanout::{SessionFanout, ViewerRegistry};
use epinetix_tenant::{ConnectionPool, PoolConfig, TenantRegistry};
use epinetix_warming::WarmingConfig;

use crate::config::Config;
use crate::infrastructure::content_lookup::NullContentTitleLookup;
use crate::infrastructure::tenant_locator::EnvTenantLocator;
use crate::presentation::health::HealthState;
use crate::presentation::metrics::MetricsState;

/// Central application state container.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tenant_registry: Arc<TenantRegistry>,
    pub connection_pool: Arc<ConnectionPool>,
    pub cache: Arc<CacheStore>,
    pub belief_registry: Arc<BeliefRegistryService>,
    pub content_lookup: Arc<NullContentTitleLookup>,
    pub warming_config: WarmingConfig,
    pub viewer_registry: Arc<ViewerRegistry>,
    /// `None` when the embedded Zenoh session failed to open; belief
    /// broadcasts are still computed, just not published to observers.
    pub fanout: Option<Arc<SessionFanout>>,
    prometheus_handle: PrometheusHandle,
}

impl AppState {
    /// Build every in-process dependency. Opening the Zenoh session is
    /// fallible and best-effort: a failure here disables fan-out publishing
    /// but does not prevent the process from starting.
    pub async fn bootstrap(config: Config, prometheus_handle: PrometheusHandle) -> Self {
        let tenant_registry = Arc::new(TenantRegistry::new(config.enable_multi_tenant));

        let locator = Arc::new(EnvTenantLocator::new(
            PathBuf::from("./data"),
            std::env::var("EPINETIX_TURSO_URL").unwrap_or_default(),
            std::env::var("EPINETIX_TURSO_AUTH_TOKEN").unwrap_or_default(),
        ));
        let pool_config = PoolConfig {
            max_open_conns: config.db_max_open_conns,
            conn_max_lifetime: std::time::Duration::from_secs(config.db_conn_max_lifetime_secs),
            conn_max_idle_time: std::time::Duration::from_secs(config.db_conn_max_idle_time_secs),
            ..Default::default()
        };
        let connection_pool = Arc::new(ConnectionPool::new(locator, pool_config));

        let cache = Arc::new(CacheStore::new());
        let belief_registry = Arc::new(BeliefRegistryService::new(Arc::clone(&cache)));

        let warming_config = WarmingConfig {
            event_count_threshold: config.event_count_threshold,
            current_hour_ttl_secs: config.current_hour_ttl_secs,
            historical_ttl_secs: config.analytics_bin_ttl_secs,
            warm_concurrency_per_tenant: config.warm_concurrency_per_tenant,
            ..Default::default()
        };

        let fanout = match epinetix_fanout::open_embedded_session().await {
            Ok(session) => Some(Arc::new(SessionFanout::new(session))),
            Err(e) => {
                tracing::warn!(error = %e, "failed to open embedded Zenoh session, fan-out publishing disabled");
                None
            }
        };

        Self {
            config,
            tenant_registry,
            connection_pool,
            cache,
            belief_registry,
            content_lookup: Arc::new(NullContentTitleLookup),
            warming_config,
            viewer_registry: Arc::new(ViewerRegistry::new()),
            fanout,
            prometheus_handle,
        }
    }
}

impl FromRef<AppState> for HealthState {
    fn from_ref(app_state: &AppState) -> Self {
        HealthState {
            tenant_registry: Arc::clone(&app_state.tenant_registry),
        }
    }
}

impl FromRef<AppState> for MetricsState {
    fn from_ref(app_state: &AppState) -> Self {
        MetricsState {
            prometheus_handle: app_state.prometheus_handle.clone(),
        }
    }
}
