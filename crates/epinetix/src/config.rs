//! Application configuration loaded from environment variables.
//!
//! Twelve-factor: every variable is prefixed `EPINETIX_`, has a sensible
//! development default, and a malformed value is logged as a warning and
//! falls back to that default rather than failing startup.
//!
//! | Variable | Default | Maps to |
//! |---|---|---|
//! | `EPINETIX_PORT` | 3000 | operational HTTP surface (health/metrics) |
//! | `EPINETIX_ENABLE_MULTI_TENANT` | false | tenant resolution mode |
//! | `EPINETIX_ANALYTICS_BIN_TTL_SECS` | 86400 | historical hourly-bin freshness |
//! | `EPINETIX_CURRENT_HOUR_TTL_SECS` | 900 | current-hour bin freshness |
//! | `EPINETIX_EVENT_COUNT_THRESHOLD` | 200000 | dynamic warming batch threshold |
//! | `EPINETIX_FULL_ANALYTICS_RANGE_HOURS` | 674 | hours kept warm |
//! | `EPINETIX_DB_MAX_OPEN_CONNS` | 10 | pool sizing |
//! | `EPINETIX_DB_MAX_IDLE_CONNS` | 5 | pool sizing (read, see note below) |
//! | `EPINETIX_DB_CONN_MAX_LIFETIME_SECS` | 3600 | pool sizing |
//! | `EPINETIX_DB_CONN_MAX_IDLE_TIME_SECS` | 600 | pool sizing |
//!
//! `EPINETIX_DB_MAX_IDLE_CONNS` is parsed for compatibility but has nothing
//! to apply to: each `(tenant, backend)` pair holds exactly one pooled
//! connection here rather than a sub-pool with its own idle-count, so idle
//! connections are reclaimed by `EPINETIX_DB_CONN_MAX_IDLE_TIME_SECS` alone.
//! | `EPINETIX_SLOW_QUERY_THRESHOLD_MS` | 500 | slow-operation log marker |
//! | `EPINETIX_WARM_CONCURRENCY_PER_TENANT` | 1 | per-tenant warming semaphore |
//! | `EPINETIX_SHUTDOWN_TIMEOUT_SECS` | 30 | graceful shutdown |
//!
//! Standard variables (no prefix): `RUST_LOG` controls tracing as usual.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub enable_multi_tenant: bool,
    pub analytics_bin_ttl_secs: u64,
    pub current_hour_ttl_secs: u64,
    pub event_count_threshold: i64,
    pub full_analytics_range_hours: u32,
    pub db_max_open_conns: u32,
    /// Parsed for twelve-factor completeness; unused (see module docs).
    pub db_max_idle_conns: u32,
    pub db_conn_max_lifetime_secs: u64,
    pub db_conn_max_idle_time_secs: u64,
    pub slow_query_threshold_ms: u64,
    pub warm_concurrency_per_tenant: usize,
    pub shutdown_timeout: Duration,
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| {
            s.parse().ok().or_else(|| {
                tracing::warn!(value = %s, variable = name, "invalid value, using default");
                None
            })
        })
        .unwrap_or(default)
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|s| !matches!(s.to_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(default)
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: parse_env("EPINETIX_PORT", 3000),
            enable_multi_tenant: parse_bool_env("EPINETIX_ENABLE_MULTI_TENANT", false),
            analytics_bin_ttl_secs: parse_env("EPINETIX_ANALYTICS_BIN_TTL_SECS", 86_400),
            current_hour_ttl_secs: parse_env("EPINETIX_CURRENT_HOUR_TTL_SECS", 900),
            event_count_threshold: parse_env("EPINETIX_EVENT_COUNT_THRESHOLD", 200_000),
            full_analytics_range_hours: parse_env("EPINETIX_FULL_ANALYTICS_RANGE_HOURS", 674),
            db_max_open_conns: parse_env("EPINETIX_DB_MAX_OPEN_CONNS", 10),
            db_max_idle_conns: parse_env("EPINETIX_DB_MAX_IDLE_CONNS", 5),
            db_conn_max_lifetime_secs: parse_env("EPINETIX_DB_CONN_MAX_LIFETIME_SECS", 3600),
            db_conn_max_idle_time_secs: parse_env("EPINETIX_DB_CONN_MAX_IDLE_TIME_SECS", 600),
            slow_query_threshold_ms: parse_env("EPINETIX_SLOW_QUERY_THRESHOLD_MS", 500),
            warm_concurrency_per_tenant: parse_env("EPINETIX_WARM_CONCURRENCY_PER_TENANT", 1),
            shutdown_timeout: Duration::from_secs(parse_env("EPINETIX_SHUTDOWN_TIMEOUT_SECS", 30)),
        }
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            enable_multi_tenant: false,
            analytics_bin_ttl_secs: 86_400,
            current_hour_ttl_secs: 900,
            event_count_threshold: 200_000,
            full_analytics_range_hours: 674,
            db_max_open_conns: 10,
            db_max_idle_conns: 5,
            db_conn_max_lifetime_secs: 3600,
            db_conn_max_idle_time_secs: 600,
            slow_query_threshold_ms: 500,
            warm_concurrency_per_tenant: 1,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(!config.enable_multi_tenant);
        assert_eq!(config.analytics_bin_ttl_secs, 86_400);
        assert_eq!(config.current_hour_ttl_secs, 900);
        assert_eq!(config.event_count_threshold, 200_000);
        assert_eq!(config.full_analytics_range_hours, 674);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }

    #[test]
    fn socket_addr_binding() {
        let config = Config {
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), SocketAddr::from(([0, 0, 0, 0], 8080)));
    }
}
