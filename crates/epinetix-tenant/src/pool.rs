//! Per-tenant, per-backend SQL connection pooling.
//!
//! Pools are keyed by `(tenant_id, backend)` where `backend` is either the
//! local `sqlite` file store or the remote `turso` ([`libsql`]) store. A
//! background janitor pings idle entries and evicts ones that fail or have
//! sat idle past `max_idle_time`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::error::TenantError;

/// Which SQL backend a tenant's connection pool targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Local SQLite file, one database per tenant.
    Sqlite,
    /// Remote Turso database accessed via `libsql`.
    Turso,
}

/// A live connection handle for one backend.
///
/// Cheaply cloneable: `SqlitePool` is an `Arc` internally and the Turso
/// handle is wrapped in one explicitly.
#[derive(Clone)]
pub enum BackendConnection {
    Sqlite(SqlitePool),
    Turso(Arc<libsql::Database>),
}

struct PoolEntry {
    conn: BackendConnection,
    opened_at: Instant,
    last_used: Instant,
}

/// Resolves where a tenant's backing store lives.
///
/// Kept as a trait (rather than a fixed naming convention) so the caller
/// can point sqlite at a per-tenant file path and turso at a per-tenant
/// database URL + auth token without this crate knowing the layout.
pub trait TenantLocator: Send + Sync {
    fn sqlite_url(&self, tenant_id: &str) -> String;
    fn turso_url(&self, tenant_id: &str) -> String;
    fn turso_auth_token(&self, tenant_id: &str) -> String;
}

/// Sizing and lifetime knobs, mirroring `EPINETIX_DB_*` configuration.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_open_conns: u32,
    pub conn_max_lifetime: Duration,
    pub conn_max_idle_time: Duration,
    pub ping_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open_conns: 10,
            conn_max_lifetime: Duration::from_secs(3600),
            conn_max_idle_time: Duration::from_secs(600),
            ping_timeout: Duration::from_secs(2),
        }
    }
}

/// Keyed pool of SQL connections across tenants and backends.
pub struct ConnectionPool {
    locator: Arc<dyn TenantLocator>,
    config: PoolConfig,
    entries: RwLock<HashMap<(String, Backend), PoolEntry>>,
}

impl ConnectionPool {
    #[must_use]
    pub fn new(locator: Arc<dyn TenantLocator>, config: PoolConfig) -> Self {
        Self {
            locator,
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch an existing connection for `(tenant_id, backend)` or open one.
    ///
    /// # Errors
    ///
    /// Returns a [`TenantError`] if opening the underlying connection fails.
    pub async fn get_or_open(
        &self,
        tenant_id: &str,
        backend: Backend,
    ) -> Result<BackendConnection, TenantError> {
        let key = (tenant_id.to_string(), backend);
        {
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.get_mut(&key) {
                entry.last_used = Instant::now();
                return Ok(entry.conn.clone());
            }
        }

        let conn = self.open(tenant_id, backend).await?;
        let now = Instant::now();
        self.entries.write().await.insert(
            key,
            PoolEntry {
                conn: conn.clone(),
                opened_at: now,
                last_used: now,
            },
        );
        Ok(conn)
    }

    async fn open(
        &self,
        tenant_id: &str,
        backend: Backend,
    ) -> Result<BackendConnection, TenantError> {
        match backend {
            Backend::Sqlite => {
                let url = self.locator.sqlite_url(tenant_id);
                let pool = SqlitePoolOptions::new()
                    .max_connections(self.config.max_open_conns)
                    .acquire_timeout(Duration::from_secs(5))
                    .connect(&url)
                    .await?;
                Ok(BackendConnection::Sqlite(pool))
            }
            Backend::Turso => {
                let url = self.locator.turso_url(tenant_id);
                let token = self.locator.turso_auth_token(tenant_id);
                let db = libsql::Builder::new_remote(url, token)
                    .build()
                    .await
                    .map_err(|e| TenantError::database(e.to_string()))?;
                Ok(BackendConnection::Turso(Arc::new(db)))
            }
        }
    }

    /// Ping every pooled entry; evict ones that fail or have exceeded
    /// `conn_max_idle_time` / `conn_max_lifetime`. Returns the number evicted.
    pub async fn run_janitor_pass(&self) -> usize {
        let now = Instant::now();
        let stale: Vec<(String, Backend)> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .filter(|(_, entry)| {
                    now.duration_since(entry.last_used) > self.config.conn_max_idle_time
                        || now.duration_since(entry.opened_at) > self.config.conn_max_lifetime
                })
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut failed: Vec<(String, Backend)> = Vec::new();
        {
            let entries = self.entries.read().await;
            for (key, entry) in entries.iter() {
                if stale.contains(key) {
                    continue;
                }
                if tokio::time::timeout(self.config.ping_timeout, ping(&entry.conn))
                    .await
                    .is_err()
                {
                    failed.push(key.clone());
                }
            }
        }

        let mut evicted = 0;
        let mut entries = self.entries.write().await;
        for key in stale.into_iter().chain(failed) {
            if entries.remove(&key).is_some() {
                tracing::warn!(tenant_id = %key.0, backend = ?key.1, "evicting pooled connection");
                evicted += 1;
            }
        }
        evicted
    }

    /// Number of currently pooled connections, for diagnostics/tests.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

async fn ping(conn: &BackendConnection) -> Result<(), TenantError> {
    match conn {
        BackendConnection::Sqlite(pool) => {
            sqlx::query("SELECT 1").execute(pool).await?;
            Ok(())
        }
        BackendConnection::Turso(db) => {
            let conn = db
                .connect()
                .map_err(|e| TenantError::database(e.to_string()))?;
            conn.query("SELECT 1", ())
                .await
                .map_err(|e| TenantError::database(e.to_string()))?;
            Ok(())
        }
    }
}

/// Spawn a background task that periodically runs [`ConnectionPool::run_janitor_pass`].
///
/// Mirrors the teacher's pattern of spawning a background tokio task at
/// startup that owns a shared handle and loops until cancellation.
pub fn spawn_janitor(pool: Arc<ConnectionPool>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let evicted = pool.run_janitor_pass().await;
            if evicted > 0 {
                tracing::info!(evicted, "connection pool janitor evicted stale entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemoryLocator;

    impl TenantLocator for MemoryLocator {
        fn sqlite_url(&self, _tenant_id: &str) -> String {
            "sqlite::memory:".to_string()
        }

        fn turso_url(&self, tenant_id: &str) -> String {
            format!("libsql://{tenant_id}.turso.io")
        }

        fn turso_auth_token(&self, _tenant_id: &str) -> String {
            "test-token".to_string()
        }
    }

    #[tokio::test]
    async fn opens_and_reuses_sqlite_connection() {
        let pool = ConnectionPool::new(Arc::new(MemoryLocator), PoolConfig::default());
        let _ = pool.get_or_open("acme", Backend::Sqlite).await.unwrap();
        assert_eq!(pool.len().await, 1);
        let _ = pool.get_or_open("acme", Backend::Sqlite).await.unwrap();
        assert_eq!(pool.len().await, 1, "second call reuses pooled entry");
    }

    #[tokio::test]
    async fn distinct_tenants_get_distinct_entries() {
        let pool = ConnectionPool::new(Arc::new(MemoryLocator), PoolConfig::default());
        let _ = pool.get_or_open("acme", Backend::Sqlite).await.unwrap();
        let _ = pool.get_or_open("globex", Backend::Sqlite).await.unwrap();
        assert_eq!(pool.len().await, 2);
    }

    #[tokio::test]
    async fn janitor_evicts_idle_past_threshold() {
        let config = PoolConfig {
            conn_max_idle_time: Duration::from_millis(1),
            ..PoolConfig::default()
        };
        let pool = ConnectionPool::new(Arc::new(MemoryLocator), config);
        let _ = pool.get_or_open("acme", Backend::Sqlite).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let evicted = pool.run_janitor_pass().await;
        assert_eq!(evicted, 1);
        assert_eq!(pool.len().await, 0);
    }
}
