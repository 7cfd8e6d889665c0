//! Tenant resolution and per-tenant SQL connection pooling.
//!
//! Every cached and computed artifact in the system is partitioned by
//! tenant id; this crate is the one place that resolves which tenant a
//! request belongs to and how to reach that tenant's backing store.

pub mod error;
pub mod pool;
pub mod registry;

pub use error::{TenantError, TenantErrorKind};
pub use pool::{Backend, BackendConnection, ConnectionPool, PoolConfig, TenantLocator, spawn_janitor};
pub use registry::{TenantRegistry, TenantStatus, DEFAULT_TENANT, TENANT_HEADER, TENANT_QUERY_PARAM};
