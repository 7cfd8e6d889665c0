//! Tenant resolution and lifecycle status.

use std::collections::HashMap;
use std::sync::RwLock;

use epinetix_core::TenantId;

use crate::error::{TenantError, TenantErrorKind};

/// Lifecycle status of a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantStatus {
    /// Accepting traffic.
    Active,
    /// Provisioned but not yet accepting traffic.
    Reserved,
    /// Deliberately taken offline.
    Inactive,
}

/// Header carrying the tenant id on inbound requests.
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Query parameter fallback, used by connections that cannot set headers
/// (e.g. EventSource/SSE clients).
pub const TENANT_QUERY_PARAM: &str = "tenantId";

/// Tenant id used when multi-tenant mode is disabled.
pub const DEFAULT_TENANT: &str = "default";

/// In-memory registry of known tenants and their status.
///
/// Thread-safe: reads take a shared lock, writes (registration, status
/// change) take an exclusive lock on the whole map. The registry is small
/// (one entry per tenant) so a single lock is adequate; it is not on any
/// per-request hot path beyond a lookup.
pub struct TenantRegistry {
    enable_multi_tenant: bool,
    tenants: RwLock<HashMap<String, TenantStatus>>,
}

impl TenantRegistry {
    #[must_use]
    pub fn new(enable_multi_tenant: bool) -> Self {
        Self {
            enable_multi_tenant,
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tenant, or update its status if already known.
    pub fn upsert(&self, tenant_id: &TenantId, status: TenantStatus) {
        #[expect(clippy::expect_used, reason = "registry lock is never poisoned by a panic")]
        let mut tenants = self.tenants.write().expect("tenant registry lock poisoned");
        tenants.insert(tenant_id.as_str().to_string(), status);
    }

    /// Resolve the tenant id for a request, given the header value and query
    /// parameter value observed by the caller (at most one need be `Some`).
    ///
    /// # Errors
    ///
    /// Returns [`TenantErrorKind::UnknownTenant`] if neither source carries an
    /// id and single-tenant mode is disabled.
    pub fn resolve(
        &self,
        header_value: Option<&str>,
        query_value: Option<&str>,
    ) -> Result<TenantId, TenantError> {
        if let Some(v) = header_value.filter(|v| !v.trim().is_empty()) {
            return TenantId::new(v).map_err(|_| TenantError::new(TenantErrorKind::UnknownTenant));
        }
        if let Some(v) = query_value.filter(|v| !v.trim().is_empty()) {
            return TenantId::new(v).map_err(|_| TenantError::new(TenantErrorKind::UnknownTenant));
        }
        if !self.enable_multi_tenant {
            return TenantId::new(DEFAULT_TENANT)
                .map_err(|_| TenantError::new(TenantErrorKind::UnknownTenant));
        }
        Err(TenantError::new(TenantErrorKind::UnknownTenant))
    }

    /// Look up a tenant's status, requiring that it be active.
    ///
    /// # Errors
    ///
    /// Returns [`TenantErrorKind::UnknownTenant`] if the tenant was never
    /// registered, or [`TenantErrorKind::TenantNotActive`] if it exists but
    /// isn't active.
    pub fn require_active(&self, tenant_id: &TenantId) -> Result<(), TenantError> {
        #[expect(clippy::expect_used, reason = "registry lock is never poisoned by a panic")]
        let tenants = self.tenants.read().expect("tenant registry lock poisoned");
        match tenants.get(tenant_id.as_str()) {
            Some(TenantStatus::Active) => Ok(()),
            Some(_) => Err(TenantError::new(TenantErrorKind::TenantNotActive {
                tenant_id: tenant_id.as_str().to_string(),
            })),
            None => Err(TenantError::new(TenantErrorKind::UnknownTenant)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_from_header_first() {
        let registry = TenantRegistry::new(true);
        let tenant = registry.resolve(Some("acme"), Some("other")).unwrap();
        assert_eq!(tenant.as_str(), "acme");
    }

    #[test]
    fn falls_back_to_query_param() {
        let registry = TenantRegistry::new(true);
        let tenant = registry.resolve(None, Some("acme")).unwrap();
        assert_eq!(tenant.as_str(), "acme");
    }

    #[test]
    fn single_tenant_mode_uses_default() {
        let registry = TenantRegistry::new(false);
        let tenant = registry.resolve(None, None).unwrap();
        assert_eq!(tenant.as_str(), DEFAULT_TENANT);
    }

    #[test]
    fn multi_tenant_without_any_source_is_unknown() {
        let registry = TenantRegistry::new(true);
        let err = registry.resolve(None, None).unwrap_err();
        assert!(matches!(err.kind(), TenantErrorKind::UnknownTenant));
    }

    #[test]
    fn require_active_rejects_unregistered_tenant() {
        let registry = TenantRegistry::new(true);
        let tenant = TenantId::new("acme").unwrap();
        assert!(registry.require_active(&tenant).is_err());
    }

    #[test]
    fn require_active_rejects_reserved_tenant() {
        let registry = TenantRegistry::new(true);
        let tenant = TenantId::new("acme").unwrap();
        registry.upsert(&tenant, TenantStatus::Reserved);
        let err = registry.require_active(&tenant).unwrap_err();
        assert!(matches!(err.kind(), TenantErrorKind::TenantNotActive { .. }));
    }

    #[test]
    fn require_active_accepts_active_tenant() {
        let registry = TenantRegistry::new(true);
        let tenant = TenantId::new("acme").unwrap();
        registry.upsert(&tenant, TenantStatus::Active);
        assert!(registry.require_active(&tenant).is_ok());
    }
}
