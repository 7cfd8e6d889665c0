//! Resolves where each tenant's SQL backend lives.

use std::path::PathBuf;

use epinetix_tenant::TenantLocator;

/// Locates tenant databases on local disk (sqlite) or via a shared Turso
/// endpoint (turso), keyed by tenant id.
///
/// Per-tenant Turso credentials are normally issued by a provisioning
/// service external to this core; this locator falls back to one shared
/// endpoint/token pair from the environment when no per-tenant override is
/// configured, which is adequate for a single-operator deployment.
pub struct EnvTenantLocator {
    sqlite_dir: PathBuf,
    turso_url: String,
    turso_auth_token: String,
}

impl EnvTenantLocator {
    #[must_use]
    pub fn new(sqlite_dir: PathBuf, turso_url: String, turso_auth_token: String) -> Self {
        Self {
            sqlite_dir,
            turso_url,
            turso_auth_token,
        }
    }
}

impl TenantLocator for EnvTenantLocator {
    fn sqlite_url(&self, tenant_id: &str) -> String {
        let path = self.sqlite_dir.join(format!("{tenant_id}.db"));
        format!("sqlite://{}?mode=rwc", path.display())
    }

    fn turso_url(&self, tenant_id: &str) -> String {
        format!("{}/{tenant_id}", self.turso_url.trim_end_matches('/'))
    }

    fn turso_auth_token(&self, _tenant_id: &str) -> String {
        self.turso_auth_token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_url_is_scoped_per_tenant() {
        let locator = EnvTenantLocator::new(PathBuf::from("/data"), String::new(), String::new());
        assert_eq!(locator.sqlite_url("acme"), "sqlite:///data/acme.db?mode=rwc");
    }

    #[test]
    fn turso_url_appends_tenant_id() {
        let locator = EnvTenantLocator::new(
            PathBuf::new(),
            "libsql://example.turso.io".to_string(),
            "token".to_string(),
        );
        assert_eq!(locator.turso_url("acme"), "libsql://example.turso.io/acme");
        assert_eq!(locator.turso_auth_token("acme"), "token");
    }
}
