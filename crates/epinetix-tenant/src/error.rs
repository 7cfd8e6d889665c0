//! Tenant and connection-pool error types.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use epinetix_core::ErrorCode;

/// Errors from tenant resolution and connection-pool management, with UUID
/// tracking for correlation across logs.
#[derive(Debug)]
pub struct TenantError {
    id: Uuid,
    kind: TenantErrorKind,
    backtrace: Backtrace,
}

/// Specific tenant/pool failure kinds.
#[derive(Debug)]
pub enum TenantErrorKind {
    /// No tenant id could be resolved from the request, and single-tenant
    /// mode is not enabled.
    UnknownTenant,
    /// The tenant is known but not currently active (reserved or inactive).
    TenantNotActive { tenant_id: String },
    /// Opening or pinging a pooled connection failed.
    Database(sqlx::Error),
    /// Opening or pinging a `libsql` (turso) connection failed.
    DatabaseMessage(String),
}

impl TenantError {
    #[must_use]
    pub fn new(kind: TenantErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &TenantErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            TenantErrorKind::UnknownTenant => ErrorCode::NotFound,
            TenantErrorKind::TenantNotActive { .. } => ErrorCode::ServiceUnavailable,
            TenantErrorKind::Database(_) | TenantErrorKind::DatabaseMessage(_) => {
                ErrorCode::DatabaseError
            }
        }
    }

    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(TenantErrorKind::DatabaseMessage(message.into()))
    }
}

impl fmt::Display for TenantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TenantErrorKind::UnknownTenant => write!(f, "no tenant id could be resolved"),
            TenantErrorKind::TenantNotActive { tenant_id } => {
                write!(f, "tenant {tenant_id} is not active")
            }
            TenantErrorKind::Database(e) => write!(f, "tenant pool database error: {e}"),
            TenantErrorKind::DatabaseMessage(msg) => {
                write!(f, "tenant pool database error: {msg}")
            }
        }
    }
}

impl std::error::Error for TenantError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            TenantErrorKind::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for TenantError {
    fn from(e: sqlx::Error) -> Self {
        Self::new(TenantErrorKind::Database(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_has_unique_id() {
        let err1 = TenantError::database("ping timeout");
        let err2 = TenantError::database("ping timeout");
        assert_ne!(err1.error_id(), err2.error_id());
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(
            TenantError::new(TenantErrorKind::UnknownTenant).error_code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            TenantError::new(TenantErrorKind::TenantNotActive {
                tenant_id: "acme".to_string()
            })
            .error_code(),
            ErrorCode::ServiceUnavailable
        );
    }
}
