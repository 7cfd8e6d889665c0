//! Cache infrastructure error types.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use epinetix_core::ErrorCode;

/// Cache infrastructure errors with UUID tracking.
#[derive(Debug)]
pub struct CacheError {
    id: Uuid,
    kind: CacheErrorKind,
    backtrace: Backtrace,
}

/// Specific cache failure kinds.
#[derive(Debug)]
pub enum CacheErrorKind {
    /// rkyv serialization/deserialization failed.
    Serialization(String),
    /// A cached value violated one of the invariants this crate guarantees
    /// (e.g. a transition whose endpoint isn't a step in the same bin).
    InvalidBin(String),
    /// Requested entry not present.
    NotFound { resource: String, id: String },
}

impl CacheError {
    #[must_use]
    pub fn new(kind: CacheErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(CacheErrorKind::Serialization(message.into()))
    }

    #[must_use]
    pub fn invalid_bin(message: impl Into<String>) -> Self {
        Self::new(CacheErrorKind::InvalidBin(message.into()))
    }

    #[must_use]
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(CacheErrorKind::NotFound {
            resource: resource.into(),
            id: id.into(),
        })
    }

    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &CacheErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            CacheErrorKind::Serialization(_) => ErrorCode::InternalError,
            CacheErrorKind::InvalidBin(_) => ErrorCode::InternalError,
            CacheErrorKind::NotFound { .. } => ErrorCode::NotFound,
        }
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CacheErrorKind::Serialization(msg) => write!(f, "cache serialization error: {msg}"),
            CacheErrorKind::InvalidBin(msg) => write!(f, "cache invariant violation: {msg}"),
            CacheErrorKind::NotFound { resource, id } => write!(f, "{resource} {id} not found"),
        }
    }
}

impl std::error::Error for CacheError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_has_unique_id() {
        let err1 = CacheError::serialization("bad bytes");
        let err2 = CacheError::serialization("bad bytes");
        assert_ne!(err1.error_id(), err2.error_id());
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(
            CacheError::not_found("HourlyEpinetBin", "2026-07-31-09").error_code(),
            ErrorCode::NotFound
        );
        assert_eq!(
            CacheError::invalid_bin("dangling transition").error_code(),
            ErrorCode::InternalError
        );
    }
}
