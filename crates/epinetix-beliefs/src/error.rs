//! Belief registry/evaluation/broadcast errors.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use epinetix_cache::CacheError;
use epinetix_core::ErrorCode;

#[derive(Debug)]
pub struct BeliefError {
    id: Uuid,
    kind: BeliefErrorKind,
    backtrace: Backtrace,
}

#[derive(Debug)]
pub enum BeliefErrorKind {
    Cache(CacheError),
}

impl BeliefError {
    #[must_use]
    pub fn new(kind: BeliefErrorKind) -> Self {
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
    pub fn kind(&self) -> &BeliefErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            BeliefErrorKind::Cache(e) => e.error_code(),
        }
    }
}

impl fmt::Display for BeliefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BeliefErrorKind::Cache(e) => write!(f, "belief registry cache operation failed: {e}"),
        }
    }
}

impl std::error::Error for BeliefError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            BeliefErrorKind::Cache(e) => Some(e),
        }
    }
}

impl From<CacheError> for BeliefError {
    fn from(e: CacheError) -> Self {
        Self::new(BeliefErrorKind::Cache(e))
    }
}
