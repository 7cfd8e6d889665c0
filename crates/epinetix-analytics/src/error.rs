//! Analytics computation errors.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use epinetix_cache::CacheError;
use epinetix_core::ErrorCode;
use epinetix_events::EventRepositoryError;

#[derive(Debug)]
pub struct AnalyticsError {
    id: Uuid,
    kind: AnalyticsErrorKind,
    backtrace: Backtrace,
}

#[derive(Debug)]
pub enum AnalyticsErrorKind {
    Cache(CacheError),
    Events(EventRepositoryError),
}

impl AnalyticsError {
    #[must_use]
    pub fn new(kind: AnalyticsErrorKind) -> Self {
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
    pub fn kind(&self) -> &AnalyticsErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AnalyticsErrorKind::Cache(e) => e.error_code(),
            AnalyticsErrorKind::Events(e) => e.error_code(),
        }
    }
}

impl fmt::Display for AnalyticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AnalyticsErrorKind::Cache(e) => write!(f, "analytics cache read failed: {e}"),
            AnalyticsErrorKind::Events(e) => write!(f, "analytics lead read failed: {e}"),
        }
    }
}

impl std::error::Error for AnalyticsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            AnalyticsErrorKind::Cache(e) => Some(e),
            AnalyticsErrorKind::Events(e) => Some(e),
        }
    }
}

impl From<CacheError> for AnalyticsError {
    fn from(e: CacheError) -> Self {
        Self::new(AnalyticsErrorKind::Cache(e))
    }
}

impl From<EventRepositoryError> for AnalyticsError {
    fn from(e: EventRepositoryError) -> Self {
        Self::new(AnalyticsErrorKind::Events(e))
    }
}
