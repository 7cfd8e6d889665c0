//! Warming pipeline error types.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use epinetix_cache::CacheError;
use epinetix_core::ErrorCode;
use epinetix_events::EventRepositoryError;

/// Warming pipeline errors with UUID tracking.
#[derive(Debug)]
pub struct WarmingError {
    id: Uuid,
    kind: WarmingErrorKind,
    backtrace: Backtrace,
}

/// Specific warming failure kinds.
#[derive(Debug)]
pub enum WarmingErrorKind {
    /// Reading raw events failed.
    Events(EventRepositoryError),
    /// Writing or reading the bin cache failed.
    Cache(CacheError),
    /// The epinet's step configuration is malformed (e.g. no steps).
    InvalidConfig(String),
}

impl WarmingError {
    #[must_use]
    pub fn new(kind: WarmingErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(WarmingErrorKind::InvalidConfig(message.into()))
    }

    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &WarmingErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            WarmingErrorKind::Events(e) => e.error_code(),
            WarmingErrorKind::Cache(e) => e.error_code(),
            WarmingErrorKind::InvalidConfig(_) => ErrorCode::ValidationFailed,
        }
    }
}

impl fmt::Display for WarmingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarmingErrorKind::Events(e) => write!(f, "warming event read failed: {e}"),
            WarmingErrorKind::Cache(e) => write!(f, "warming cache operation failed: {e}"),
            WarmingErrorKind::InvalidConfig(msg) => write!(f, "invalid epinet configuration: {msg}"),
        }
    }
}

impl std::error::Error for WarmingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            WarmingErrorKind::Events(e) => Some(e),
            WarmingErrorKind::Cache(e) => Some(e),
            WarmingErrorKind::InvalidConfig(_) => None,
        }
    }
}

impl From<EventRepositoryError> for WarmingError {
    fn from(e: EventRepositoryError) -> Self {
        Self::new(WarmingErrorKind::Events(e))
    }
}

impl From<CacheError> for WarmingError {
    fn from(e: CacheError) -> Self {
        Self::new(WarmingErrorKind::Cache(e))
    }
}
