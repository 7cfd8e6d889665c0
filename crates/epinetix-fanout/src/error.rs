//! Event bus/fan-out error types.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use epinetix_core::ErrorCode;

#[derive(Debug)]
pub struct FanoutError {
    id: Uuid,
    kind: FanoutErrorKind,
    backtrace: Backtrace,
}

#[derive(Debug)]
pub enum FanoutErrorKind {
    /// Zenoh publish/subscribe operation failed.
    EventBus(String),
    /// JSON (de)serialization of a fanned-out event failed.
    Serialization(serde_json::Error),
}

impl FanoutError {
    #[must_use]
    pub fn new(kind: FanoutErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn event_bus(message: impl Into<String>) -> Self {
        Self::new(FanoutErrorKind::EventBus(message.into()))
    }

    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &FanoutErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            FanoutErrorKind::EventBus(_) => ErrorCode::ServiceUnavailable,
            FanoutErrorKind::Serialization(_) => ErrorCode::InternalError,
        }
    }
}

impl fmt::Display for FanoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FanoutErrorKind::EventBus(msg) => write!(f, "fan-out event bus error: {msg}"),
            FanoutErrorKind::Serialization(e) => write!(f, "fan-out serialization error: {e}"),
        }
    }
}

impl std::error::Error for FanoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            FanoutErrorKind::Serialization(e) => Some(e),
            FanoutErrorKind::EventBus(_) => None,
        }
    }
}

impl From<serde_json::Error> for FanoutError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(FanoutErrorKind::Serialization(e))
    }
}
