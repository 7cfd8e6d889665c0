//! Event repository error types.

use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

use epinetix_core::ErrorCode;

/// Event repository errors with UUID tracking.
#[derive(Debug)]
pub struct EventRepositoryError {
    id: Uuid,
    kind: EventRepositoryErrorKind,
    backtrace: Backtrace,
}

/// Specific event repository failure kinds.
#[derive(Debug)]
pub enum EventRepositoryErrorKind {
    /// sqlx query against the sqlite backend failed.
    Sqlx(sqlx::Error),
    /// libsql query against the turso backend failed.
    Libsql(libsql::Error),
    /// Database operation failed (message-based, e.g. unsupported backend).
    DatabaseMessage(String),
}

impl EventRepositoryError {
    #[must_use]
    pub fn new(kind: EventRepositoryErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(EventRepositoryErrorKind::DatabaseMessage(message.into()))
    }

    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &EventRepositoryErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            EventRepositoryErrorKind::Sqlx(_)
            | EventRepositoryErrorKind::Libsql(_)
            | EventRepositoryErrorKind::DatabaseMessage(_) => ErrorCode::DatabaseError,
        }
    }
}

impl fmt::Display for EventRepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventRepositoryErrorKind::Sqlx(e) => write!(f, "event repository database error: {e}"),
            EventRepositoryErrorKind::Libsql(e) => write!(f, "event repository database error: {e}"),
            EventRepositoryErrorKind::DatabaseMessage(msg) => {
                write!(f, "event repository database error: {msg}")
            }
        }
    }
}

impl std::error::Error for EventRepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            EventRepositoryErrorKind::Sqlx(e) => Some(e),
            EventRepositoryErrorKind::Libsql(e) => Some(e),
            EventRepositoryErrorKind::DatabaseMessage(_) => None,
        }
    }
}

impl From<sqlx::Error> for EventRepositoryError {
    fn from(e: sqlx::Error) -> Self {
        Self::new(EventRepositoryErrorKind::Sqlx(e))
    }
}

impl From<libsql::Error> for EventRepositoryError {
    fn from(e: libsql::Error) -> Self {
        Self::new(EventRepositoryErrorKind::Libsql(e))
    }
}
