//! Domain layer error types with UUID tracking for distributed tracing.
//!
//! These are pure domain errors with no infrastructure dependencies. Every error
//! includes a unique identifier for correlation across logs and traces.
//!
//! # Error types
//!
//! - [`ValidationError`]: Field-level validation failures (e.g., empty field, invalid format)
//! - [`DomainError`]: Business rule violations (e.g., invalid bin, version conflict)
//!
//! # Design principles
//!
//! - **Pure types**: No side effects, no infrastructure dependencies
//! - **UUID tracking**: Every error instance gets a unique ID for tracing
//! - **Backtrace capture**: Backtraces are captured at error creation for debugging
//! - **Informative messages**: Display implementations provide user-friendly messages

use crate::error_code::ErrorCode;
use std::backtrace::Backtrace;
use std::fmt;
use uuid::Uuid;

/// Field-level validation errors with UUID tracking.
///
/// Use this type when validating user input at the domain boundary. Each variant
/// captures specific validation failure details that enable informative error messages.
#[derive(Debug)]
pub struct ValidationError {
    id: Uuid,
    kind: ValidationErrorKind,
    backtrace: Backtrace,
}

/// Specific validation failure kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required field is empty or whitespace-only.
    EmptyField { field: String },
    /// Field value doesn't match expected format.
    InvalidFormat { field: String, expected: String },
    /// Numeric value outside allowed range.
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },
    /// String exceeds maximum length.
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },
    /// String shorter than minimum length.
    TooShort {
        field: String,
        min_length: usize,
        actual_length: usize,
    },
}

impl ValidationError {
    /// Create a new validation error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: ValidationErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Get the unique error ID for tracing correlation.
    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    /// Get the specific validation failure kind.
    #[must_use]
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    /// Get the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::EmptyField { field } => write!(f, "{field} cannot be empty"),
            ValidationErrorKind::InvalidFormat { field, expected } => {
                write!(f, "{field} has invalid format, expected: {expected}")
            }
            ValidationErrorKind::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "{field} must be between {min} and {max}, got {actual}"),
            ValidationErrorKind::TooLong {
                field,
                max_length,
                actual_length,
            } => write!(
                f,
                "{field} exceeds maximum length {max_length} (got {actual_length})"
            ),
            ValidationErrorKind::TooShort {
                field,
                min_length,
                actual_length,
            } => write!(
                f,
                "{field} is shorter than minimum length {min_length} (got {actual_length})"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Business rule violation errors with UUID tracking.
///
/// Use this type for domain-level invariant violations that aren't simple field
/// validation (those belong in [`ValidationError`]). Domain errors represent
/// failures in business logic, bin invariants, or aggregate lookups.
#[derive(Debug)]
pub struct DomainError {
    id: Uuid,
    kind: DomainErrorKind,
    backtrace: Backtrace,
}

/// Specific domain error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainErrorKind {
    /// A cached value references a relationship its invariants forbid
    /// (e.g. a transition whose endpoint is not a step in the same bin).
    InvariantViolation { detail: String },
    /// Aggregate with this ID already exists.
    AlreadyExists {
        aggregate_type: String,
        aggregate_id: String,
    },
    /// Aggregate with this ID was not found.
    NotFound {
        aggregate_type: String,
        aggregate_id: String,
    },
    /// Expected version doesn't match actual version (optimistic locking).
    VersionConflict { expected: i64, actual: i64 },
}

impl DomainError {
    /// Create a new domain error with automatic UUID and backtrace.
    #[must_use]
    pub fn new(kind: DomainErrorKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Get the unique error ID for tracing correlation.
    #[must_use]
    pub fn error_id(&self) -> Uuid {
        self.id
    }

    /// Get the specific domain error kind.
    #[must_use]
    pub fn kind(&self) -> &DomainErrorKind {
        &self.kind
    }

    /// Get the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Map domain error kind to HTTP-compatible error code.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            DomainErrorKind::InvariantViolation { .. } => ErrorCode::InternalError,
            DomainErrorKind::AlreadyExists { .. } => ErrorCode::Conflict,
            DomainErrorKind::NotFound { .. } => ErrorCode::NotFound,
            DomainErrorKind::VersionConflict { .. } => ErrorCode::Conflict,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DomainErrorKind::InvariantViolation { detail } => {
                write!(f, "invariant violation: {detail}")
            }
            DomainErrorKind::AlreadyExists {
                aggregate_type,
                aggregate_id,
            } => write!(f, "{aggregate_type} {aggregate_id} already exists"),
            DomainErrorKind::NotFound {
                aggregate_type,
                aggregate_id,
            } => write!(f, "{aggregate_type} {aggregate_id} not found"),
            DomainErrorKind::VersionConflict { expected, actual } => {
                write!(f, "version conflict: expected {expected}, got {actual}")
            }
        }
    }
}

impl std::error::Error for DomainError {}
