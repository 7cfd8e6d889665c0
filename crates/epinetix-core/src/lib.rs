//! Core domain abstractions shared across the epinetix crates.
//!
//! This crate contains the foundational types shared across every
//! tenant-scoped service crate: domain traits, error types, validated value
//! objects, error codes, and re-exports from fmodel-rust.

pub mod error;
pub mod error_code;
pub mod traits;
pub mod values;

pub use error::{DomainError, DomainErrorKind, ValidationError, ValidationErrorKind};
pub use error_code::ErrorCode;
pub use traits::EventType;
pub use values::{BoundedString, HourKey, TenantId};

// Re-export the fmodel-rust abstractions used for pure, commandless folds
// (hourly bins, belief registries) so downstream crates depend only on
// epinetix-core, not fmodel-rust directly.
pub use fmodel_rust::Identifier;
pub use fmodel_rust::view::View;
pub use fmodel_rust::view::ViewStateComputation;
