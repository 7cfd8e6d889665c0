//! fmodel-rust re-exports and cross-crate marker traits.
//!
//! - `Identifier`: re-exported from fmodel-rust, aggregate identity for event folds
//! - `View`: re-exported from fmodel-rust, the pure commandless `evolve`/`initial_state`
//!   fold used by `epinetix-warming` (hourly bins) and `epinetix-beliefs` (registries)
//! - `EventType`: event type discriminator for JSON schema evolution

pub use fmodel_rust::Identifier;
pub use fmodel_rust::view::View;

/// Event type discriminator for JSON schema evolution.
///
/// Returns the event variant name matching the serde tag for deserialization.
pub trait EventType {
    fn event_type(&self) -> String;
}
