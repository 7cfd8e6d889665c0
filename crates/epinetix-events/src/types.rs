//! Raw event rows as read from the content server's persistence tables.
//!
//! These are read-only views over externally-written data (`actions`,
//! `heldbeliefs` joined with `beliefs`); nothing in this crate writes them.

use chrono::{DateTime, Utc};

/// A page/content interaction: `actions(object_id, object_type, verb, fingerprint_id, created_at)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub object_id: String,
    pub object_type: String,
    pub verb: String,
    pub fingerprint_id: String,
    pub created_at: DateTime<Utc>,
}

/// An expressed belief or identity claim: `heldbeliefs` joined with `beliefs(id, slug)`.
///
/// Last-writer-wins per `(fingerprint_id, slug)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeliefEvent {
    pub slug: String,
    pub fingerprint_id: String,
    pub verb: String,
    pub object: Option<String>,
    pub updated_at: DateTime<Utc>,
}
