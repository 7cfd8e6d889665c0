//! Stand-in for the externally-owned `ContentServices` collaborator.
//!
//! Title lookups for event nodes come from content entities (story fragments,
//! panes) that this core treats as an external, cache-first read-through
//! service living outside this crate's scope. `NullContentTitleLookup`
//! satisfies [`epinetix_warming::ContentTitleLookup`] with no titles so the
//! warming pipeline is runnable standalone; a deployment wires a real
//! `ContentServices` client in its place.
pub struct NullContentTitleLookup;

impl epinetix_warming::ContentTitleLookup for NullContentTitleLookup {
    fn title_for(&self, _object_type: &str, _object_id: &str) -> Option<String> {
        None
    }
}
