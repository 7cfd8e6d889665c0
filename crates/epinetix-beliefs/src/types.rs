//! Input shapes read from `ContentServices` (out of scope here) and the
//! evaluation engine's output.

/// One loaded pane, as handed to [`crate::registry::BeliefRegistryService`].
///
/// `held_beliefs`/`withheld_beliefs` are raw, before `MATCH-ACROSS` and
/// `LINKED-BELIEFS` are split out into their own fields. `widget_copy` is the
/// `copy` string of every code-hook widget node in the pane's node tree.
#[derive(Debug, Clone)]
pub struct PaneInput {
    pub pane_id: String,
    pub held_beliefs: Vec<(String, Vec<String>)>,
    pub withheld_beliefs: Vec<(String, Vec<String>)>,
    pub widget_copy: Vec<String>,
}

/// Render-time visibility decision from [`crate::evaluation::BeliefEvaluationEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
    /// Reserved for render sites that want a stripped wrapper; no current
    /// caller produces it.
    Empty,
}

/// One storyfragment's affected panes after a belief change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastTarget {
    pub storyfragment_id: String,
    pub affected_panes: Vec<String>,
}
