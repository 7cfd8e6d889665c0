//! Render-time visibility decisions over a pane's belief requirements.

use epinetix_cache::{FingerprintState, PaneBeliefData};

use crate::types::Visibility;

const WILDCARD: &str = "*";

pub struct BeliefEvaluationEngine;

impl BeliefEvaluationEngine {
    /// Evaluate a pane's visibility for a fingerprint's held beliefs.
    #[must_use]
    pub fn evaluate(pane_beliefs: &PaneBeliefData, user_beliefs: &FingerprintState) -> Visibility {
        let match_across: std::collections::HashSet<&str> =
            pane_beliefs.match_across.iter().map(String::as_str).collect();

        let (or_filter, and_filter): (Vec<_>, Vec<_>) = pane_beliefs
            .held_beliefs
            .iter()
            .partition(|(slug, _)| match_across.contains(slug.as_str()));

        let match_across_result = or_filter
            .is_empty()
            .then_some(true)
            .unwrap_or_else(|| or_filter.iter().any(|(slug, values)| has_matching_belief(user_beliefs, slug, values)));
        let regular_result = and_filter
            .is_empty()
            .then_some(true)
            .unwrap_or_else(|| and_filter.iter().all(|(slug, values)| has_matching_belief(user_beliefs, slug, values)));
        let held_result = match_across_result && regular_result;

        let withheld_result = !pane_beliefs
            .withheld_beliefs
            .iter()
            .any(|(slug, values)| has_matching_belief(user_beliefs, slug, values));

        if !pane_beliefs.held_beliefs.is_empty() && !held_result {
            return Visibility::Hidden;
        }
        if !pane_beliefs.withheld_beliefs.is_empty() && !withheld_result {
            return Visibility::Hidden;
        }
        Visibility::Visible
    }
}

/// True if the user holds any value for `slug` that matches any of
/// `required_values`, where `"*"` on either side matches anything.
fn has_matching_belief(user_beliefs: &FingerprintState, slug: &str, required_values: &[String]) -> bool {
    let Some((_, held_values)) = user_beliefs.held_beliefs.iter().find(|(s, _)| s == slug) else {
        return false;
    };
    required_values.iter().any(|required| {
        required == WILDCARD
            || held_values.iter().any(|held| held == WILDCARD || held == required)
    })
}
