//! Cached domain value types.
//!
//! Every type here is `rkyv`-archivable so it can be stored as serialized
//! bytes in the underlying moka caches (see [`crate::entity_cache`]), the
//! same pattern `ironstar-analytics-infra::analytics_cache` uses for query
//! results. Timestamps are stored as Unix millis rather than `chrono`
//! types directly, since that is what round-trips cleanly through rkyv.

use crate::error::CacheError;

/// One of the four closed funnel gate types an epinet step can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize, serde::Serialize, serde::Deserialize)]
#[rkyv(compare(PartialEq))]
pub enum GateType {
    Belief,
    IdentifyAs,
    CommitmentAction,
    ConversionAction,
}

/// A single node in an hourly bin: the visitors who reached it and its
/// position in the funnel.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct StepInfo {
    pub name: String,
    pub step_index: u32,
    /// Sorted, de-duplicated fingerprint ids. A `Vec` rather than a set so
    /// the type stays rkyv-archivable without extra feature gates; callers
    /// that need set semantics go through [`StepInfo::visitor_set`].
    pub visitors: Vec<String>,
}

impl StepInfo {
    #[must_use]
    pub fn visitor_set(&self) -> std::collections::BTreeSet<&str> {
        self.visitors.iter().map(String::as_str).collect()
    }
}

/// Visitors who transitioned from one node to the next.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct TransitionInfo {
    pub visitors: Vec<String>,
}

/// One hour's worth of aggregated funnel activity for one epinet.
///
/// Construction is always through [`HourlyEpinetBin::build`], which enforces
/// the bin invariants: every transition endpoint exists as a step, endpoints
/// are consecutive in `step_index`, and transition visitors are a subset of
/// both endpoints' visitor sets.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct HourlyEpinetBin {
    pub epinet_id: String,
    pub hour_key: String,
    steps: Vec<(String, StepInfo)>,
    transitions: Vec<(String, Vec<(String, TransitionInfo)>)>,
    pub computed_at_unix_ms: i64,
    pub ttl_secs: u64,
}

impl HourlyEpinetBin {
    /// Build a bin, validating invariants before construction succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::invalid_bin`] if a transition references a
    /// missing step, endpoints aren't consecutive, or a transition's
    /// visitors aren't a subset of both endpoints' visitors.
    pub fn build(
        epinet_id: impl Into<String>,
        hour_key: impl Into<String>,
        steps: Vec<(String, StepInfo)>,
        transitions: Vec<(String, Vec<(String, TransitionInfo)>)>,
        computed_at_unix_ms: i64,
        ttl_secs: u64,
    ) -> Result<Self, CacheError> {
        let step_index: std::collections::HashMap<&str, &StepInfo> =
            steps.iter().map(|(id, info)| (id.as_str(), info)).collect();

        for (from_id, edges) in &transitions {
            let from = step_index
                .get(from_id.as_str())
                .ok_or_else(|| CacheError::invalid_bin(format!("transition from unknown step {from_id}")))?;
            for (to_id, edge) in edges {
                let to = step_index.get(to_id.as_str()).ok_or_else(|| {
                    CacheError::invalid_bin(format!("transition to unknown step {to_id}"))
                })?;
                if from.step_index + 1 != to.step_index {
                    return Err(CacheError::invalid_bin(format!(
                        "transition {from_id}->{to_id} is not between consecutive steps ({} -> {})",
                        from.step_index, to.step_index
                    )));
                }
                let from_set = from.visitor_set();
                let to_set = to.visitor_set();
                if edge.visitors.iter().any(|v| !from_set.contains(v.as_str()) || !to_set.contains(v.as_str()))
                {
                    return Err(CacheError::invalid_bin(format!(
                        "transition {from_id}->{to_id} has a visitor absent from one endpoint"
                    )));
                }
            }
        }

        Ok(Self {
            epinet_id: epinet_id.into(),
            hour_key: hour_key.into(),
            steps,
            transitions,
            computed_at_unix_ms,
            ttl_secs,
        })
    }

    #[must_use]
    pub fn steps(&self) -> &[(String, StepInfo)] {
        &self.steps
    }

    #[must_use]
    pub fn transitions(&self) -> &[(String, Vec<(String, TransitionInfo)>)] {
        &self.transitions
    }

    #[must_use]
    pub fn step(&self, node_id: &str) -> Option<&StepInfo> {
        self.steps.iter().find(|(id, _)| id == node_id).map(|(_, s)| s)
    }

    /// Whether this bin is still fresh relative to `now_unix_ms`.
    #[must_use]
    pub fn is_fresh(&self, now_unix_ms: i64) -> bool {
        let age_ms = now_unix_ms.saturating_sub(self.computed_at_unix_ms);
        age_ms < (self.ttl_secs as i64) * 1000
    }
}

/// Per-pane belief requirements extracted from a story fragment's panes.
#[derive(Debug, Clone, Default, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct PaneBeliefData {
    pub held_beliefs: Vec<(String, Vec<String>)>,
    pub withheld_beliefs: Vec<(String, Vec<String>)>,
    pub match_across: Vec<String>,
    pub linked_beliefs: Vec<String>,
    pub held_badges: Vec<String>,
}

/// Per-storyfragment index of which beliefs its panes depend on.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct StoryfragmentBeliefRegistry {
    pub storyfragment_id: String,
    pub pane_belief_payloads: Vec<(String, PaneBeliefData)>,
    pub pane_widget_beliefs: Vec<(String, Vec<String>)>,
    pub all_widget_beliefs: Vec<String>,
    pub required_beliefs: Vec<String>,
    pub last_updated_unix_ms: i64,
}

impl StoryfragmentBeliefRegistry {
    /// Every belief slug this registry depends on (held/withheld/matchAcross/
    /// linked across all panes, plus widget beliefs).
    #[must_use]
    pub fn all_referenced_slugs(&self) -> std::collections::BTreeSet<String> {
        let mut slugs: std::collections::BTreeSet<String> =
            self.required_beliefs.iter().cloned().collect();
        slugs.extend(self.all_widget_beliefs.iter().cloned());
        slugs
    }

    /// Pane ids affected by a change to any of `changed_slugs`.
    #[must_use]
    pub fn affected_panes(&self, changed_slugs: &[String]) -> Vec<String> {
        let changed: std::collections::HashSet<&str> =
            changed_slugs.iter().map(String::as_str).collect();
        let mut affected = std::collections::BTreeSet::new();

        for (pane_id, data) in &self.pane_belief_payloads {
            let slugs = data
                .held_beliefs
                .iter()
                .map(|(s, _)| s.as_str())
                .chain(data.withheld_beliefs.iter().map(|(s, _)| s.as_str()))
                .chain(data.match_across.iter().map(String::as_str))
                .chain(data.linked_beliefs.iter().map(String::as_str));
            if slugs.into_iter().any(|s| changed.contains(s)) {
                affected.insert(pane_id.clone());
            }
        }
        for (pane_id, slugs) in &self.pane_widget_beliefs {
            if slugs.iter().any(|s| changed.contains(s.as_str())) {
                affected.insert(pane_id.clone());
            }
        }
        affected.into_iter().collect()
    }
}

/// Last-applied verb for one held belief slug.
///
/// The raw verb string (e.g. "BELIEVES", "IDENTIFY_AS") rather than a fixed
/// enum, since the set of verbs a tenant's belief taxonomy uses isn't closed.
#[derive(Debug, Clone, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct BeliefState(pub String);

/// Cached belief state for one anonymous/known visitor.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct FingerprintState {
    pub fingerprint_id: String,
    pub held_beliefs: Vec<(String, Vec<String>)>,
    pub belief_states: Vec<(String, BeliefState)>,
    pub last_updated_unix_ms: i64,
}

/// Which rendering of a pane's HTML is cached.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub enum HtmlVariant {
    Default,
    Hidden,
    Personalized {
        held: Vec<String>,
        withheld: Vec<String>,
    },
}

/// A cached, rendered HTML fragment for one pane.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
#[rkyv(compare(PartialEq))]
pub struct HtmlFragment {
    pub pane_id: String,
    pub variant: HtmlVariant,
    pub html: String,
    /// Belief slugs this fragment depends on, for cascade invalidation.
    pub dependencies: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, index: u32, visitors: &[&str]) -> StepInfo {
        StepInfo {
            name: name.to_string(),
            step_index: index,
            visitors: visitors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn build_accepts_valid_bin() {
        let steps = vec![
            ("a".to_string(), step("A", 1, &["fp1", "fp2"])),
            ("b".to_string(), step("B", 2, &["fp1"])),
        ];
        let transitions = vec![(
            "a".to_string(),
            vec![(
                "b".to_string(),
                TransitionInfo {
                    visitors: vec!["fp1".to_string()],
                },
            )],
        )];
        let bin = HourlyEpinetBin::build("epinet-1", "2026-07-31-09", steps, transitions, 0, 900);
        assert!(bin.is_ok());
    }

    #[test]
    fn build_rejects_transition_to_missing_step() {
        let steps = vec![("a".to_string(), step("A", 1, &["fp1"]))];
        let transitions = vec![(
            "a".to_string(),
            vec![(
                "b".to_string(),
                TransitionInfo {
                    visitors: vec!["fp1".to_string()],
                },
            )],
        )];
        let bin = HourlyEpinetBin::build("epinet-1", "2026-07-31-09", steps, transitions, 0, 900);
        assert!(bin.is_err());
    }

    #[test]
    fn build_rejects_non_consecutive_transition() {
        let steps = vec![
            ("a".to_string(), step("A", 1, &["fp1"])),
            ("c".to_string(), step("C", 3, &["fp1"])),
        ];
        let transitions = vec![(
            "a".to_string(),
            vec![(
                "c".to_string(),
                TransitionInfo {
                    visitors: vec!["fp1".to_string()],
                },
            )],
        )];
        let bin = HourlyEpinetBin::build("epinet-1", "2026-07-31-09", steps, transitions, 0, 900);
        assert!(bin.is_err());
    }

    #[test]
    fn build_rejects_visitor_absent_from_endpoint() {
        let steps = vec![
            ("a".to_string(), step("A", 1, &["fp1"])),
            ("b".to_string(), step("B", 2, &["fp2"])),
        ];
        let transitions = vec![(
            "a".to_string(),
            vec![(
                "b".to_string(),
                TransitionInfo {
                    visitors: vec!["fp1".to_string()],
                },
            )],
        )];
        let bin = HourlyEpinetBin::build("epinet-1", "2026-07-31-09", steps, transitions, 0, 900);
        assert!(bin.is_err());
    }

    #[test]
    fn is_fresh_respects_ttl() {
        let bin = HourlyEpinetBin::build("epinet-1", "2026-07-31-09", vec![], vec![], 1_000, 10)
            .unwrap();
        assert!(bin.is_fresh(5_000));
        assert!(!bin.is_fresh(12_000));
    }

    #[test]
    fn registry_affected_panes_covers_held_withheld_and_widgets() {
        let registry = StoryfragmentBeliefRegistry {
            storyfragment_id: "sf1".to_string(),
            pane_belief_payloads: vec![(
                "pane1".to_string(),
                PaneBeliefData {
                    held_beliefs: vec![("GNOSIS".to_string(), vec!["*".to_string()])],
                    ..Default::default()
                },
            )],
            pane_widget_beliefs: vec![("pane2".to_string(), vec!["TOGGLE_X".to_string()])],
            all_widget_beliefs: vec!["TOGGLE_X".to_string()],
            required_beliefs: vec!["GNOSIS".to_string()],
            last_updated_unix_ms: 0,
        };

        assert_eq!(
            registry.affected_panes(&["GNOSIS".to_string()]),
            vec!["pane1".to_string()]
        );
        assert_eq!(
            registry.affected_panes(&["TOGGLE_X".to_string()]),
            vec!["pane2".to_string()]
        );
        assert!(registry.affected_panes(&["UNRELATED".to_string()]).is_empty());
    }
}
