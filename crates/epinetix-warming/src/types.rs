//! Epinet funnel configuration and the precomputed filter sets derived from it.

use std::collections::BTreeSet;

use epinetix_cache::GateType;

/// One step (gate) in a funnel, in 1-based `step_index` order within
/// [`EpinetConfig::steps`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpinetStep {
    pub gate_type: GateType,
    /// Matching values: action verbs for action gates, verbs or belief
    /// objects for belief/identifyAs gates.
    pub values: BTreeSet<String>,
    pub object_type: Option<String>,
    pub object_ids: BTreeSet<String>,
}

/// An ordered funnel definition for one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpinetConfig {
    pub epinet_id: String,
    pub title: String,
    pub steps: Vec<EpinetStep>,
}

impl EpinetConfig {
    /// 1-based step index, or `None` if `step` isn't part of this config
    /// (compared by identity of position, since two steps may share values).
    #[must_use]
    pub fn step_index(&self, step: &EpinetStep) -> Option<u32> {
        self.steps
            .iter()
            .position(|s| std::ptr::eq(s, step))
            .map(|i| u32::try_from(i + 1).unwrap_or(u32::MAX))
    }
}

/// Precomputed `IN`-clause filter sets for one epinet, built once per warm
/// pass rather than per event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpinetAnalysis {
    pub belief_values: BTreeSet<String>,
    pub identify_as_values: BTreeSet<String>,
    pub action_verbs: BTreeSet<String>,
    pub action_object_ids: BTreeSet<String>,
}

impl EpinetAnalysis {
    #[must_use]
    pub fn analyze(config: &EpinetConfig) -> Self {
        let mut analysis = Self::default();
        for step in &config.steps {
            match step.gate_type {
                GateType::Belief => analysis.belief_values.extend(step.values.iter().cloned()),
                GateType::IdentifyAs => analysis
                    .identify_as_values
                    .extend(step.values.iter().cloned()),
                GateType::CommitmentAction | GateType::ConversionAction => {
                    analysis.action_verbs.extend(step.values.iter().cloned());
                    analysis
                        .action_object_ids
                        .extend(step.object_ids.iter().cloned());
                }
            }
        }
        analysis
    }
}
