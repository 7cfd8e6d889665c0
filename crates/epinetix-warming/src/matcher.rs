//! `eventMatchesStep` and node-id construction.

use epinetix_cache::GateType;
use epinetix_events::{ActionEvent, BeliefEvent};

use crate::types::EpinetStep;

/// Label used as the first `node_id` component for each gate type.
#[must_use]
pub fn gate_type_label(gate_type: GateType) -> &'static str {
    match gate_type {
        GateType::Belief => "belief",
        GateType::IdentifyAs => "identifyAs",
        GateType::CommitmentAction => "commitmentAction",
        GateType::ConversionAction => "conversionAction",
    }
}

/// Whether `event` matches `step`, and if so, the value that matched.
///
/// Action gates: verb in `step.values`, object type matches if constrained,
/// and object id matches if constrained.
#[must_use]
pub fn action_event_matches_step<'a>(event: &'a ActionEvent, step: &EpinetStep) -> Option<&'a str> {
    if !matches!(step.gate_type, GateType::CommitmentAction | GateType::ConversionAction) {
        return None;
    }
    if !step.values.contains(&event.verb) {
        return None;
    }
    if let Some(object_type) = &step.object_type {
        if object_type != &event.object_type {
            return None;
        }
    }
    if !step.object_ids.is_empty() && !step.object_ids.contains(&event.object_id) {
        return None;
    }
    Some(&event.verb)
}

/// Belief/identifyAs gates: the event's verb or object is in `step.values`.
#[must_use]
pub fn belief_event_matches_step<'a>(event: &'a BeliefEvent, step: &EpinetStep) -> Option<&'a str> {
    if !matches!(step.gate_type, GateType::Belief | GateType::IdentifyAs) {
        return None;
    }
    if step.values.contains(&event.verb) {
        return Some(&event.verb);
    }
    if let Some(object) = &event.object {
        if step.values.contains(object) {
            return Some(object);
        }
    }
    None
}

/// `nodeId = join('_', gateType, discriminator, [matchedValue], [contentId])`.
///
/// `discriminator` is the step's 1-based index: the only field in
/// [`EpinetStep`] guaranteed to distinguish two steps that share a gate type
/// and matching values.
#[must_use]
pub fn node_id(
    gate_type: GateType,
    discriminator: u32,
    matched_value: Option<&str>,
    content_id: Option<&str>,
) -> String {
    let mut parts = vec![gate_type_label(gate_type).to_string(), discriminator.to_string()];
    if let Some(value) = matched_value {
        parts.push(value.to_string());
    }
    if let Some(content_id) = content_id {
        parts.push(content_id.to_string());
    }
    parts.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn action_event(verb: &str, object_type: &str, object_id: &str) -> ActionEvent {
        ActionEvent {
            object_id: object_id.to_string(),
            object_type: object_type.to_string(),
            verb: verb.to_string(),
            fingerprint_id: "fp1".to_string(),
            created_at: Utc::now(),
        }
    }

    fn belief_event(verb: &str, object: Option<&str>) -> BeliefEvent {
        BeliefEvent {
            slug: "GNOSIS".to_string(),
            fingerprint_id: "fp1".to_string(),
            verb: verb.to_string(),
            object: object.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn action_gate_matches_verb_and_object_type() {
        let step = EpinetStep {
            gate_type: GateType::CommitmentAction,
            values: BTreeSet::from(["CLICKED".to_string()]),
            object_type: Some("Pane".to_string()),
            object_ids: BTreeSet::new(),
        };
        let event = action_event("CLICKED", "Pane", "pane1");
        assert_eq!(action_event_matches_step(&event, &step), Some("CLICKED"));

        let wrong_type = action_event("CLICKED", "StoryFragment", "sf1");
        assert_eq!(action_event_matches_step(&wrong_type, &step), None);
    }

    #[test]
    fn action_gate_respects_object_id_constraint() {
        let step = EpinetStep {
            gate_type: GateType::CommitmentAction,
            values: BTreeSet::from(["CLICKED".to_string()]),
            object_type: None,
            object_ids: BTreeSet::from(["pane1".to_string()]),
        };
        assert!(action_event_matches_step(&action_event("CLICKED", "Pane", "pane1"), &step).is_some());
        assert!(action_event_matches_step(&action_event("CLICKED", "Pane", "pane2"), &step).is_none());
    }

    #[test]
    fn belief_gate_matches_verb_or_object() {
        let step = EpinetStep {
            gate_type: GateType::Belief,
            values: BTreeSet::from(["YES".to_string()]),
            object_type: None,
            object_ids: BTreeSet::new(),
        };
        assert_eq!(
            belief_event_matches_step(&belief_event("BELIEVES", Some("YES")), &step),
            Some("YES")
        );
        assert_eq!(belief_event_matches_step(&belief_event("BELIEVES", Some("NO")), &step), None);
    }

    #[test]
    fn node_id_joins_with_underscore() {
        assert_eq!(
            node_id(GateType::CommitmentAction, 2, Some("CLICKED"), Some("pane1")),
            "commitmentAction_2_CLICKED_pane1"
        );
        assert_eq!(node_id(GateType::Belief, 1, Some("YES"), None), "belief_1_YES");
    }
}
