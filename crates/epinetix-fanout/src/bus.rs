//! Publishes belief-broadcast targets over an embedded Zenoh session.

use epinetix_beliefs::BroadcastTarget;
use serde::{Deserialize, Serialize};

use crate::error::FanoutError;
use crate::key_expr::belief_broadcast_key;

/// Wire shape of one [`BroadcastTarget`] published to observers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BeliefChangeMessage {
    pub storyfragment_id: String,
    pub affected_panes: Vec<String>,
}

impl From<&BroadcastTarget> for BeliefChangeMessage {
    fn from(target: &BroadcastTarget) -> Self {
        Self {
            storyfragment_id: target.storyfragment_id.clone(),
            affected_panes: target.affected_panes.clone(),
        }
    }
}

/// Open an embedded Zenoh session (no external router required).
///
/// # Errors
///
/// Returns [`FanoutError`] if the session cannot be opened.
pub async fn open_embedded_session() -> Result<zenoh::Session, FanoutError> {
    zenoh::open(zenoh::Config::default())
        .await
        .map_err(|e| FanoutError::event_bus(e.to_string()))
}

/// Publishes belief-change broadcasts for observers to pick up as SSE/WS
/// fan-out, and tracks which storyfragments currently have live observers.
pub struct SessionFanout {
    session: zenoh::Session,
}

impl SessionFanout {
    #[must_use]
    pub fn new(session: zenoh::Session) -> Self {
        Self { session }
    }

    /// Publish one broadcast target under its tenant/storyfragment key.
    ///
    /// Best-effort: a belief broadcast never fails the originating mutation,
    /// so callers should log a publish failure rather than propagate it.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError`] if serialization or the Zenoh put fails.
    pub async fn publish_broadcast(
        &self,
        tenant_id: &str,
        target: &BroadcastTarget,
    ) -> Result<(), FanoutError> {
        let message = BeliefChangeMessage::from(target);
        let payload = serde_json::to_vec(&message)?;
        let key = belief_broadcast_key(tenant_id, &target.storyfragment_id);
        self.session
            .put(key, payload)
            .await
            .map_err(|e| FanoutError::event_bus(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn belief_change_message_copies_broadcast_target_fields() {
        let target = BroadcastTarget {
            storyfragment_id: "sf1".to_string(),
            affected_panes: vec!["pane1".to_string(), "pane2".to_string()],
        };
        let message = BeliefChangeMessage::from(&target);
        assert_eq!(message.storyfragment_id, "sf1");
        assert_eq!(message.affected_panes, vec!["pane1".to_string(), "pane2".to_string()]);
    }

    #[test]
    fn belief_change_message_round_trips_through_json() {
        let message = BeliefChangeMessage {
            storyfragment_id: "sf1".to_string(),
            affected_panes: vec!["pane1".to_string()],
        };
        let json = serde_json::to_string(&message).unwrap();
        let decoded: BeliefChangeMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, message);
    }
}
