use crate::constants::system;
use crate::models::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One immutable audit entry capturing a realized state transition.
///
/// The history a workflow carries is append-only: successful transitions
/// push exactly one record, and a reset archives the prior records inside
/// a marker record instead of discarding them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from_state: Option<String>,
    pub to_state: String,
    pub timestamp: DateTime<Utc>,
    /// Resolved display name of the acting user.
    pub user: String,
    pub user_id: String,
    /// Shallow copy of the transition context supplied by the caller.
    pub context: Value,
    /// Workflow-level metadata (instance id, action name).
    pub metadata: Value,
    /// Present only on reset markers: the full history that preceded the
    /// reset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_history: Option<Vec<TransitionRecord>>,
}

impl TransitionRecord {
    /// Record for a realized transition.
    pub fn transition(
        from_state: Option<String>,
        to_state: impl Into<String>,
        user: &User,
        context: Value,
        metadata: Value,
    ) -> Self {
        Self {
            from_state,
            to_state: to_state.into(),
            timestamp: Utc::now(),
            user: user.display_name(),
            user_id: user.id.clone(),
            context,
            metadata,
            previous_history: None,
        }
    }

    /// Archival marker inserted by a reset, embedding the entire prior
    /// history.
    pub fn reset_marker(
        from_state: Option<String>,
        user: &User,
        previous_history: Vec<TransitionRecord>,
        reset_context: Value,
        metadata: Value,
    ) -> Self {
        Self {
            from_state,
            to_state: system::RESET_MARKER_STATE.to_string(),
            timestamp: Utc::now(),
            user: user.display_name(),
            user_id: user.id.clone(),
            context: reset_context,
            metadata,
            previous_history: Some(previous_history),
        }
    }

    pub fn is_reset_marker(&self) -> bool {
        self.previous_history.is_some()
    }
}
