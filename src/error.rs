//! Structured error handling for the workflow engine.
//!
//! Every failure the engine can surface maps onto one variant of
//! [`WorkflowError`]. Structural errors (bad configuration, bad transition,
//! bad permission) are always returned synchronously to the initiating
//! caller; the engine never retries on its own.

use thiserror::Error;

/// Errors surfaced by workflow construction and transitions.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Setup-time failure: empty definitions, duplicate or blank state
    /// names, unparseable configuration. Intended for developers, not
    /// runtime recovery.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested target state is not registered on this workflow.
    #[error("Unknown state: {0}")]
    UnknownState(String),

    /// No guard-passing transition exists from the current state to the
    /// requested target. The workflow is left unchanged.
    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    /// The user may not act in the target state. The message deliberately
    /// names only the state, not which actor or condition failed.
    #[error("User '{user}' is not permitted to act in state '{state}'")]
    PermissionDenied { state: String, user: String },

    /// Another user holds the workflow lease. Recoverable by retrying
    /// after the reported remaining wait, or moot once the lease expires.
    #[error("Workflow is locked by '{owner}', retry in {remaining_ms}ms")]
    LockContention { owner: String, remaining_ms: i64 },

    /// Context or state validation failure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An entry or exit hook failed mid-transition. The transition is
    /// rolled back before this is returned.
    #[error("{phase} hook failed in state '{state}': {message}")]
    Hook {
        phase: HookPhase,
        state: String,
        message: String,
    },
}

/// Which side of a transition a failing hook belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Enter,
    Exit,
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enter => write!(f, "entry"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WorkflowError::InvalidTransition {
            from: "draft".to_string(),
            to: "done".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid transition from 'draft' to 'done'");

        let err = WorkflowError::LockContention {
            owner: "alice".to_string(),
            remaining_ms: 1500,
        };
        assert!(err.to_string().contains("1500ms"));
    }

    #[test]
    fn test_permission_error_names_only_the_state() {
        let err = WorkflowError::PermissionDenied {
            state: "review".to_string(),
            user: "bob".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("review"));
        assert!(!msg.contains("actor"));
        assert!(!msg.contains("condition"));
    }
}
