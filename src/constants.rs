//! System-wide constants: lock defaults, event channel sizing, and the
//! designation keyword tables that drive actor inference.

/// Engine defaults.
pub mod system {
    /// Default advisory lock lease length when the caller supplies none.
    pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

    /// Default broadcast channel capacity for the event publisher.
    pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1_000;

    /// `to_state` recorded on the archival marker a reset inserts.
    pub const RESET_MARKER_STATE: &str = "workflow_reset";
}

/// Canonical event type names, used for logging and as the serde tags on
/// [`crate::events::WorkflowEvent`].
pub mod events {
    pub const STATE_ADDED: &str = "state_added";
    pub const STATE_CHANGED: &str = "state_changed";
    pub const CONTEXT_UPDATED: &str = "context_updated";
    pub const WORKFLOW_RESET: &str = "workflow_reset";
}

/// Keyword tables mapping organizational designation text onto abstract
/// actor tags. Matching is case-insensitive substring containment, so
/// "Engineering Manager" grants both Approver and Implementor.
pub mod designations {
    pub const APPROVER_KEYWORDS: &[&str] = &["manager", "director", "head"];
    pub const ANALYZER_KEYWORDS: &[&str] = &["analyst", "reviewer"];
    pub const IMPLEMENTOR_KEYWORDS: &[&str] = &["engineer", "developer", "implementor"];
}
