// State machine module: the workflow engine core.
//
// StateNode encapsulates everything needed to decide whether a transition
// out of a state is legal and whether a given user may act in it; Workflow
// owns the state registry, context, history, lease, and event publisher,
// and is the sole mutator of them.

pub mod history;
pub mod lock;
pub mod state_node;
pub mod workflow;

// Re-export main types for convenient access
pub use history::TransitionRecord;
pub use lock::LockLease;
pub use state_node::{
    CustomCondition, FnHook, Guard, GuardFn, PermissionConditions, Requirement, StateHook,
    StateNode, StateNodeBuilder, StateValidator, Transition,
};
pub use workflow::{
    ActionDescriptor, StateRegistry, Workflow, WorkflowDefinition, WorkflowSnapshot,
    WorkflowSummary,
};
