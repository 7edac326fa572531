//! Shared fixtures: a small document-approval workflow and the users that
//! drive it.

use stategate::{
    Actor, Condition, EngineConfig, OrganizationContext, Position, Result, StateNode,
    StateRegistry, Transition, User, Workflow, WorkflowDefinition,
};

/// draft --(submit)--> review --(approve)--> done, with a review -> draft
/// rejection cycle. Approval is guarded on `approval_comments` being set
/// and the `done` state requires an Approver-like actor.
pub struct DocumentApproval;

impl WorkflowDefinition for DocumentApproval {
    fn initial_state(&self) -> &str {
        "draft"
    }

    fn define_states(&self, registry: &mut StateRegistry) -> Result<()> {
        registry.add(
            StateNode::builder("draft")
                .transition(Transition::new("review", "submit", "Submit for review"))
                .build(),
        )?;
        registry.add(
            StateNode::builder("review")
                .transition(
                    Transition::new("done", "approve", "Approve")
                        .with_guard(Condition::truthy("approval_comments"))
                        .with_confirmation(),
                )
                .transition(Transition::new("draft", "reject", "Request changes"))
                .build(),
        )?;
        registry.add(
            StateNode::builder("done")
                .require_actor(Actor::Approver)
                .build(),
        )
    }
}

pub async fn document_workflow() -> Workflow {
    Workflow::from_definition(
        Some("doc-wf-1".to_string()),
        &DocumentApproval,
        EngineConfig::default(),
    )
    .await
    .expect("fixture definition is valid")
}

pub fn requestor() -> (User, OrganizationContext) {
    (
        User::new("u-req", "sana").with_name("Sana", "Iqbal"),
        OrganizationContext::new("org-1").with_position(Position::new("Teller")),
    )
}

pub fn manager() -> (User, OrganizationContext) {
    (
        User::new("u-mgr", "adeel").with_name("Adeel", "Khan"),
        OrganizationContext::new("org-1").with_position(Position::new("Branch Manager")),
    )
}
