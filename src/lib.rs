#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # stategate
//!
//! A generic, reusable finite-state-machine engine for business workflows:
//! declare a process ("create a branch", "approve an expense", "hire a
//! candidate") as a graph of named states, each gated by role/attribute
//! permissions and guarded transitions, with automatic audit history,
//! context mutation, and single-writer advisory locking.
//!
//! ## Architecture
//!
//! Two collaborating components form the core:
//!
//! - [`StateNode`] holds one state: outgoing transitions, guard predicates,
//!   permission rules, entry/exit hooks, and validators.
//! - [`Workflow`] is the engine: state registry, current-state pointer,
//!   business context, append-only history, typed event publishing, and
//!   lease-based locking. Built from a [`WorkflowDefinition`], never
//!   partially initialized.
//!
//! Concrete business workflows are clients of this engine: they implement
//! `WorkflowDefinition`, register a fixed set of `StateNode`s, and supply
//! permission and guard rules. The engine accepts already-resolved user
//! and organization data from its caller; it performs no authentication
//! and owns no persistence or transport.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - StateNode, Workflow, history, and lock lease
//! - [`conditions`] - declarative guard condition language
//! - [`models`] - User, OrganizationContext, and actor inference
//! - [`events`] - typed lifecycle event publishing
//! - [`config`] - engine configuration
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging bootstrap and helpers
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use stategate::{
//!     Actor, Condition, EngineConfig, OrganizationContext, Position, Result, StateNode,
//!     StateRegistry, Transition, User, Workflow, WorkflowDefinition,
//! };
//!
//! struct DocumentApproval;
//!
//! impl WorkflowDefinition for DocumentApproval {
//!     fn initial_state(&self) -> &str {
//!         "draft"
//!     }
//!
//!     fn define_states(&self, registry: &mut StateRegistry) -> Result<()> {
//!         registry.add(
//!             StateNode::builder("draft")
//!                 .transition(Transition::new("review", "submit", "Submit for review"))
//!                 .build(),
//!         )?;
//!         registry.add(
//!             StateNode::builder("review")
//!                 .transition(
//!                     Transition::new("done", "approve", "Approve")
//!                         .with_guard(Condition::truthy("approval_comments")),
//!                 )
//!                 .transition(Transition::new("draft", "reject", "Request changes"))
//!                 .build(),
//!         )?;
//!         registry.add(
//!             StateNode::builder("done")
//!                 .require_actor(Actor::Approver)
//!                 .build(),
//!         )
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let mut workflow =
//!     Workflow::from_definition(None, &DocumentApproval, EngineConfig::default()).await?;
//!
//! let author = User::new("u1", "sana");
//! let org = OrganizationContext::new("org-1").with_position(Position::new("Teller"));
//!
//! workflow
//!     .transition_with_permission_check("draft", &author, &org, json!({}))
//!     .await?;
//! workflow
//!     .transition_with_permission_check("review", &author, &org, json!({}))
//!     .await?;
//! assert_eq!(workflow.current_state(), Some("review"));
//! # Ok::<(), stategate::WorkflowError>(())
//! # }).unwrap();
//! ```

pub mod conditions;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod state_machine;

pub use conditions::{Condition, ComparisonOperator};
pub use config::EngineConfig;
pub use error::{HookPhase, Result, WorkflowError};
pub use events::{EventPublisher, PublishedEvent, SubscriptionId, WorkflowEvent};
pub use models::{Actor, Designation, Group, OrganizationContext, Position, User};
pub use state_machine::{
    ActionDescriptor, CustomCondition, FnHook, Guard, GuardFn, LockLease, PermissionConditions,
    Requirement, StateHook, StateNode, StateNodeBuilder, StateRegistry, StateValidator, Transition,
    TransitionRecord, Workflow, WorkflowDefinition, WorkflowSnapshot, WorkflowSummary,
};
