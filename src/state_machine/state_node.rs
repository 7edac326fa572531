//! A single workflow state: outgoing transitions, guard predicates,
//! permission rules, entry/exit hooks, and validators.
//!
//! Nodes are immutable once built and hold no reference back to their
//! owning workflow, so they can be shared freely without synchronization.

use crate::conditions::Condition;
use crate::error::Result;
use crate::models::{Actor, OrganizationContext, User};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A plain predicate guard over the workflow context.
pub type GuardFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A transition guard: either a Rust predicate or a declarative condition.
#[derive(Clone)]
pub enum Guard {
    Predicate(GuardFn),
    Condition(Condition),
}

impl Guard {
    pub fn predicate(f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    pub fn passes(&self, context: &Value) -> bool {
        match self {
            Self::Predicate(f) => f(context),
            Self::Condition(condition) => condition.evaluate(context),
        }
    }
}

impl From<Condition> for Guard {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Predicate(_) => write!(f, "Guard::Predicate(..)"),
            Self::Condition(c) => write!(f, "Guard::Condition({c:?})"),
        }
    }
}

/// An outgoing edge from a state.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Name of the target state. Validated lazily at transition time, not
    /// at registration.
    pub target: String,
    /// Action identifier, unique within one state's transition list.
    pub action: String,
    /// Human-readable label for action menus.
    pub label: String,
    pub guards: Vec<Guard>,
    pub requires_confirmation: bool,
    pub metadata: Value,
}

impl Transition {
    pub fn new(
        target: impl Into<String>,
        action: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            action: action.into(),
            label: label.into(),
            guards: Vec::new(),
            requires_confirmation: false,
            metadata: Value::Null,
        }
    }

    pub fn with_guard(mut self, guard: impl Into<Guard>) -> Self {
        self.guards.push(guard.into());
        self
    }

    pub fn with_confirmation(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// True iff every guard passes against the given context.
    pub fn guards_pass(&self, context: &Value) -> bool {
        self.guards.iter().all(|guard| guard.passes(context))
    }
}

/// Requirement on a permission fact: a single value or any of several.
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    One(String),
    AnyOf(Vec<String>),
}

impl Requirement {
    pub fn matches_any<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> bool {
        let mut values = values.into_iter();
        match self {
            Self::One(expected) => values.any(|v| v.eq_ignore_ascii_case(expected)),
            Self::AnyOf(options) => {
                values.any(|v| options.iter().any(|o| v.eq_ignore_ascii_case(o)))
            }
        }
    }
}

impl From<&str> for Requirement {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<&str>> for Requirement {
    fn from(values: Vec<&str>) -> Self {
        Self::AnyOf(values.into_iter().map(str::to_string).collect())
    }
}

/// Escape-hatch permission predicate for rules no generic tag expresses.
#[async_trait]
pub trait CustomCondition: Send + Sync {
    async fn check(&self, user: &User, org: &OrganizationContext, context: &Value) -> bool;

    /// Description for logging.
    fn description(&self) -> &'static str {
        "custom permission condition"
    }
}

/// Side-effecting hook run on state entry or exit. Hooks may mutate the
/// workflow context (assigning generated ids, timestamps) and may suspend
/// on external calls.
#[async_trait]
pub trait StateHook: Send + Sync {
    async fn run(
        &self,
        context: &mut Value,
        user: &User,
        org: &OrganizationContext,
    ) -> Result<()>;

    /// Description for logging.
    fn description(&self) -> &'static str {
        "state hook"
    }
}

type HookFn = dyn Fn(&mut Value, &User, &OrganizationContext) -> Result<()> + Send + Sync;

/// Closure adapter for [`StateHook`], for hooks that edit the context
/// without suspending. Hooks that call out to external services implement
/// [`StateHook`] directly.
pub struct FnHook {
    description: &'static str,
    f: Box<HookFn>,
}

impl FnHook {
    pub fn new(
        description: &'static str,
        f: impl Fn(&mut Value, &User, &OrganizationContext) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            description,
            f: Box::new(f),
        }
    }
}

#[async_trait]
impl StateHook for FnHook {
    async fn run(&self, context: &mut Value, user: &User, org: &OrganizationContext) -> Result<()> {
        (self.f)(context, user, org)
    }

    fn description(&self) -> &'static str {
        self.description
    }
}

/// Async predicate over the workflow context; `Some(message)` is a
/// human-readable failure.
#[async_trait]
pub trait StateValidator: Send + Sync {
    async fn validate(&self, context: &Value) -> Option<String>;

    fn description(&self) -> &'static str {
        "state validator"
    }
}

/// Conjunctive permission rules a user must satisfy to act in a state,
/// evaluated after the actor gate.
#[derive(Clone, Default)]
pub struct PermissionConditions {
    pub department: Option<Requirement>,
    pub team: Option<Requirement>,
    pub designation: Option<Requirement>,
    pub custom: Vec<Arc<dyn CustomCondition>>,
}

impl PermissionConditions {
    fn is_empty(&self) -> bool {
        self.department.is_none()
            && self.team.is_none()
            && self.designation.is_none()
            && self.custom.is_empty()
    }
}

impl fmt::Debug for PermissionConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionConditions")
            .field("department", &self.department)
            .field("team", &self.team)
            .field("designation", &self.designation)
            .field("custom", &self.custom.len())
            .finish()
    }
}

/// One state in a workflow's registry.
pub struct StateNode {
    name: String,
    transitions: Vec<Transition>,
    required_actors: HashSet<Actor>,
    permission_conditions: PermissionConditions,
    on_enter: Option<Arc<dyn StateHook>>,
    on_exit: Option<Arc<dyn StateHook>>,
    validations: Vec<Arc<dyn StateValidator>>,
}

impl StateNode {
    pub fn builder(name: impl Into<String>) -> StateNodeBuilder {
        StateNodeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// A state with no outgoing transitions is terminal.
    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }

    /// True iff some registered transition targets `target` and all of its
    /// guards evaluate true against the context.
    pub fn can_transition_to(&self, target: &str, context: &Value) -> bool {
        self.transitions
            .iter()
            .any(|t| t.target == target && t.guards_pass(context))
    }

    /// All transitions whose guards currently pass; the basis for
    /// user-visible action menus.
    pub fn available_transitions(&self, context: &Value) -> Vec<&Transition> {
        self.transitions
            .iter()
            .filter(|t| t.guards_pass(context))
            .collect()
    }

    /// Whether a user may act while the workflow is in this state: actor
    /// gate first, then every permission condition.
    pub async fn has_permission(
        &self,
        user: &User,
        org: &OrganizationContext,
        context: &Value,
    ) -> bool {
        if !self.required_actors.is_empty() {
            let held = org.actors();
            if self.required_actors.is_disjoint(&held) {
                tracing::debug!(
                    state = %self.name,
                    user = %user.display_name(),
                    "Actor gate rejected user"
                );
                return false;
            }
        }

        if self.permission_conditions.is_empty() {
            return true;
        }

        if let Some(requirement) = &self.permission_conditions.department {
            if !requirement.matches_any(org.departments()) {
                return false;
            }
        }
        if let Some(requirement) = &self.permission_conditions.team {
            if !requirement.matches_any(org.teams()) {
                return false;
            }
        }
        if let Some(requirement) = &self.permission_conditions.designation {
            if !requirement.matches_any(org.designation_names()) {
                return false;
            }
        }
        for condition in &self.permission_conditions.custom {
            if !condition.check(user, org, context).await {
                tracing::debug!(
                    state = %self.name,
                    condition = condition.description(),
                    "Custom permission condition rejected user"
                );
                return false;
            }
        }

        true
    }

    /// Run the entry hook if one is registered.
    pub async fn execute_on_enter(
        &self,
        context: &mut Value,
        user: &User,
        org: &OrganizationContext,
    ) -> Result<()> {
        if let Some(hook) = &self.on_enter {
            tracing::debug!(state = %self.name, hook = hook.description(), "Running entry hook");
            hook.run(context, user, org).await?;
        }
        Ok(())
    }

    /// Run the exit hook if one is registered.
    pub async fn execute_on_exit(
        &self,
        context: &mut Value,
        user: &User,
        org: &OrganizationContext,
    ) -> Result<()> {
        if let Some(hook) = &self.on_exit {
            tracing::debug!(state = %self.name, hook = hook.description(), "Running exit hook");
            hook.run(context, user, org).await?;
        }
        Ok(())
    }

    /// Run all validators, collecting failure messages in registration
    /// order. Empty means valid. Validators are read-only over the
    /// context, so they run concurrently.
    pub async fn validate(&self, context: &Value) -> Vec<String> {
        let checks = self.validations.iter().map(|v| v.validate(context));
        join_all(checks).await.into_iter().flatten().collect()
    }
}

impl fmt::Debug for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("name", &self.name)
            .field("transitions", &self.transitions)
            .field("required_actors", &self.required_actors)
            .field("permission_conditions", &self.permission_conditions)
            .field("has_on_enter", &self.on_enter.is_some())
            .field("has_on_exit", &self.on_exit.is_some())
            .field("validations", &self.validations.len())
            .finish()
    }
}

/// Fluent builder for [`StateNode`].
pub struct StateNodeBuilder {
    node: StateNode,
}

impl StateNodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: StateNode {
                name: name.into(),
                transitions: Vec::new(),
                required_actors: HashSet::new(),
                permission_conditions: PermissionConditions::default(),
                on_enter: None,
                on_exit: None,
                validations: Vec::new(),
            },
        }
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.node.transitions.push(transition);
        self
    }

    pub fn require_actor(mut self, actor: Actor) -> Self {
        self.node.required_actors.insert(actor);
        self
    }

    pub fn require_department(mut self, requirement: impl Into<Requirement>) -> Self {
        self.node.permission_conditions.department = Some(requirement.into());
        self
    }

    pub fn require_team(mut self, requirement: impl Into<Requirement>) -> Self {
        self.node.permission_conditions.team = Some(requirement.into());
        self
    }

    pub fn require_designation(mut self, requirement: impl Into<Requirement>) -> Self {
        self.node.permission_conditions.designation = Some(requirement.into());
        self
    }

    pub fn custom_condition(mut self, condition: impl CustomCondition + 'static) -> Self {
        self.node
            .permission_conditions
            .custom
            .push(Arc::new(condition));
        self
    }

    pub fn on_enter(mut self, hook: impl StateHook + 'static) -> Self {
        self.node.on_enter = Some(Arc::new(hook));
        self
    }

    pub fn on_exit(mut self, hook: impl StateHook + 'static) -> Self {
        self.node.on_exit = Some(Arc::new(hook));
        self
    }

    pub fn validator(mut self, validator: impl StateValidator + 'static) -> Self {
        self.node.validations.push(Arc::new(validator));
        self
    }

    pub fn build(self) -> StateNode {
        self.node
    }
}
