//! The workflow engine: a registry of permission-gated states, a current
//! state pointer, business context, append-only audit history, a typed
//! event publisher, and an advisory single-writer lease.
//!
//! The engine sequences transitions atomically with respect to guard,
//! permission, history, and locking concerns. It is the sole mutator of
//! `current_state`, `context`, and `history`.

use super::history::TransitionRecord;
use super::lock::{self, LockLease};
use super::state_node::StateNode;
use crate::config::EngineConfig;
use crate::error::{HookPhase, Result, WorkflowError};
use crate::events::{EventPublisher, PublishedEvent, SubscriptionId, WorkflowEvent};
use crate::logging;
use crate::models::{OrganizationContext, User};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::broadcast;

/// A workflow type: supplies the initial state name and registers every
/// reachable state.
///
/// `Workflow::from_definition` is the only way to build an instance, so a
/// definition that registers nothing or names a missing initial state
/// fails fast at construction instead of producing an unusable workflow.
pub trait WorkflowDefinition {
    /// Name of the state the workflow enters first. Not required to have
    /// any incoming transition.
    fn initial_state(&self) -> &str;

    /// Register every reachable state. Called exactly once during
    /// construction.
    fn define_states(&self, registry: &mut StateRegistry) -> Result<()>;
}

/// Collector handed to [`WorkflowDefinition::define_states`].
#[derive(Debug, Default)]
pub struct StateRegistry {
    states: HashMap<String, StateNode>,
}

impl StateRegistry {
    /// Register a state node. Blank and duplicate names are configuration
    /// errors.
    pub fn add(&mut self, node: StateNode) -> Result<()> {
        if node.name().is_empty() {
            return Err(WorkflowError::Configuration(
                "State name must not be empty".to_string(),
            ));
        }
        if self.states.contains_key(node.name()) {
            return Err(WorkflowError::Configuration(format!(
                "Duplicate state name: {}",
                node.name()
            )));
        }
        self.states.insert(node.name().to_string(), node);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn into_nodes(self) -> Vec<StateNode> {
        self.states.into_values().collect()
    }
}

/// One action a specific user can take from the current state, suitable
/// for rendering as a menu entry. Actions a user lacks permission for are
/// omitted from the list, not flagged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDescriptor {
    pub action: String,
    pub target: String,
    pub label: String,
    pub requires_confirmation: bool,
    pub metadata: Value,
}

/// Plain-data snapshot of a workflow for persistence or display. Carries
/// no listener references and no hook closures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub id: String,
    pub initial_state: String,
    pub current_state: Option<String>,
    pub state_names: Vec<String>,
    pub context: Value,
    pub history: Vec<TransitionRecord>,
    pub lock: Option<LockLease>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact display summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub current_state: Option<String>,
    pub state_count: usize,
    pub history_len: usize,
    pub is_terminal: bool,
    pub locked_by: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A live workflow instance.
pub struct Workflow {
    id: String,
    states: HashMap<String, StateNode>,
    initial_state: String,
    current_state: Option<String>,
    context: Value,
    history: Vec<TransitionRecord>,
    lock: Option<LockLease>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    publisher: EventPublisher,
    config: EngineConfig,
}

impl Workflow {
    /// Build a fully-initialized workflow from a definition.
    ///
    /// Fails fast when the definition registers no states or names an
    /// unregistered initial state. A `None` id gets a generated UUID.
    pub async fn from_definition(
        id: Option<String>,
        definition: &dyn WorkflowDefinition,
        config: EngineConfig,
    ) -> Result<Self> {
        let mut registry = StateRegistry::default();
        definition.define_states(&mut registry)?;

        if registry.is_empty() {
            return Err(WorkflowError::Configuration(
                "Workflow definition registered no states".to_string(),
            ));
        }
        let initial_state = definition.initial_state().to_string();
        if !registry.contains(&initial_state) {
            return Err(WorkflowError::Configuration(format!(
                "Initial state '{initial_state}' is not registered"
            )));
        }

        let now = Utc::now();
        let mut workflow = Self {
            id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            states: HashMap::new(),
            initial_state,
            current_state: None,
            context: Value::Object(Map::new()),
            history: Vec::new(),
            lock: None,
            created_at: now,
            updated_at: now,
            publisher: EventPublisher::new(config.event_channel_capacity),
            config,
        };

        for node in registry.into_nodes() {
            workflow.add_state(node).await?;
        }

        Ok(workflow)
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current_state.as_deref()
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    pub fn state(&self, name: &str) -> Option<&StateNode> {
        self.states.get(name)
    }

    pub fn state_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn lock(&self) -> Option<&LockLease> {
        self.lock.as_ref()
    }

    /// Terminal iff the current state has no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        self.current_state
            .as_deref()
            .and_then(|name| self.states.get(name))
            .map(StateNode::is_terminal)
            .unwrap_or(false)
    }

    // ── State registration ───────────────────────────────────────────

    /// Register an additional state node. Emits `StateAdded`.
    pub async fn add_state(&mut self, node: StateNode) -> Result<()> {
        if node.name().is_empty() {
            return Err(WorkflowError::Configuration(
                "State name must not be empty".to_string(),
            ));
        }
        if self.states.contains_key(node.name()) {
            return Err(WorkflowError::Configuration(format!(
                "Duplicate state name: {}",
                node.name()
            )));
        }

        let name = node.name().to_string();
        self.states.insert(name.clone(), node);
        self.publisher
            .publish(WorkflowEvent::StateAdded {
                workflow_id: self.id.clone(),
                state: name,
            })
            .await;
        Ok(())
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Drive the workflow into `target`, enforcing guards and permissions.
    ///
    /// The very first transition skips the guard check (there is no prior
    /// state to validate from); every transition checks the target state's
    /// permission for the acting user. On success the exit hook of the old
    /// state and the entry hook of the new state run strictly in that
    /// order, then the history record and state pointer commit and
    /// `StateChanged` is emitted.
    ///
    /// Transactional on failure: a guard, permission, or hook failure
    /// restores the pre-call context and leaves `current_state` and
    /// `history` untouched.
    pub async fn transition_to(
        &mut self,
        target: &str,
        user: &User,
        org: &OrganizationContext,
        transition_context: Value,
    ) -> Result<TransitionRecord> {
        let target_exists = self.states.contains_key(target);
        if !target_exists {
            logging::log_error(
                "workflow",
                "transition",
                &format!("unknown target state '{target}'"),
                Some(&self.id),
            );
            return Err(WorkflowError::UnknownState(target.to_string()));
        }

        let from_state = self.current_state.clone();
        let context_snapshot = self.context.clone();

        // Merge the caller's transition context so guards and hooks see it
        merge_into(&mut self.context, &transition_context);

        let outcome = self
            .run_transition_phase(target, &from_state, user, org)
            .await;

        let action = match outcome {
            Ok(action) => action,
            Err(err) => {
                self.context = context_snapshot;
                logging::log_transition_operation(
                    &self.id,
                    from_state.as_deref(),
                    target,
                    &user.display_name(),
                    "failed",
                    Some(&err.to_string()),
                );
                return Err(err);
            }
        };

        let record = TransitionRecord::transition(
            from_state.clone(),
            target,
            user,
            transition_context,
            json!({ "workflow_id": self.id, "action": action }),
        );
        self.history.push(record.clone());
        self.current_state = Some(target.to_string());
        self.updated_at = Utc::now();

        self.publisher
            .publish(WorkflowEvent::StateChanged {
                workflow_id: self.id.clone(),
                from_state: from_state.clone(),
                to_state: target.to_string(),
                user: user.clone(),
                context: self.context.clone(),
            })
            .await;

        logging::log_transition_operation(
            &self.id,
            from_state.as_deref(),
            target,
            &user.display_name(),
            "success",
            None,
        );

        Ok(record)
    }

    /// Checks and hooks for one transition; returns the action name of the
    /// matched transition. Split out so the caller can roll back the
    /// context on any failure.
    async fn run_transition_phase(
        &mut self,
        target: &str,
        from_state: &Option<String>,
        user: &User,
        org: &OrganizationContext,
    ) -> Result<String> {
        let mut action = "initialize".to_string();

        if let Some(current_name) = from_state {
            let current = self
                .states
                .get(current_name)
                .ok_or_else(|| WorkflowError::UnknownState(current_name.clone()))?;

            if !current.can_transition_to(target, &self.context) {
                return Err(WorkflowError::InvalidTransition {
                    from: current_name.clone(),
                    to: target.to_string(),
                });
            }
            if let Some(transition) = current
                .transitions()
                .iter()
                .find(|t| t.target == target && t.guards_pass(&self.context))
            {
                action = transition.action.clone();
            }
        }

        let target_node = &self.states[target];
        if !target_node.has_permission(user, org, &self.context).await {
            return Err(WorkflowError::PermissionDenied {
                state: target.to_string(),
                user: user.display_name(),
            });
        }

        // Exit before entry, sequentially; entry hooks frequently populate
        // context fields the caller reads right after the transition.
        if let Some(current_name) = from_state {
            let node = &self.states[current_name.as_str()];
            node.execute_on_exit(&mut self.context, user, org)
                .await
                .map_err(|err| WorkflowError::Hook {
                    phase: HookPhase::Exit,
                    state: current_name.clone(),
                    message: err.to_string(),
                })?;
        }

        let node = &self.states[target];
        node.execute_on_enter(&mut self.context, user, org)
            .await
            .map_err(|err| WorkflowError::Hook {
                phase: HookPhase::Enter,
                state: target.to_string(),
                message: err.to_string(),
            })?;

        Ok(action)
    }

    /// The recommended external entry point: wraps [`transition_to`] in
    /// lease acquisition and release, so two overlapping callers cannot
    /// interleave transitions on the same instance. The lease is released
    /// even when the transition fails.
    ///
    /// [`transition_to`]: Workflow::transition_to
    pub async fn transition_with_permission_check(
        &mut self,
        target: &str,
        user: &User,
        org: &OrganizationContext,
        transition_context: Value,
    ) -> Result<TransitionRecord> {
        self.acquire_lock(user, None)?;
        let result = self
            .transition_to(target, user, org, transition_context)
            .await;
        self.release_lock();
        result
    }

    /// Actions this user can take right now: the current state's
    /// guard-passing transitions intersected with the target state's
    /// permission check. Transitions whose target is unregistered are
    /// skipped (targets are validated lazily).
    pub async fn available_actions_for_user(
        &self,
        user: &User,
        org: &OrganizationContext,
    ) -> Vec<ActionDescriptor> {
        let Some(current) = self.current_state.as_deref().and_then(|n| self.states.get(n)) else {
            return Vec::new();
        };

        let mut actions = Vec::new();
        for transition in current.available_transitions(&self.context) {
            let Some(target_node) = self.states.get(&transition.target) else {
                continue;
            };
            if target_node.has_permission(user, org, &self.context).await {
                actions.push(ActionDescriptor {
                    action: transition.action.clone(),
                    target: transition.target.clone(),
                    label: transition.label.clone(),
                    requires_confirmation: transition.requires_confirmation,
                    metadata: transition.metadata.clone(),
                });
            }
        }
        actions
    }

    /// Archive the history into a single reset marker, merge
    /// `reset_context`, and transition back into the initial state.
    /// Emits `WorkflowReset`.
    pub async fn reset(
        &mut self,
        user: &User,
        org: &OrganizationContext,
        reset_context: Value,
    ) -> Result<TransitionRecord> {
        let prior_state = self.current_state.take();
        let archived = std::mem::take(&mut self.history);

        let marker = TransitionRecord::reset_marker(
            prior_state,
            user,
            archived,
            reset_context.clone(),
            json!({ "workflow_id": self.id }),
        );
        self.history.push(marker);

        merge_into(&mut self.context, &reset_context);
        self.updated_at = Utc::now();

        self.publisher
            .publish(WorkflowEvent::WorkflowReset {
                workflow_id: self.id.clone(),
                user: user.clone(),
                reset_context: reset_context.clone(),
            })
            .await;

        let initial = self.initial_state.clone();
        self.transition_to(&initial, user, org, reset_context).await
    }

    /// Shallow-merge `partial` into the context and emit `ContextUpdated`.
    ///
    /// Trusted-caller API: this deliberately goes through neither the
    /// lease nor any permission check. Route permission-sensitive
    /// mutation through [`transition_with_permission_check`] instead.
    ///
    /// [`transition_with_permission_check`]: Workflow::transition_with_permission_check
    pub async fn update_context(&mut self, partial: Value, user: &User) -> Result<()> {
        if !partial.is_object() {
            return Err(WorkflowError::Validation(
                "Context update must be a JSON object".to_string(),
            ));
        }

        let old_context = self.context.clone();
        merge_into(&mut self.context, &partial);
        self.updated_at = Utc::now();

        self.publisher
            .publish(WorkflowEvent::ContextUpdated {
                workflow_id: self.id.clone(),
                old_context,
                new_context: self.context.clone(),
                user: user.clone(),
            })
            .await;
        Ok(())
    }

    /// Run the current state's validators. No current state means nothing
    /// to validate.
    pub async fn validate_current_state(&self) -> Vec<String> {
        match self.current_state.as_deref().and_then(|n| self.states.get(n)) {
            Some(node) => node.validate(&self.context).await,
            None => Vec::new(),
        }
    }

    // ── Locking ──────────────────────────────────────────────────────

    /// Non-blocking, single-attempt lease acquisition. `timeout_ms`
    /// defaults to the configured lock timeout.
    pub fn acquire_lock(&mut self, user: &User, timeout_ms: Option<u64>) -> Result<()> {
        let timeout = Duration::milliseconds(
            timeout_ms.unwrap_or(self.config.default_lock_timeout_ms) as i64,
        );
        let result = lock::try_acquire(&mut self.lock, user, timeout, Utc::now());

        match &result {
            Ok(()) => logging::log_lock_operation(
                &self.id,
                "acquire",
                Some(&user.display_name()),
                "acquired",
                None,
            ),
            Err(err) => logging::log_lock_operation(
                &self.id,
                "acquire",
                self.lock.as_ref().map(|l| l.owner_name.as_str()),
                "contention",
                Some(&err.to_string()),
            ),
        }
        result
    }

    /// Clear the lease unconditionally.
    pub fn release_lock(&mut self) {
        if self.lock.take().is_some() {
            logging::log_lock_operation(&self.id, "release", None, "released", None);
        }
    }

    // ── Events ───────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.publisher.subscribe()
    }

    pub fn on(
        &self,
        callback: impl Fn(&PublishedEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.publisher.on(callback)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.publisher.off(id)
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    // ── Introspection & snapshots ────────────────────────────────────

    /// States reachable from `from` by following transitions, ignoring
    /// guards. Useful for drawing progress indicators.
    pub fn reachable_states(&self, from: &str) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);

        while let Some(name) = queue.pop_front() {
            let Some(node) = self.states.get(name) else {
                continue;
            };
            for transition in node.transitions() {
                let target = transition.target.as_str();
                if self.states.contains_key(target) && seen.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        let mut reachable: Vec<String> = seen.into_iter().map(str::to_string).collect();
        reachable.sort_unstable();
        reachable
    }

    /// Plain-data snapshot; idempotent when no mutation intervenes, and
    /// never includes listeners.
    pub fn serialize(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            id: self.id.clone(),
            initial_state: self.initial_state.clone(),
            current_state: self.current_state.clone(),
            state_names: self.state_names().iter().map(|s| s.to_string()).collect(),
            context: self.context.clone(),
            history: self.history.clone(),
            lock: self.lock.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id.clone(),
            current_state: self.current_state.clone(),
            state_count: self.states.len(),
            history_len: self.history.len(),
            is_terminal: self.is_terminal(),
            locked_by: self.lock.as_ref().map(|l| l.owner_name.clone()),
            updated_at: self.updated_at,
        }
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("id", &self.id)
            .field("current_state", &self.current_state)
            .field("states", &self.state_names())
            .field("history_len", &self.history.len())
            .field("locked", &self.lock.is_some())
            .finish()
    }
}

/// Shallow merge of a JSON object into another; non-object sources are
/// ignored.
fn merge_into(target: &mut Value, source: &Value) {
    if let (Value::Object(target_map), Value::Object(source_map)) = (target, source) {
        for (key, value) in source_map {
            target_map.insert(key.clone(), value.clone());
        }
    }
}
