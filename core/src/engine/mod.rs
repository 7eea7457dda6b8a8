//! The dispatch engine.
//!
//! Owns the parameter store, the add-on and action catalogs, the handler
//! registry and all runtime gating state (cooldowns, unlocks, the pending
//! queue and the recursion guard). Hosts build one with [`Engine::builder`],
//! raise events and trigger actions on it, and drain its output and
//! diagnostics between frames.

mod clock;
mod dispatch;
mod queue;


pub use clock::{Clock, ManualClock, MonotonicClock};
pub use queue::{PendingAction, PendingQueue};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use loopmod_types::{EngineConfig, ParameterValue};

use crate::definitions::{ActionCatalog, ActionDefinition, DefinitionCatalog, normalize_id};
use crate::diagnostics::{Diagnostic, DiagnosticEntry, DiagnosticLog, HandlerError};
use crate::handlers::builtin_handlers;
use crate::loader::{self, ModSnapshot};
use crate::params::{ParameterDiff, ParameterStore};
use crate::registry::{ActionRegistry, DispatchContext, Handler};
use crate::source::ModFolders;

/// What a reload changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub parameters: ParameterDiff,
    pub addons: usize,
    pub actions: usize,
    /// Normalized ids that disappeared, their unlocks purged
    pub removed_actions: Vec<String>,
    pub issues: usize,
}

pub struct Engine {
    config: EngineConfig,
    folders: ModFolders,
    clock: Arc<dyn Clock>,
    registry: Arc<ActionRegistry<Engine>>,

    parameters: ParameterStore,
    catalog: DefinitionCatalog,

    /// Normalized id -> clock reading before which triggers are refused
    cooldowns: HashMap<String, Duration>,
    unlocked: HashSet<String>,
    pending: PendingQueue,
    executing: HashSet<String>,
    /// Events being raised, outermost first
    event_chain: Vec<String>,
    draining: bool,

    diagnostics: DiagnosticLog,
    output: Vec<String>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unlock state
    // ─────────────────────────────────────────────────────────────────────────

    pub fn unlock_action(&mut self, action_id: &str) {
        let key = normalize_id(action_id);
        if key.is_empty() {
            return;
        }
        if self.unlocked.insert(key) {
            tracing::info!(action_id, "Action unlocked");
        }
    }

    pub fn lock_action(&mut self, action_id: &str) {
        let key = normalize_id(action_id);
        if key.is_empty() {
            return;
        }
        if self.unlocked.remove(&key) {
            tracing::info!(action_id, "Action locked");
        }
    }

    pub fn is_unlocked(&self, action_id: &str) -> bool {
        self.unlocked.contains(&normalize_id(action_id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reload
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-read parameters, add-ons and actions.
    ///
    /// Parameters absent from the new snapshot are removed. Pending entries
    /// keep the definitions they were accepted against.
    pub fn reload_folders(&mut self) -> ReloadReport {
        let ModSnapshot {
            parameters,
            catalog,
            issues,
        } = ModSnapshot::load(&self.folders);

        let issue_count = issues.len();
        self.diagnostics.extend(issues);

        let parameter_diff = self.parameters.replace_with(parameters);
        if !parameter_diff.removed.is_empty() {
            tracing::info!(removed = ?parameter_diff.removed, "Removed stale parameters");
        }
        self.catalog.addons = catalog.addons;
        let removed_actions = self.swap_actions(catalog.actions);

        ReloadReport {
            parameters: parameter_diff,
            addons: self.catalog.addons.len(),
            actions: self.catalog.actions.len(),
            removed_actions,
            issues: issue_count,
        }
    }

    /// Re-read only the action folder.
    pub fn reload_definitions(&mut self) -> ReloadReport {
        let (actions, issues) = loader::load_actions(self.folders.actions.as_ref());
        let issue_count = issues.len();
        self.diagnostics.extend(issues);

        let removed_actions = self.swap_actions(actions);
        ReloadReport {
            parameters: ParameterDiff::default(),
            addons: self.catalog.addons.len(),
            actions: self.catalog.actions.len(),
            removed_actions,
            issues: issue_count,
        }
    }

    fn swap_actions(&mut self, actions: ActionCatalog) -> Vec<String> {
        let mut removed: Vec<String> = self
            .catalog
            .actions
            .keys()
            .filter(|key| !actions.contains(key))
            .map(str::to_string)
            .collect();
        removed.sort();

        self.unlocked.retain(|key| actions.contains(key));
        self.catalog.actions = actions;

        tracing::info!(
            actions = self.catalog.actions.len(),
            removed = removed.len(),
            "Action definitions loaded"
        );
        removed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Handlers
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a handler after construction. First registration wins.
    pub fn register_handler<F>(&mut self, name: &str, handler: F) -> Result<(), Diagnostic>
    where
        F: Fn(&mut Engine, &ParameterValue) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Arc::make_mut(&mut self.registry).register(name, handler)
    }

    pub fn registry(&self) -> &ActionRegistry<Engine> {
        &self.registry
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn catalog(&self) -> &DefinitionCatalog {
        &self.catalog
    }

    pub fn action(&self, action_id: &str) -> Option<&Arc<ActionDefinition>> {
        self.catalog.actions.get(action_id)
    }

    /// Actions in load order.
    pub fn actions(&self) -> impl Iterator<Item = &Arc<ActionDefinition>> {
        self.catalog.actions.iter()
    }

    /// Events with at least one add-on, sorted.
    pub fn events(&self) -> Vec<&str> {
        self.catalog.addons.events()
    }

    pub fn has_action(&self, action_id: &str) -> bool {
        self.catalog.actions.contains(action_id)
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.catalog.addons.has_event(event)
    }

    /// Current reading of the engine's clock.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Time left before `action_id` may run again, if it is cooling down.
    pub fn cooldown_remaining(&self, action_id: &str) -> Option<Duration> {
        let until = self.cooldowns.get(&normalize_id(action_id))?;
        until.checked_sub(self.clock.now()).filter(|left| !left.is_zero())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_draining(&self) -> bool {
        self.draining
    }

    pub fn diagnostics(&self) -> &DiagnosticLog {
        &self.diagnostics
    }

    /// Drain recorded diagnostics (for display).
    pub fn take_diagnostics(&mut self) -> Vec<DiagnosticEntry> {
        self.diagnostics.take()
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Drain lines appended to the output sink (for display).
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Tear down: drop pending work and runtime state, returning whatever
    /// diagnostics were still buffered.
    pub fn shutdown(mut self) -> Vec<DiagnosticEntry> {
        let dropped = self.pending.clear();
        self.cooldowns.clear();
        self.unlocked.clear();
        self.executing.clear();
        self.event_chain.clear();
        tracing::info!(dropped_pending = dropped, "Engine shut down");
        self.diagnostics.take()
    }
}

impl DispatchContext for Engine {
    fn append_output(&mut self, line: &str) {
        tracing::debug!(line, "Output");
        self.output.push(line.to_string());
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.record(diagnostic);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("folders", &self.folders)
            .field("registry", &self.registry)
            .field("parameters", &self.parameters.len())
            .field("addons", &self.catalog.addons.len())
            .field("actions", &self.catalog.actions.len())
            .field("pending", &self.pending.len())
            .field("draining", &self.draining)
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════

pub struct EngineBuilder {
    config: EngineConfig,
    folders: Option<ModFolders>,
    clock: Option<Arc<dyn Clock>>,
    registry: ActionRegistry<Engine>,
    issues: Vec<Diagnostic>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            folders: None,
            clock: None,
            registry: ActionRegistry::new(),
            issues: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Document sources. Defaults to the directories named by the config.
    pub fn folders(mut self, folders: ModFolders) -> Self {
        self.folders = Some(folders);
        self
    }

    /// Time source. Defaults to [`MonotonicClock`].
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Register `PrintMessage`, `TriggerAction`, `UnlockAction`,
    /// `LockAction`, `ReloadFolders` and `RaiseEvent`.
    pub fn with_builtin_handlers(mut self) -> Self {
        for (name, handler) in builtin_handlers() {
            self = self.handler_shared(name, handler);
        }
        self
    }

    pub fn handler<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Engine, &ParameterValue) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handler_shared(name, Arc::new(handler))
    }

    /// Register an already shared handler. A rejected registration is kept
    /// as a diagnostic on the built engine.
    pub fn handler_shared(mut self, name: &str, handler: Handler<Engine>) -> Self {
        if let Err(issue) = self.registry.register_shared(name, handler) {
            self.issues.push(issue);
        }
        self
    }

    /// Construct the engine and load the folders once.
    pub fn build(self) -> Engine {
        let folders = self
            .folders
            .unwrap_or_else(|| ModFolders::from_config(&self.config));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let mut engine = Engine {
            diagnostics: DiagnosticLog::new(self.config.diagnostics_capacity),
            config: self.config,
            folders,
            clock,
            registry: Arc::new(self.registry),
            parameters: ParameterStore::new(),
            catalog: DefinitionCatalog::default(),
            cooldowns: HashMap::new(),
            unlocked: HashSet::new(),
            pending: PendingQueue::new(),
            executing: HashSet::new(),
            event_chain: Vec::new(),
            draining: false,
            output: Vec::new(),
        };

        engine.diagnostics.extend(self.issues);
        engine.reload_folders();
        tracing::info!(
            handlers = engine.registry.len(),
            folders = ?engine.folders,
            "Engine initialized"
        );
        engine
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
