use std::sync::Arc;
use std::time::Duration;

use loopmod_types::ParameterValue;

use super::Engine;
use super::queue::PendingAction;
use crate::definitions::{ActionDefinition, AddonDefinition, normalize_id};
use crate::diagnostics::{Diagnostic, Rejection};
use crate::params::{merge, resolve_with_issues};
use crate::registry::DispatchContext;

impl Engine {
    /// Raise an event: every subscribed add-on runs, in load order, with its
    /// args merged with `args` and resolved. Unknown events are a no-op.
    ///
    /// An event already being raised further up the same chain is refused
    /// with [`Diagnostic::CyclicEvent`].
    pub fn trigger_event(&mut self, event: &str, args: Option<&ParameterValue>) {
        // Snapshot so handlers that reload cannot disturb this fan-out
        let subscribers: Vec<Arc<AddonDefinition>> = self.catalog.addons.subscribers(event).to_vec();
        if subscribers.is_empty() {
            tracing::trace!(event, "No add-ons for event");
            return;
        }

        if self.event_chain.iter().any(|active| active == event) {
            self.record(Diagnostic::CyclicEvent {
                event: event.to_string(),
            });
            return;
        }
        self.event_chain.push(event.to_string());

        let registry = Arc::clone(&self.registry);
        for addon in subscribers {
            let merged = merge(Some(&addon.args), args);
            let resolved = self.resolve(&merged);

            tracing::debug!(
                addon = %addon.addon_name,
                event,
                action = %addon.action,
                "Dispatching add-on"
            );
            registry.invoke(self, &addon.action, &resolved);
        }
        self.event_chain.pop();
    }

    /// Request an action. Refused triggers are recorded as diagnostics;
    /// accepted ones are queued and the queue is drained unless a drain is
    /// already running further up the stack.
    pub fn trigger_action(&mut self, action_id: &str, payload: Option<&ParameterValue>) {
        let action = match self.admit(action_id) {
            Ok(action) => action,
            Err(reason) => {
                self.record(Diagnostic::rejected(action_id.trim(), reason));
                return;
            }
        };

        let merged = merge(Some(&action.default_payload), payload);
        let payload = self.resolve(&merged);

        tracing::debug!(
            action_id = %action.action_id,
            priority = action.priority,
            pending = self.pending.len() + 1,
            "Action queued"
        );
        self.pending.push(action, payload);
        self.process_queue();
    }

    /// Gate checks, in order: known, enabled, unlocked, off cooldown, not
    /// already executing.
    fn admit(&self, action_id: &str) -> Result<Arc<ActionDefinition>, Rejection> {
        let key = normalize_id(action_id);
        if key.is_empty() {
            return Err(Rejection::Unknown);
        }
        let action = self.catalog.actions.get(&key).ok_or(Rejection::Unknown)?;

        if !action.enabled {
            return Err(Rejection::Disabled);
        }
        if action.requires_unlock && !self.unlocked.contains(&key) {
            return Err(Rejection::Locked);
        }
        if action.has_cooldown()
            && let Some(until) = self.cooldowns.get(&key)
            && self.clock.now() < *until
        {
            return Err(Rejection::Cooldown);
        }
        if self.executing.contains(&key) {
            return Err(Rejection::Recursive);
        }

        Ok(Arc::clone(action))
    }

    /// Execute pending actions until the queue is empty. Re-entrant calls
    /// return immediately; the running drain picks up their entries.
    pub(super) fn process_queue(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;

        let mut steps = 0usize;
        while let Some(next) = self.pending.pop() {
            if let Some(limit) = self.config.max_drain_steps
                && steps >= limit
            {
                let dropped = 1 + self.pending.clear();
                self.record(Diagnostic::DrainLimitReached { steps, dropped });
                break;
            }
            steps += 1;
            self.execute(next);
        }

        self.draining = false;
    }

    fn execute(&mut self, pending: PendingAction) {
        let PendingAction { action, payload, .. } = pending;
        let key = action.key();

        self.executing.insert(key.clone());

        tracing::debug!(
            action_id = %action.action_id,
            events = ?action.event_names,
            "Executing action"
        );
        // Each action starts its own event chain
        let outer_chain = std::mem::take(&mut self.event_chain);
        for event in &action.event_names {
            self.trigger_event(event, Some(&payload));
        }
        self.event_chain = outer_chain;
        self.executing.remove(&key);

        if action.has_cooldown() {
            let length = Duration::try_from_secs_f32(action.cooldown).unwrap_or(Duration::MAX);
            let until = self.clock.now().saturating_add(length);
            self.cooldowns.insert(key, until);
        }
    }

    /// Resolve placeholders against the current parameters, recording any
    /// unresolved ones.
    pub(super) fn resolve(&mut self, value: &ParameterValue) -> ParameterValue {
        let (resolved, issues) = resolve_with_issues(value, &self.parameters);
        self.diagnostics.extend(issues);
        resolved
    }
}
