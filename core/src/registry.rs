//! Handler registry
//!
//! Maps handler names (the `action` field of an add-on) to callbacks.
//! Handlers are registered explicitly at startup; registration order is kept
//! and the first registration of a name wins.
//!
//! Invoking a name is two-phase: the handler runs if one is registered, then
//! the common-effects pass runs no matter what. The common effect is the
//! `chatMessage` convention: any argument tree carrying that field appends
//! it to the host's output.

use std::collections::HashMap;
use std::sync::Arc;

use loopmod_types::ParameterValue;

use crate::diagnostics::{DefinitionKind, Diagnostic, HandlerError};

/// Field that triggers the common output effect.
pub const CHAT_MESSAGE_FIELD: &str = "chatMessage";

/// A named callback over a resolved argument tree.
pub type Handler<C> = Arc<dyn Fn(&mut C, &ParameterValue) -> Result<(), HandlerError> + Send + Sync>;

/// What dispatch needs from the context handlers run against.
pub trait DispatchContext {
    /// Append one line to the shared output sink.
    fn append_output(&mut self, line: &str);

    /// Report a recovered problem.
    fn record(&mut self, diagnostic: Diagnostic);
}

pub struct ActionRegistry<C> {
    handlers: HashMap<String, Handler<C>>,
    order: Vec<String>,
}

impl<C> ActionRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a closure under `name`.
    pub fn register<F>(&mut self, name: &str, handler: F) -> Result<(), Diagnostic>
    where
        F: Fn(&mut C, &ParameterValue) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register_shared(name, Arc::new(handler))
    }

    /// Register an already shared handler. Blank names and names that are
    /// already taken are refused; the existing registration is kept.
    pub fn register_shared(&mut self, name: &str, handler: Handler<C>) -> Result<(), Diagnostic> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Diagnostic::InvalidRegistration {
                name: String::new(),
                reason: "handler name is empty".to_string(),
            });
        }
        if self.handlers.contains_key(name) {
            return Err(Diagnostic::InvalidRegistration {
                name: name.to_string(),
                reason: "already registered".to_string(),
            });
        }

        self.handlers.insert(name.to_string(), handler);
        self.order.push(name.to_string());
        tracing::debug!(handler = name, "Registered handler");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Handler<C>> {
        self.handlers.get(name)
    }

    /// Handler names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<C: DispatchContext> ActionRegistry<C> {
    /// Run the handler registered under `name` (if any), then the
    /// common-effects pass.
    pub fn invoke(&self, ctx: &mut C, name: &str, args: &ParameterValue) {
        match self.handlers.get(name) {
            Some(handler) => {
                if let Err(source) = handler(ctx, args) {
                    ctx.record(Diagnostic::HandlerFailed {
                        action: name.to_string(),
                        source,
                    });
                }
            }
            None => ctx.record(Diagnostic::UnknownReference {
                kind: DefinitionKind::Handler,
                name: name.to_string(),
            }),
        }

        apply_common_effects(ctx, args);
    }
}

/// Effects shared by every invocation, regardless of the handler.
pub fn apply_common_effects<C: DispatchContext>(ctx: &mut C, args: &ParameterValue) {
    if let Some(message) = args.get(CHAT_MESSAGE_FIELD) {
        ctx.append_output(&message.as_str_lossy());
    }
}

impl<C> Default for ActionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for ActionRegistry<C> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            order: self.order.clone(),
        }
    }
}

impl<C> std::fmt::Debug for ActionRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("handlers", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Host {
        output: Vec<String>,
        diagnostics: Vec<Diagnostic>,
        calls: Vec<String>,
    }

    impl DispatchContext for Host {
        fn append_output(&mut self, line: &str) {
            self.output.push(line.to_string());
        }

        fn record(&mut self, diagnostic: Diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    fn recording(tag: &'static str) -> impl Fn(&mut Host, &ParameterValue) -> Result<(), HandlerError> {
        move |host: &mut Host, _args: &ParameterValue| {
            host.calls.push(tag.to_string());
            Ok(())
        }
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = ActionRegistry::<Host>::new();
        registry.register("Jump", recording("first")).unwrap();
        let err = registry.register("Jump", recording("second")).unwrap_err();
        assert!(matches!(err, Diagnostic::InvalidRegistration { .. }));

        let mut host = Host::default();
        registry.invoke(&mut host, "Jump", &ParameterValue::object());
        assert_eq!(host.calls, vec!["first"]);
    }

    #[test]
    fn blank_names_are_refused() {
        let mut registry = ActionRegistry::<Host>::new();
        assert!(registry.register("  ", recording("x")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn names_keep_registration_order() {
        let mut registry = ActionRegistry::<Host>::new();
        for name in ["Zeta", "Alpha", "Mid"] {
            registry.register(name, recording("x")).unwrap();
        }
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn unknown_handler_still_runs_common_effects() {
        let registry = ActionRegistry::<Host>::new();
        let mut host = Host::default();

        registry.invoke(&mut host, "Nope", &ParameterValue::from(json!({"chatMessage": "hi"})));

        assert_eq!(host.output, vec!["hi"]);
        assert_eq!(
            host.diagnostics,
            vec![Diagnostic::UnknownReference {
                kind: DefinitionKind::Handler,
                name: "Nope".into()
            }]
        );
    }

    #[test]
    fn failing_handler_is_recovered_and_common_effects_run() {
        let mut registry = ActionRegistry::<Host>::new();
        registry
            .register("Teleport", |_: &mut Host, _: &ParameterValue| {
                Err(HandlerError::missing("x"))
            })
            .unwrap();

        let mut host = Host::default();
        registry.invoke(
            &mut host,
            "Teleport",
            &ParameterValue::from(json!({"chatMessage": 42})),
        );

        assert_eq!(host.output, vec!["42"]);
        assert!(matches!(
            host.diagnostics.as_slice(),
            [Diagnostic::HandlerFailed { action, .. }] if action == "Teleport"
        ));
    }

    #[test]
    fn no_common_effect_without_the_field() {
        let mut registry = ActionRegistry::<Host>::new();
        registry.register("Noop", recording("noop")).unwrap();

        let mut host = Host::default();
        registry.invoke(&mut host, "Noop", &ParameterValue::from(json!({"message": "x"})));
        assert!(host.output.is_empty());
        assert!(host.diagnostics.is_empty());
    }
}
