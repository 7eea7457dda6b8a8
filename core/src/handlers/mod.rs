//! Engine-level handlers.
//!
//! These let add-ons drive the engine itself: print to the output sink,
//! chain actions, flip unlocks, reload the folders and raise further events.
//! Host-specific handlers (teleporting, drawing text, ...) live with the host.

use std::sync::Arc;

use loopmod_types::ParameterValue;

use crate::diagnostics::HandlerError;
use crate::engine::Engine;
use crate::registry::{CHAT_MESSAGE_FIELD, DispatchContext, Handler};

pub const PRINT_MESSAGE: &str = "PrintMessage";
pub const TRIGGER_ACTION: &str = "TriggerAction";
pub const UNLOCK_ACTION: &str = "UnlockAction";
pub const LOCK_ACTION: &str = "LockAction";
pub const RELOAD_FOLDERS: &str = "ReloadFolders";
pub const RAISE_EVENT: &str = "RaiseEvent";

/// The engine-level handler table, in registration order.
pub fn builtin_handlers() -> Vec<(&'static str, Handler<Engine>)> {
    vec![
        (PRINT_MESSAGE, Arc::new(print_message) as Handler<Engine>),
        (TRIGGER_ACTION, Arc::new(trigger_action) as Handler<Engine>),
        (UNLOCK_ACTION, Arc::new(unlock_action) as Handler<Engine>),
        (LOCK_ACTION, Arc::new(lock_action) as Handler<Engine>),
        (RELOAD_FOLDERS, Arc::new(reload_folders) as Handler<Engine>),
        (RAISE_EVENT, Arc::new(raise_event) as Handler<Engine>),
    ]
}

/// Names of [`builtin_handlers`], without building the table.
pub fn builtin_handler_names() -> [&'static str; 6] {
    [
        PRINT_MESSAGE,
        TRIGGER_ACTION,
        UNLOCK_ACTION,
        LOCK_ACTION,
        RELOAD_FOLDERS,
        RAISE_EVENT,
    ]
}

/// A required, non-blank string argument.
pub fn required_str(args: &ParameterValue, name: &str) -> Result<String, HandlerError> {
    args.non_empty_str(name)
        .ok_or_else(|| HandlerError::missing(name))
}

/// An optional argument; null counts as absent.
pub fn optional<'a>(args: &'a ParameterValue, name: &str) -> Option<&'a ParameterValue> {
    args.get(name).filter(|value| value.is_present())
}

// The common-effects pass appends `chatMessage` again after this handler runs,
// so a PrintMessage add-on prints its message twice.
fn print_message(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let message = args
        .get(CHAT_MESSAGE_FIELD)
        .ok_or_else(|| HandlerError::missing(CHAT_MESSAGE_FIELD))?;
    engine.append_output(&message.as_str_lossy());
    Ok(())
}

fn trigger_action(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let action_id = required_str(args, "actionId")?;
    engine.trigger_action(&action_id, optional(args, "payload"));
    Ok(())
}

fn unlock_action(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let action_id = required_str(args, "actionId")?;
    engine.unlock_action(&action_id);
    Ok(())
}

fn lock_action(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let action_id = required_str(args, "actionId")?;
    engine.lock_action(&action_id);
    Ok(())
}

fn reload_folders(engine: &mut Engine, _args: &ParameterValue) -> Result<(), HandlerError> {
    let report = engine.reload_folders();
    tracing::info!(
        addons = report.addons,
        actions = report.actions,
        issues = report.issues,
        "Folders reloaded by add-on"
    );
    Ok(())
}

fn raise_event(engine: &mut Engine, args: &ParameterValue) -> Result<(), HandlerError> {
    let event = required_str(args, "eventName")?;
    engine.trigger_event(&event, optional(args, "args"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostic;
    use crate::engine::ManualClock;
    use crate::source::{MemorySource, ModFolders};
    use serde_json::json;

    fn make_engine(addons: MemorySource, actions: MemorySource) -> Engine {
        Engine::builder()
            .folders(ModFolders::new(
                MemorySource::new("parameters").with(json!({"who": "Ada"})),
                addons,
                actions,
            ))
            .clock(ManualClock::new())
            .with_builtin_handlers()
            .build()
    }

    fn handler_failures(engine: &mut Engine) -> Vec<String> {
        engine
            .take_diagnostics()
            .into_iter()
            .filter_map(|entry| match entry.diagnostic {
                Diagnostic::HandlerFailed { action, source } => Some(format!("{action}: {source}")),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn builtins_register_in_order() {
        let engine = make_engine(MemorySource::new("addons"), MemorySource::new("actions"));
        assert_eq!(
            engine.registry().names().collect::<Vec<_>>(),
            builtin_handler_names().to_vec()
        );
    }

    #[test]
    fn print_message_appends_twice_with_common_pass() {
        let addons = MemorySource::new("addons").with(json!({
            "addonName": "Greeter",
            "eventName": "Spawn",
            "action": "PrintMessage",
            "args": {"chatMessage": "Hello @who"}
        }));
        let mut engine = make_engine(addons, MemorySource::new("actions"));

        engine.trigger_event("Spawn", None);

        assert_eq!(engine.take_output(), vec!["Hello Ada", "Hello Ada"]);
    }

    #[test]
    fn print_message_without_message_fails_softly() {
        let addons = MemorySource::new("addons").with(json!({
            "addonName": "Mute",
            "eventName": "Spawn",
            "action": "PrintMessage"
        }));
        let mut engine = make_engine(addons, MemorySource::new("actions"));

        engine.trigger_event("Spawn", None);

        assert!(engine.take_output().is_empty());
        assert_eq!(
            handler_failures(&mut engine),
            vec!["PrintMessage: missing argument 'chatMessage'"]
        );
    }

    #[test]
    fn unlock_and_lock_from_addons() {
        let addons = MemorySource::new("addons")
            .with(json!({
                "addonName": "Unlocker",
                "eventName": "Open",
                "action": "UnlockAction",
                "args": {"actionId": "Secret"}
            }))
            .with(json!({
                "addonName": "Locker",
                "eventName": "Close",
                "action": "LockAction",
                "args": {"actionId": "SECRET"}
            }));
        let actions = MemorySource::new("actions")
            .with(json!({"actionId": "Secret", "event": "S", "requiresUnlock": true}));
        let mut engine = make_engine(addons, actions);

        engine.trigger_event("Open", None);
        assert!(engine.is_unlocked("secret"));

        engine.trigger_event("Close", None);
        assert!(!engine.is_unlocked("Secret"));
    }

    #[test]
    fn trigger_action_requires_an_id() {
        let addons = MemorySource::new("addons").with(json!({
            "addonName": "Bad",
            "eventName": "Go",
            "action": "TriggerAction",
            "args": {"actionId": "  "}
        }));
        let mut engine = make_engine(addons, MemorySource::new("actions"));

        engine.trigger_event("Go", None);

        assert_eq!(
            handler_failures(&mut engine),
            vec!["TriggerAction: missing argument 'actionId'"]
        );
    }

    #[test]
    fn trigger_action_forwards_payload() {
        let addons = MemorySource::new("addons")
            .with(json!({
                "addonName": "Chain",
                "eventName": "Go",
                "action": "TriggerAction",
                "args": {"actionId": "Say", "payload": {"chatMessage": "from chain"}}
            }))
            .with(json!({
                "addonName": "Sayer",
                "eventName": "Said",
                "action": "Log"
            }));
        let actions = MemorySource::new("actions").with(json!({"actionId": "Say", "event": "Said"}));
        let mut engine = make_engine(addons, actions);

        engine.trigger_event("Go", None);

        // Unknown handler "Log" still gets the common pass
        assert_eq!(engine.take_output(), vec!["from chain"]);
    }

    #[test]
    fn raise_event_chains_with_args() {
        let addons = MemorySource::new("addons")
            .with(json!({
                "addonName": "Relay",
                "eventName": "First",
                "action": "RaiseEvent",
                "args": {"eventName": "Second", "args": {"chatMessage": "relayed"}}
            }))
            .with(json!({
                "addonName": "Sink",
                "eventName": "Second",
                "action": "Noop"
            }));
        let mut engine = make_engine(addons, MemorySource::new("actions"));

        engine.trigger_event("First", None);

        assert_eq!(engine.take_output(), vec!["relayed"]);
    }
}
