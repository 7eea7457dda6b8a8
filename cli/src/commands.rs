use std::sync::Arc;

use loopmod_core::{Engine, ParameterValue};
use tokio::sync::RwLock;

use crate::app_state::AppState;

fn parse_json(label: &str, text: Option<&str>) -> Result<Option<ParameterValue>, String> {
    text.map(|text| {
        ParameterValue::from_json_str(text).map_err(|e| format!("invalid {label} JSON: {e}\n"))
    })
    .transpose()
}

/// Print and keep whatever the last dispatch appended to the output sink.
fn flush_output(state: &mut AppState) {
    for line in state.engine.take_output() {
        println!("> {line}");
        state.transcript.push(line);
    }
    let pending = state.engine.diagnostics().len();
    if pending > 0 {
        println!("({pending} diagnostic(s), see `diagnostics`)");
    }
}

pub async fn raise_event(name: &str, args: Option<&str>, state: Arc<RwLock<AppState>>) -> Result<(), String> {
    let args = parse_json("args", args)?;
    let mut s = state.write().await;
    if !s.engine.has_event(name) {
        println!("No add-ons listen to '{name}'");
    }
    s.engine.trigger_event(name, args.as_ref());
    flush_output(&mut s);
    Ok(())
}

pub async fn trigger_action(id: &str, payload: Option<&str>, state: Arc<RwLock<AppState>>) -> Result<(), String> {
    let payload = parse_json("payload", payload)?;
    let mut s = state.write().await;
    s.engine.trigger_action(id, payload.as_ref());
    flush_output(&mut s);
    Ok(())
}

pub async fn unlock(id: &str, state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    s.engine.unlock_action(id);
    println!("'{id}' unlocked: {}", s.engine.is_unlocked(id));
}

pub async fn lock(id: &str, state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    s.engine.lock_action(id);
    println!("'{id}' unlocked: {}", s.engine.is_unlocked(id));
}

pub async fn reload(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    let report = s.engine.reload_folders();

    println!(
        "Reloaded: {} parameter(s), {} add-on(s), {} action(s), {} issue(s)",
        s.engine.parameters().len(),
        report.addons,
        report.actions,
        report.issues
    );
    let diff = &report.parameters;
    if !diff.is_empty() {
        println!(
            "  parameters: +{:?} ~{:?} -{:?}",
            diff.added, diff.changed, diff.removed
        );
    }
    if !report.removed_actions.is_empty() {
        println!("  removed actions: {}", report.removed_actions.join(", "));
    }
}

pub async fn list_actions(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    let engine: &Engine = &s.engine;
    if engine.actions().next().is_none() {
        println!("No actions loaded");
        return;
    }

    for action in engine.actions() {
        let mut flags = Vec::new();
        if !action.enabled {
            flags.push("disabled".to_string());
        }
        if action.requires_unlock {
            flags.push(if engine.is_unlocked(&action.action_id) { "unlocked" } else { "locked" }.to_string());
        }
        if let Some(left) = engine.cooldown_remaining(&action.action_id) {
            flags.push(format!("cooldown {:.1}s", left.as_secs_f32()));
        }

        println!(
            "{:<24} prio {:>3}  events [{}]{}",
            action.action_id,
            action.priority,
            action.event_names.join(", "),
            if flags.is_empty() { String::new() } else { format!("  ({})", flags.join(", ")) }
        );
    }
}

pub async fn list_events(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    let addons = &s.engine.catalog().addons;
    if addons.is_empty() {
        println!("No add-ons loaded");
        return;
    }

    for event in addons.events() {
        println!("{event}");
        for addon in addons.subscribers(event) {
            println!("  {} -> {} {}", addon.addon_name, addon.action, addon.args);
        }
    }
}

pub async fn list_params(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    let params = s.engine.parameters();
    if params.is_empty() {
        println!("No parameters loaded");
        return;
    }
    for key in params.keys() {
        if let Some(value) = params.get(key) {
            println!("@{key} = {}", value.to_json_string());
        }
    }
}

/// Feed a key press through the input bindings.
pub async fn press(key: &str, state: Arc<RwLock<AppState>>) -> Result<(), String> {
    let mut s = state.write().await;
    s.keyboard.press(key);
    poll_bindings(&mut s)
}

pub async fn release(key: &str, state: Arc<RwLock<AppState>>) -> Result<(), String> {
    let mut s = state.write().await;
    s.keyboard.release(key);
    poll_bindings(&mut s)
}

fn poll_bindings(s: &mut AppState) -> Result<(), String> {
    let now = s.engine.now();
    let fired = s
        .bindings
        .lock()
        .map_err(|_| "input bindings lock poisoned\n".to_string())?
        .poll(&s.keyboard, now);
    s.keyboard.end_tick();

    if fired.is_empty() {
        println!("No binding fired");
    }
    for binding in fired {
        println!("Binding '{}' -> {}", binding.binding_id, binding.action_id);
        s.engine
            .trigger_action(&binding.action_id, binding.payload.as_ref());
    }
    flush_output(s);
    Ok(())
}

pub async fn show_output(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    if s.transcript.is_empty() {
        println!("No output yet");
    }
    for line in &s.transcript {
        println!("{line}");
    }
}

pub async fn show_diagnostics(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    let entries = s.engine.take_diagnostics();
    if entries.is_empty() {
        println!("No diagnostics");
    }
    for entry in entries {
        println!("{} {}", entry.at.format("%H:%M:%S%.3f"), entry.diagnostic);
    }
}

pub async fn show_settings(state: Arc<RwLock<AppState>>) {
    let s = state.read().await;
    let c = &s.config;
    println!("mods_root:            {}", c.mods_root.display());
    println!("parameters:           {}", c.parameters_dir().display());
    println!("addons:               {}", c.addons_dir().display());
    println!("actions:              {}", c.actions_dir().display());
    println!("diagnostics_capacity: {}", c.diagnostics_capacity);
    println!("max_drain_steps:      {:?}", c.max_drain_steps);
    println!("watch:                {}", c.watch);
}

pub async fn exit(state: Arc<RwLock<AppState>>) {
    let mut s = state.write().await;
    if let Some(task) = s.watcher_task.take() {
        task.abort();
    }
    println!("Goodbye");
}
