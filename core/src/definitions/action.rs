//! Action records.
//!
//! An action is a named, gated unit of work: when triggered (and allowed to
//! run) it raises each of its events in order with its payload.

use loopmod_types::ParameterValue;

use crate::diagnostics::{DefinitionKind, Diagnostic};
use crate::source::Document;

/// Fields that may carry event names, merged in this order.
const EVENT_FIELDS: [&str; 3] = ["event", "eventName", "events"];

#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
    pub action_id: String,
    /// Ordered, without blanks or duplicates. Never empty.
    pub event_names: Vec<String>,
    pub description: String,
    pub category: String,
    pub icon: String,
    pub enabled: bool,
    pub priority: i32,
    /// Seconds; zero disables the cooldown
    pub cooldown: f32,
    pub requires_unlock: bool,
    pub default_payload: ParameterValue,
}

/// Case-insensitive identity of an action id.
pub fn normalize_id(action_id: &str) -> String {
    action_id.trim().to_lowercase()
}

impl ActionDefinition {
    pub fn new(action_id: impl Into<String>, event_names: Vec<String>) -> Self {
        Self {
            action_id: action_id.into(),
            event_names,
            description: String::new(),
            category: String::new(),
            icon: String::new(),
            enabled: true,
            priority: 0,
            cooldown: 0.0,
            requires_unlock: false,
            default_payload: ParameterValue::Null,
        }
    }

    pub fn key(&self) -> String {
        normalize_id(&self.action_id)
    }

    pub fn has_cooldown(&self) -> bool {
        self.cooldown > 0.0
    }

    pub fn from_document(document: &Document) -> Result<Self, Diagnostic> {
        let value = &document.value;
        let malformed = |reason: &str| Diagnostic::MalformedDefinition {
            kind: DefinitionKind::Action,
            origin: document.origin.clone(),
            reason: reason.to_string(),
        };

        if !value.is_object() {
            return Err(malformed("expected an object"));
        }

        let action_id = value
            .non_empty_str("actionId")
            .ok_or_else(|| malformed("missing 'actionId'"))?;

        let event_names = collect_event_names(value);
        if event_names.is_empty() {
            return Err(malformed("no events"));
        }

        let text = |key: &str| {
            value
                .get(key)
                .filter(|v| v.is_present())
                .map(|v| v.as_str_lossy().into_owned())
                .unwrap_or_default()
        };

        let cooldown = value.get("cooldown").map(ParameterValue::as_f32).unwrap_or(0.0);

        // `parameters` wins over the older `args`
        let default_payload = value
            .get("parameters")
            .filter(|v| v.is_present())
            .or_else(|| value.get("args").filter(|v| v.is_present()))
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            action_id,
            event_names,
            description: text("description"),
            category: text("category"),
            icon: text("icon"),
            enabled: value.get("enabled").is_none_or(ParameterValue::as_bool),
            priority: value.get("priority").map(ParameterValue::as_i32).unwrap_or(0),
            cooldown: if cooldown.is_finite() { cooldown.max(0.0) } else { 0.0 },
            requires_unlock: value
                .get("requiresUnlock")
                .is_some_and(ParameterValue::as_bool),
            default_payload,
        })
    }
}

fn collect_event_names(value: &ParameterValue) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |raw: &ParameterValue| {
        let name = raw.as_str_lossy();
        let name = name.trim();
        if !name.is_empty() && !names.iter().any(|existing| existing == name) {
            names.push(name.to_string());
        }
    };

    for field in EVENT_FIELDS {
        match value.get(field) {
            Some(ParameterValue::Array(items)) => items.iter().for_each(&mut push),
            Some(single @ ParameterValue::String(_)) => push(single),
            _ => {}
        }
    }
    names
}
