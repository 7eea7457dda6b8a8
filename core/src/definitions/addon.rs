//! Add-on records: "when `event_name` fires, invoke `action` with `args`".

use loopmod_types::ParameterValue;

use crate::diagnostics::{DefinitionKind, Diagnostic};
use crate::source::Document;

#[derive(Debug, Clone, PartialEq)]
pub struct AddonDefinition {
    pub addon_name: String,
    pub event_name: String,
    /// Handler name invoked when the event fires
    pub action: String,
    /// Static arguments, always an object
    pub args: ParameterValue,
}

impl AddonDefinition {
    /// Parse an add-on document. `modName` is accepted in place of `addonName`.
    pub fn from_document(document: &Document) -> Result<Self, Diagnostic> {
        let value = &document.value;
        let malformed = |reason: &str| Diagnostic::MalformedDefinition {
            kind: DefinitionKind::Addon,
            origin: document.origin.clone(),
            reason: reason.to_string(),
        };

        if !value.is_object() {
            return Err(malformed("expected an object"));
        }

        let addon_name = value
            .non_empty_str("addonName")
            .or_else(|| value.non_empty_str("modName"))
            .ok_or_else(|| malformed("missing 'addonName'"))?;
        let event_name = value
            .non_empty_str("eventName")
            .ok_or_else(|| malformed("missing 'eventName'"))?;
        let action = value
            .non_empty_str("action")
            .ok_or_else(|| malformed("missing 'action'"))?;

        let args = match value.get("args") {
            Some(args @ ParameterValue::Object(_)) => args.clone(),
            Some(other) if other.is_present() => {
                tracing::warn!(
                    addon = %addon_name,
                    found = other.kind(),
                    "Add-on 'args' is not an object, ignoring"
                );
                ParameterValue::object()
            }
            _ => ParameterValue::object(),
        };

        Ok(Self {
            addon_name,
            event_name,
            action,
            args,
        })
    }
}
