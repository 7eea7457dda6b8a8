use std::collections::HashMap;
use std::sync::Arc;

use super::action::{ActionDefinition, normalize_id};
use super::addon::AddonDefinition;
use crate::diagnostics::{DefinitionKind, Diagnostic};
use crate::source::Document;

/// Add-ons grouped by the event they listen to, in load order.
#[derive(Debug, Clone, Default)]
pub struct AddonCatalog {
    by_event: HashMap<String, Vec<Arc<AddonDefinition>>>,
    len: usize,
}

impl AddonCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse add-on documents, skipping malformed ones.
    pub fn from_documents(documents: &[Document]) -> (Self, Vec<Diagnostic>) {
        let mut catalog = Self::new();
        let mut issues = Vec::new();

        for document in documents {
            match AddonDefinition::from_document(document) {
                Ok(addon) => {
                    tracing::debug!(
                        addon = %addon.addon_name,
                        event = %addon.event_name,
                        "Loaded add-on"
                    );
                    catalog.add(addon);
                }
                Err(issue) => issues.push(issue),
            }
        }

        (catalog, issues)
    }

    pub fn add(&mut self, addon: AddonDefinition) {
        self.by_event
            .entry(addon.event_name.clone())
            .or_default()
            .push(Arc::new(addon));
        self.len += 1;
    }

    /// Add-ons subscribed to `event`, in load order.
    pub fn subscribers(&self, event: &str) -> &[Arc<AddonDefinition>] {
        self.by_event.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.by_event.contains_key(event)
    }

    /// Event names with at least one subscriber, sorted.
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.by_event.keys().map(String::as_str).collect();
        events.sort_unstable();
        events
    }

    /// Every add-on, grouped by sorted event name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AddonDefinition>> {
        self.events()
            .into_iter()
            .flat_map(move |event| self.subscribers(event).iter())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Actions keyed by case-insensitive id. The first definition of an id wins.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: HashMap<String, Arc<ActionDefinition>>,
    /// Keys in load order
    order: Vec<String>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse action documents. Malformed records and repeated ids are
    /// reported and skipped.
    pub fn from_documents(documents: &[Document]) -> (Self, Vec<Diagnostic>) {
        let mut catalog = Self::new();
        let mut issues = Vec::new();

        for document in documents {
            let added = ActionDefinition::from_document(document)
                .and_then(|action| catalog.add(action, &document.origin));
            if let Err(issue) = added {
                issues.push(issue);
            }
        }

        (catalog, issues)
    }

    pub fn add(&mut self, action: ActionDefinition, origin: &str) -> Result<(), Diagnostic> {
        let key = action.key();
        if self.actions.contains_key(&key) {
            // Skip duplicate - keep the first definition
            return Err(Diagnostic::DuplicateDefinition {
                kind: DefinitionKind::Action,
                id: action.action_id,
                origin: origin.to_string(),
            });
        }

        tracing::debug!(
            action_id = %action.action_id,
            events = ?action.event_names,
            priority = action.priority,
            "Loaded action"
        );
        self.order.push(key.clone());
        self.actions.insert(key, Arc::new(action));
        Ok(())
    }

    pub fn get(&self, action_id: &str) -> Option<&Arc<ActionDefinition>> {
        self.actions.get(&normalize_id(action_id))
    }

    pub fn contains(&self, action_id: &str) -> bool {
        self.actions.contains_key(&normalize_id(action_id))
    }

    /// Normalized keys in load order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Definitions in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActionDefinition>> {
        self.order.iter().filter_map(|key| self.actions.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Both definition catalogs, swapped in together on reload.
#[derive(Debug, Clone, Default)]
pub struct DefinitionCatalog {
    pub addons: AddonCatalog,
    pub actions: ActionCatalog,
}

impl DefinitionCatalog {
    pub fn from_documents(addons: &[Document], actions: &[Document]) -> (Self, Vec<Diagnostic>) {
        let (addons, mut issues) = AddonCatalog::from_documents(addons);
        let (actions, action_issues) = ActionCatalog::from_documents(actions);
        issues.extend(action_issues);
        (Self { addons, actions }, issues)
    }
}
