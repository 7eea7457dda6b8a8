//! Named parameters referenced by `@key` placeholders.

use std::collections::HashMap;

use loopmod_types::ParameterValue;

use crate::diagnostics::{DefinitionKind, Diagnostic};
use crate::source::Document;

/// Mapping from parameter name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    values: HashMap<String, ParameterValue>,
}

/// What changed when a store was replaced by a new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDiff {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

impl ParameterDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from parameter documents. Later documents overwrite
    /// earlier keys; non-object documents are skipped.
    pub fn from_documents(documents: &[Document]) -> (Self, Vec<Diagnostic>) {
        let mut store = Self::new();
        let mut issues = Vec::new();

        for document in documents {
            if let Err(issue) = store.load_document(document) {
                issues.push(issue);
            }
        }

        (store, issues)
    }

    /// Add every top-level field of an object document. Returns the number of
    /// parameters loaded.
    pub fn load_document(&mut self, document: &Document) -> Result<usize, Diagnostic> {
        let Some(fields) = document.value.as_object() else {
            return Err(Diagnostic::MalformedDefinition {
                kind: DefinitionKind::Parameter,
                origin: document.origin.clone(),
                reason: format!("expected an object, found {}", document.value.kind()),
            });
        };

        for (key, value) in fields {
            tracing::debug!(key = %key, value = %value, "Loaded parameter");
            self.values.insert(key.clone(), value.clone());
        }
        Ok(fields.len())
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parameter names in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParameterValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Replace the contents with a fresh snapshot: present keys are
    /// overwritten, keys absent from the snapshot are purged.
    pub fn replace_with(&mut self, snapshot: ParameterStore) -> ParameterDiff {
        let mut diff = ParameterDiff::default();

        for (key, value) in &snapshot.values {
            match self.values.get(key) {
                None => diff.added.push(key.clone()),
                Some(old) if old != value => diff.changed.push(key.clone()),
                Some(_) => {}
            }
        }
        diff.removed = self
            .values
            .keys()
            .filter(|key| !snapshot.values.contains_key(*key))
            .cloned()
            .collect();

        diff.added.sort();
        diff.changed.sort();
        diff.removed.sort();

        self.values = snapshot.values;
        diff
    }
}

impl FromIterator<(String, ParameterValue)> for ParameterStore {
    fn from_iter<T: IntoIterator<Item = (String, ParameterValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documents_merge_with_later_keys_winning() {
        let docs = vec![
            Document::new("a.json", json!({"speed": 1, "name": "Ada"})),
            Document::new("b.json", json!({"speed": 2})),
        ];

        let (store, issues) = ParameterStore::from_documents(&docs);

        assert!(issues.is_empty());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("speed"), Some(&ParameterValue::Number(2.0)));
    }

    #[test]
    fn non_object_document_is_malformed() {
        let docs = vec![Document::new("list.json", json!([1, 2]))];
        let (store, issues) = ParameterStore::from_documents(&docs);

        assert!(store.is_empty());
        assert!(matches!(
            issues.as_slice(),
            [Diagnostic::MalformedDefinition { kind: DefinitionKind::Parameter, .. }]
        ));
    }

    #[test]
    fn replace_sweeps_stale_keys() {
        let mut store = ParameterStore::new();
        store.insert("kept", 1);
        store.insert("changed", "old");
        store.insert("stale", true);

        let mut snapshot = ParameterStore::new();
        snapshot.insert("kept", 1);
        snapshot.insert("changed", "new");
        snapshot.insert("fresh", 0.5);

        let diff = store.replace_with(snapshot);

        assert_eq!(diff.added, vec!["fresh"]);
        assert_eq!(diff.changed, vec!["changed"]);
        assert_eq!(diff.removed, vec!["stale"]);
        assert!(!store.contains("stale"));
        assert_eq!(store.get("changed"), Some(&ParameterValue::from("new")));
        assert_eq!(store.keys(), vec!["changed", "fresh", "kept"]);
    }

    #[test]
    fn identical_snapshot_is_an_empty_diff() {
        let mut store: ParameterStore = [("a".to_string(), ParameterValue::from(1))]
            .into_iter()
            .collect();
        let diff = store.replace_with(store.clone());
        assert!(diff.is_empty());
    }
}
