//! Reading a mods root into fresh parameter and definition snapshots.

use crate::definitions::{ActionCatalog, DefinitionCatalog};
use crate::diagnostics::{DefinitionKind, Diagnostic};
use crate::params::ParameterStore;
use crate::source::{Document, DocumentSource, ModFolders, SourceError};

/// Everything read from the three folders in one pass.
#[derive(Debug, Clone, Default)]
pub struct ModSnapshot {
    pub parameters: ParameterStore,
    pub catalog: DefinitionCatalog,
    /// Unreadable, malformed and duplicate records, in load order
    pub issues: Vec<Diagnostic>,
}

impl ModSnapshot {
    pub fn load(folders: &ModFolders) -> Self {
        let mut issues = Vec::new();

        let documents = read_documents(folders.parameters.as_ref(), DefinitionKind::Parameter, &mut issues);
        let (parameters, parameter_issues) = ParameterStore::from_documents(&documents);
        issues.extend(parameter_issues);

        let addons = read_documents(folders.addons.as_ref(), DefinitionKind::Addon, &mut issues);
        let actions = read_documents(folders.actions.as_ref(), DefinitionKind::Action, &mut issues);
        let (catalog, catalog_issues) = DefinitionCatalog::from_documents(&addons, &actions);
        issues.extend(catalog_issues);

        tracing::info!(
            parameters = parameters.len(),
            addons = catalog.addons.len(),
            actions = catalog.actions.len(),
            issues = issues.len(),
            "Loaded mod folders"
        );

        Self {
            parameters,
            catalog,
            issues,
        }
    }
}

/// Read just the action folder.
pub fn load_actions(source: &dyn DocumentSource) -> (ActionCatalog, Vec<Diagnostic>) {
    let mut issues = Vec::new();
    let documents = read_documents(source, DefinitionKind::Action, &mut issues);
    let (catalog, catalog_issues) = ActionCatalog::from_documents(&documents);
    issues.extend(catalog_issues);
    (catalog, issues)
}

fn read_documents(
    source: &dyn DocumentSource,
    kind: DefinitionKind,
    issues: &mut Vec<Diagnostic>,
) -> Vec<Document> {
    let loaded = source.load();
    issues.extend(
        loaded
            .failures
            .into_iter()
            .map(|failure| unreadable(kind, failure)),
    );
    loaded.documents
}

fn unreadable(kind: DefinitionKind, failure: SourceError) -> Diagnostic {
    let origin = match &failure {
        SourceError::Io { path, .. } | SourceError::Parse { path, .. } => path.display().to_string(),
    };
    Diagnostic::MalformedDefinition {
        kind,
        origin,
        reason: failure.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DirectorySource, MemorySource};
    use serde_json::json;
    use std::fs;

    #[test]
    fn snapshot_collects_all_three_folders() {
        let folders = ModFolders::new(
            MemorySource::new("parameters").with(json!({"speed": 2})),
            MemorySource::new("addons")
                .with(json!({"addonName": "A", "eventName": "E", "action": "PrintMessage"}))
                .with(json!({"addonName": "Broken"})),
            MemorySource::new("actions")
                .with(json!({"actionId": "Go", "event": "E"}))
                .with(json!({"actionId": "go", "event": "F"})),
        );

        let snapshot = ModSnapshot::load(&folders);

        assert_eq!(snapshot.parameters.len(), 1);
        assert_eq!(snapshot.catalog.addons.len(), 1);
        assert_eq!(snapshot.catalog.actions.len(), 1);
        assert_eq!(snapshot.issues.len(), 2);
    }

    #[test]
    fn unparseable_files_become_malformed_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ nope").unwrap();
        fs::write(dir.path().join("good.json"), r#"{"actionId": "Ok", "event": "E"}"#).unwrap();

        let (catalog, issues) = load_actions(&DirectorySource::new(dir.path()));

        assert_eq!(catalog.len(), 1);
        assert!(matches!(
            issues.as_slice(),
            [Diagnostic::MalformedDefinition { kind: DefinitionKind::Action, origin, .. }]
                if origin.ends_with("bad.json")
        ));
    }
}
