//! Static checks over a loaded mods root.

use std::collections::HashSet;
use std::fmt;

use loopmod_core::params::resolve_with_issues;
use loopmod_core::{Diagnostic, ModSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{tag}: {}", self.message)
    }
}

#[derive(Debug, Default)]
pub struct Report {
    pub findings: Vec<Finding>,
}

impl Report {
    fn error(&mut self, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.findings.push(Finding {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Whether the run should exit non-zero.
    pub fn failed(&self, strict: bool) -> bool {
        self.errors() > 0 || (strict && self.warnings() > 0)
    }
}

/// Check a snapshot against the handler names a host would register.
pub fn check(snapshot: &ModSnapshot, handlers: &HashSet<String>) -> Report {
    let mut report = Report::default();

    // Unreadable, malformed and duplicate records
    for issue in &snapshot.issues {
        report.error(issue.to_string());
    }

    let addons = &snapshot.catalog.addons;
    let actions = &snapshot.catalog.actions;

    for addon in addons.iter() {
        if !handlers.contains(&addon.action) {
            report.warning(format!(
                "add-on '{}' on '{}' calls unknown handler '{}'",
                addon.addon_name, addon.event_name, addon.action
            ));
        }
        check_placeholders(
            &mut report,
            &format!("add-on '{}'", addon.addon_name),
            resolve_with_issues(&addon.args, &snapshot.parameters).1,
        );
    }

    for action in actions.iter() {
        for event in &action.event_names {
            if !addons.has_event(event) {
                report.warning(format!(
                    "action '{}' raises '{}' but no add-on listens to it",
                    action.action_id, event
                ));
            }
        }
        check_placeholders(
            &mut report,
            &format!("action '{}'", action.action_id),
            resolve_with_issues(&action.default_payload, &snapshot.parameters).1,
        );
    }

    report
}

fn check_placeholders(report: &mut Report, owner: &str, issues: Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for issue in issues {
        let message = issue.to_string();
        if seen.insert(message.clone()) {
            report.warning(format!("{owner}: {message}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopmod_core::{MemorySource, ModFolders};
    use serde_json::json;

    fn handlers(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn snapshot(
        parameters: MemorySource,
        addons: MemorySource,
        actions: MemorySource,
    ) -> ModSnapshot {
        ModSnapshot::load(&ModFolders::new(parameters, addons, actions))
    }

    #[test]
    fn clean_root_has_no_findings() {
        let snap = snapshot(
            MemorySource::new("parameters").with(json!({"greeting": "hi"})),
            MemorySource::new("addons").with(json!({
                "addonName": "Greeter",
                "eventName": "Wave",
                "action": "PrintMessage",
                "args": {"chatMessage": "@greeting"}
            })),
            MemorySource::new("actions").with(json!({"actionId": "Hello", "event": "Wave"})),
        );

        let report = check(&snap, &handlers(&["PrintMessage"]));

        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert!(!report.failed(true));
    }

    #[test]
    fn duplicate_action_is_an_error() {
        let snap = snapshot(
            MemorySource::new("parameters"),
            MemorySource::new("addons").with(json!({
                "addonName": "A", "eventName": "E", "action": "PrintMessage"
            })),
            MemorySource::new("actions")
                .with(json!({"actionId": "Go", "event": "E"}))
                .with(json!({"actionId": "go", "event": "E"})),
        );

        let report = check(&snap, &handlers(&["PrintMessage"]));

        assert_eq!(report.errors(), 1);
        assert!(report.failed(false));
    }

    #[test]
    fn unknown_handler_and_orphan_event_are_warnings() {
        let snap = snapshot(
            MemorySource::new("parameters"),
            MemorySource::new("addons").with(json!({
                "addonName": "Fx", "eventName": "Boom", "action": "Explode"
            })),
            MemorySource::new("actions").with(json!({"actionId": "Quiet", "event": "Nobody"})),
        );

        let report = check(&snap, &handlers(&["PrintMessage"]));

        assert_eq!(report.errors(), 0);
        assert_eq!(report.warnings(), 2);
        assert!(!report.failed(false));
        assert!(report.failed(true));
    }

    #[test]
    fn unresolved_placeholders_are_reported_once_per_owner() {
        let snap = snapshot(
            MemorySource::new("parameters").with(json!({"a": "@b", "b": "@a"})),
            MemorySource::new("addons").with(json!({
                "addonName": "Loop",
                "eventName": "E",
                "action": "PrintMessage",
                "args": {"first": "@missing", "second": "@missing"}
            })),
            MemorySource::new("actions").with(json!({
                "actionId": "Cycle", "event": "E", "parameters": {"v": "@a"}
            })),
        );

        let report = check(&snap, &handlers(&["PrintMessage"]));

        let messages: Vec<_> = report.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages
                .iter()
                .filter(|m| m.starts_with("add-on 'Loop'"))
                .count(),
            1
        );
        assert!(messages.iter().any(|m| m.starts_with("action 'Cycle': circular")));
    }
}
