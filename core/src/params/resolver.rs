//! Placeholder resolution.
//!
//! Strings may reference parameters as `@key` or `@{key}` where the key is
//! `[A-Za-z0-9_]+`:
//!
//! ```text
//! "@{speed}"        -> 3.5                  (exact form: the value itself)
//! "Hello @name!"    -> "Hello Ada!"         (interpolation: rendered text)
//! "@{bad-key}"      -> "@{bad-key}"         (not a placeholder, verbatim)
//! ```
//!
//! Resolved values are resolved again, so parameters may reference other
//! parameters. Keys currently being resolved are tracked for the duration of
//! one top-level call; meeting one of them again leaves the placeholder text
//! as-is instead of recursing forever.

use std::sync::LazyLock;

use loopmod_types::ParameterValue;
use regex::Regex;

use super::store::ParameterStore;
use crate::diagnostics::Diagnostic;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(?:\{([A-Za-z0-9_]+)\}|([A-Za-z0-9_]+))").expect("placeholder regex must compile")
});

fn is_valid_key(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Key of a string that is nothing but a single placeholder.
fn exact_placeholder(value: &str) -> Option<&str> {
    let rest = value.strip_prefix('@')?;
    let key = match rest.strip_prefix('{') {
        Some(braced) => braced.strip_suffix('}')?,
        None => rest,
    };
    is_valid_key(key).then_some(key)
}

/// Resolves placeholders against one store, collecting diagnostics.
pub struct Resolver<'a> {
    store: &'a ParameterStore,
    active: Vec<String>,
    issues: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a ParameterStore) -> Self {
        Self {
            store,
            active: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Resolve a whole value tree into a fresh copy.
    pub fn resolve(&mut self, value: &ParameterValue) -> ParameterValue {
        match value {
            ParameterValue::String(s) => self.resolve_string(s),
            ParameterValue::Array(items) => {
                ParameterValue::Array(items.iter().map(|item| self.resolve(item)).collect())
            }
            ParameterValue::Object(fields) => ParameterValue::Object(
                fields
                    .iter()
                    .map(|(key, field)| (key.clone(), self.resolve(field)))
                    .collect(),
            ),
            scalar => scalar.clone(),
        }
    }

    pub fn into_issues(self) -> Vec<Diagnostic> {
        self.issues
    }

    fn resolve_string(&mut self, value: &str) -> ParameterValue {
        if let Some(key) = exact_placeholder(value) {
            return self
                .lookup(key)
                .unwrap_or_else(|| ParameterValue::from(value));
        }

        if !value.contains('@') {
            return ParameterValue::from(value);
        }

        let mut output = String::with_capacity(value.len());
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(value) {
            let Some(full) = captures.get(0) else {
                continue;
            };
            let Some(key) = captures.get(1).or_else(|| captures.get(2)) else {
                continue;
            };

            output.push_str(&value[last..full.start()]);
            match self.lookup(key.as_str()) {
                Some(resolved) => output.push_str(&resolved.as_str_lossy()),
                None => output.push_str(full.as_str()),
            }
            last = full.end();
        }
        output.push_str(&value[last..]);

        ParameterValue::String(output)
    }

    /// Fully resolved value of a parameter, or `None` when the key is
    /// missing or already being resolved further up the stack.
    fn lookup(&mut self, key: &str) -> Option<ParameterValue> {
        if self.active.iter().any(|active| active == key) {
            self.issues.push(Diagnostic::CircularParameterReference {
                key: key.to_string(),
            });
            return None;
        }

        let store = self.store;
        let Some(param) = store.get(key) else {
            self.issues.push(Diagnostic::MissingParameter {
                key: key.to_string(),
            });
            return None;
        };

        self.active.push(key.to_string());
        let resolved = self.resolve(param);
        self.active.pop();

        tracing::trace!(key, resolved = %resolved, "Resolved parameter");
        Some(resolved)
    }
}

/// Resolve a value tree, returning the diagnostics alongside.
pub fn resolve_with_issues(
    value: &ParameterValue,
    store: &ParameterStore,
) -> (ParameterValue, Vec<Diagnostic>) {
    let mut resolver = Resolver::new(store);
    let resolved = resolver.resolve(value);
    (resolved, resolver.into_issues())
}

/// Resolve a value tree, logging any diagnostics.
pub fn resolve(value: &ParameterValue, store: &ParameterStore) -> ParameterValue {
    let (resolved, issues) = resolve_with_issues(value, store);
    for issue in &issues {
        issue.emit();
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(value: serde_json::Value) -> ParameterStore {
        let ParameterValue::Object(fields) = ParameterValue::from(value) else {
            panic!("test store must be an object");
        };
        fields.into_iter().collect()
    }

    fn s(text: &str) -> ParameterValue {
        ParameterValue::from(text)
    }

    #[test]
    fn exact_placeholder_yields_the_value_itself() {
        let params = store(json!({"speed": 3.5}));
        assert_eq!(resolve(&s("@{speed}"), &params), ParameterValue::Number(3.5));
        assert_eq!(resolve(&s("@speed"), &params), ParameterValue::Number(3.5));
    }

    #[test]
    fn exact_placeholder_keeps_structure() {
        let params = store(json!({"spawn": {"x": 1, "y": 2}}));
        assert_eq!(
            resolve(&s("@spawn"), &params),
            ParameterValue::from(json!({"x": 1, "y": 2}))
        );
    }

    #[test]
    fn interpolation_renders_values_as_text() {
        let params = store(json!({"name": "Ada", "pos": [1, 2], "hp": 10}));
        assert_eq!(resolve(&s("Hello @name!"), &params), s("Hello Ada!"));
        assert_eq!(resolve(&s("at @{pos} with @hp hp"), &params), s("at [1,2] with 10 hp"));
        assert_eq!(resolve(&s("@name@name"), &params), s("AdaAda"));
    }

    #[test]
    fn invalid_sequences_stay_verbatim() {
        let params = store(json!({"a": 1}));
        assert_eq!(resolve(&s("@{bad-key} @ x"), &params), s("@{bad-key} @ x"));
        assert_eq!(resolve(&s("@{}"), &params), s("@{}"));
        assert_eq!(resolve(&s("trailing @"), &params), s("trailing @"));
    }

    #[test]
    fn missing_parameter_keeps_literal_with_diagnostic() {
        let params = store(json!({}));
        let (value, issues) = resolve_with_issues(&s("@{ghost}"), &params);
        assert_eq!(value, s("@{ghost}"));
        assert_eq!(issues, vec![Diagnostic::MissingParameter { key: "ghost".into() }]);

        let (value, issues) = resolve_with_issues(&s("hi @ghost."), &params);
        assert_eq!(value, s("hi @ghost."));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn resolution_is_transitive() {
        let params = store(json!({"greeting": "Hello @name", "name": "@{first}", "first": "Ada"}));
        assert_eq!(resolve(&s("@greeting!"), &params), s("Hello Ada!"));
    }

    #[test]
    fn cycles_terminate_with_literal_text() {
        let params = store(json!({"a": "@b", "b": "@a"}));
        let (value, issues) = resolve_with_issues(&s("@a"), &params);

        assert_eq!(value, s("@a"));
        assert_eq!(
            issues,
            vec![Diagnostic::CircularParameterReference { key: "a".into() }]
        );
    }

    #[test]
    fn self_reference_in_interpolation_terminates() {
        let params = store(json!({"loop": "again @loop"}));
        let (value, issues) = resolve_with_issues(&s("@loop"), &params);
        assert_eq!(value, s("again @loop"));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn guard_is_per_branch_not_global() {
        // The same key used twice side by side is not a cycle
        let params = store(json!({"n": "1", "pair": ["@n", "@n"]}));
        let (value, issues) = resolve_with_issues(&s("@pair"), &params);
        assert_eq!(value, ParameterValue::from(json!(["1", "1"])));
        assert!(issues.is_empty());
    }

    #[test]
    fn trees_resolve_field_wise_and_leave_scalars() {
        let params = store(json!({"x": 4}));
        let args = ParameterValue::from(json!({
            "pos": {"x": "@x", "y": 0},
            "tags": ["@x", true, null],
            "label": "x=@{x}"
        }));
        assert_eq!(
            resolve(&args, &params),
            ParameterValue::from(json!({
                "pos": {"x": 4, "y": 0},
                "tags": [4, true, null],
                "label": "x=4"
            }))
        );
    }
}
