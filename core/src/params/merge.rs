//! Merging definition-side arguments with arguments supplied at trigger time.

use loopmod_types::ParameterValue;

fn present(value: Option<&ParameterValue>) -> Option<&ParameterValue> {
    value.filter(|v| v.is_present())
}

/// Combine static and runtime arguments.
///
/// - both absent (or null): an empty object
/// - one present: a copy of it
/// - both objects: field union where runtime fields replace definition
///   fields wholesale (nested objects are not merged)
/// - otherwise the runtime value wins
pub fn merge(
    definition: Option<&ParameterValue>,
    runtime: Option<&ParameterValue>,
) -> ParameterValue {
    match (present(definition), present(runtime)) {
        (None, None) => ParameterValue::object(),
        (Some(only), None) | (None, Some(only)) => only.clone(),
        (Some(ParameterValue::Object(base)), Some(ParameterValue::Object(overrides))) => {
            let mut merged = base.clone();
            for (key, value) in overrides {
                merged.insert(key.clone(), value.clone());
            }
            ParameterValue::Object(merged)
        }
        (Some(_), Some(runtime)) => runtime.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(value: serde_json::Value) -> ParameterValue {
        ParameterValue::from(value)
    }

    #[test]
    fn runtime_fields_take_precedence() {
        let merged = merge(Some(&v(json!({"x": 1, "y": 2}))), Some(&v(json!({"y": 3, "z": 4}))));
        assert_eq!(merged, v(json!({"x": 1, "y": 3, "z": 4})));
    }

    #[test]
    fn absent_sides() {
        assert_eq!(merge(None, None), ParameterValue::object());
        assert_eq!(
            merge(Some(&ParameterValue::Null), Some(&ParameterValue::Null)),
            ParameterValue::object()
        );
        assert_eq!(merge(Some(&v(json!({"a": 1}))), None), v(json!({"a": 1})));
        assert_eq!(merge(None, Some(&v(json!([1])))), v(json!([1])));
        assert_eq!(
            merge(Some(&ParameterValue::Null), Some(&v(json!({"b": 2})))),
            v(json!({"b": 2}))
        );
    }

    #[test]
    fn nested_objects_are_replaced_not_merged() {
        let merged = merge(
            Some(&v(json!({"pos": {"x": 1, "y": 2}}))),
            Some(&v(json!({"pos": {"x": 9}}))),
        );
        assert_eq!(merged, v(json!({"pos": {"x": 9}})));
    }

    #[test]
    fn mismatched_shapes_take_runtime_value() {
        assert_eq!(
            merge(Some(&v(json!({"a": 1}))), Some(&v(json!(["x"])))),
            v(json!(["x"]))
        );
        assert_eq!(merge(Some(&v(json!([1]))), Some(&v(json!({"a": 1})))), v(json!({"a": 1})));
    }
}
