//! Loosely typed value tree used as the argument currency of the engine.
//!
//! Documents are expected to be hand-written and loosely typed, so the
//! accessors on [`ParameterValue`] coerce instead of failing: every helper
//! documents the default it falls back to on a type mismatch.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// Field map of an object value. Key order carries no meaning.
pub type ValueMap = BTreeMap<String, ParameterValue>;

/// A JSON-like tagged value.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ParameterValue>),
    Object(ValueMap),
}

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn as_whole(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT).then_some(n as i64)
}

impl ParameterValue {
    /// An empty object.
    pub fn object() -> Self {
        Self::Object(ValueMap::new())
    }

    /// Parse JSON text into a value tree.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Parse TOML text into a value tree (the root is always a table).
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Compact JSON rendering of this value.
    pub fn to_json_string(&self) -> String {
        // Serializing a tree of plain values into a String cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// `false` only for `Null`.
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ParameterValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the string payload, `None` for every other variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Object field lookup. `None` for missing keys and non-objects.
    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Numeric view. Bool → 1/0, numeric strings are parsed, anything else is `0.0`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::String(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn as_f32(&self) -> f32 {
        self.as_f64() as f32
    }

    /// Integer view. Numbers truncate toward zero, strings parse as integer
    /// then as float, anything else is `0`.
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Number(n) if n.is_finite() => n.trunc() as i64,
            Self::Bool(b) => i64::from(*b),
            Self::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.trunc() as i64))
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn as_i32(&self) -> i32 {
        self.as_i64().clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }

    /// Boolean view. Numbers are true when non-zero, strings when `"true"` or
    /// `"1"` (case-insensitive), anything else is `false`.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => {
                let s = s.trim();
                s.eq_ignore_ascii_case("true") || s == "1"
            }
            _ => false,
        }
    }

    /// String view. Strings borrow, everything else renders (see [`fmt::Display`]).
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        match self {
            Self::String(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Read an object field as a trimmed, non-empty string.
    pub fn non_empty_str(&self, key: &str) -> Option<String> {
        let value = self.get(key)?.as_str_lossy();
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Insert a field, turning `self` into an object if it was not one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        if !self.is_object() {
            *self = Self::object();
        }
        if let Self::Object(map) = self {
            map.insert(key.into(), value.into());
        }
    }
}

/// Scalars render as their literal value (strings without quotes, null as
/// the empty string); arrays and objects render as compact JSON.
impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => match as_whole(*n) {
                Some(i) => write!(f, "{i}"),
                None => write!(f, "{n}"),
            },
            Self::String(s) => f.write_str(s),
            Self::Array(_) | Self::Object(_) => f.write_str(&self.to_json_string()),
        }
    }
}

/// Whole numbers are written as integers so `3` does not come back as `3.0`.
impl Serialize for ParameterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match as_whole(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => items.serialize(serializer),
            Self::Object(map) => map.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for ParameterValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for ParameterValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for ParameterValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for ParameterValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<ParameterValue>> for ParameterValue {
    fn from(items: Vec<ParameterValue>) -> Self {
        Self::Array(items)
    }
}

impl From<ValueMap> for ParameterValue {
    fn from(map: ValueMap) -> Self {
        Self::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_json_integers_as_numbers() {
        let v = ParameterValue::from_json_str(r#"{"a": 3, "b": [true, null, "x"]}"#).unwrap();
        assert_eq!(v.get("a"), Some(&ParameterValue::Number(3.0)));
        assert_eq!(
            v.get("b"),
            Some(&ParameterValue::Array(vec![
                ParameterValue::Bool(true),
                ParameterValue::Null,
                ParameterValue::from("x"),
            ]))
        );
    }

    #[test]
    fn json_text_keeps_whole_numbers_integral() {
        let v = ParameterValue::from(json!({"x": 1, "y": 2.5, "z": "s"}));
        assert_eq!(v.to_json_string(), r#"{"x":1,"y":2.5,"z":"s"}"#);
        assert_eq!(ParameterValue::from_json_str(&v.to_json_string()).unwrap(), v);
    }

    #[test]
    fn display_renders_scalars_literally() {
        assert_eq!(ParameterValue::from("Ada").to_string(), "Ada");
        assert_eq!(ParameterValue::Number(3.5).to_string(), "3.5");
        assert_eq!(ParameterValue::Number(3.0).to_string(), "3");
        assert_eq!(ParameterValue::Bool(true).to_string(), "true");
        assert_eq!(ParameterValue::Null.to_string(), "");
        assert_eq!(ParameterValue::from(json!([1, "a"])).to_string(), r#"[1,"a"]"#);
    }

    #[test]
    fn numeric_coercions_fall_back_to_zero() {
        assert_eq!(ParameterValue::from("2.5").as_f64(), 2.5);
        assert_eq!(ParameterValue::from("abc").as_f64(), 0.0);
        assert_eq!(ParameterValue::Bool(true).as_f64(), 1.0);
        assert_eq!(ParameterValue::object().as_f64(), 0.0);
        assert_eq!(ParameterValue::Number(-2.9).as_i64(), -2);
        assert_eq!(ParameterValue::from("7.8").as_i32(), 7);
        assert_eq!(ParameterValue::Null.as_i32(), 0);
    }

    #[test]
    fn bool_coercion_is_permissive() {
        assert!(ParameterValue::from("TRUE").as_bool());
        assert!(ParameterValue::from("1").as_bool());
        assert!(!ParameterValue::from("yes").as_bool());
        assert!(ParameterValue::Number(0.5).as_bool());
        assert!(!ParameterValue::Null.as_bool());
    }

    #[test]
    fn non_empty_str_trims_and_skips_blank() {
        let v = ParameterValue::from(json!({"a": "  id ", "b": "   ", "c": 4}));
        assert_eq!(v.non_empty_str("a").as_deref(), Some("id"));
        assert_eq!(v.non_empty_str("b"), None);
        assert_eq!(v.non_empty_str("c").as_deref(), Some("4"));
        assert_eq!(v.non_empty_str("missing"), None);
    }

    #[test]
    fn insert_promotes_to_object() {
        let mut v = ParameterValue::Null;
        v.insert("k", 1);
        assert_eq!(v, ParameterValue::from(json!({"k": 1})));
    }

    #[test]
    fn toml_documents_become_objects() {
        let v = ParameterValue::from_toml_str("speed = 3.5\nname = \"Ada\"\n").unwrap();
        assert_eq!(v.get("speed").map(ParameterValue::as_f64), Some(3.5));
        assert_eq!(v.get("name").and_then(ParameterValue::as_str), Some("Ada"));
    }
}
