//! Dynamic values for documents, bind parameters and expression results
//!
//! `Value` is the single runtime representation shared by stored documents,
//! query literals and evaluation results.
//!
//! # Ordering
//!
//! Values of different types are ordered by type rank:
//!
//! | Rank | Type |
//! |------|------|
//! | 0 | null |
//! | 1 | bool |
//! | 2 | number (`Int` and `Float` compare numerically) |
//! | 3 | string |
//! | 4 | array |
//! | 5 | object |
//!
//! Equality is defined through the same ordering, so `Int(1) == Float(1.0)`.
//!
//! # Thread Safety
//!
//! Strings use `Arc<str>`; values are `Send + Sync` and cheap to clone for
//! scalar variants, which lets traversals for different start vertices run
//! in parallel.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Shared string type - O(1) clones across rows and threads
pub type SharedStr = Arc<str>;

/// A document attribute, bind parameter or expression result
///
/// Serializes as plain JSON (`null`, `true`, `1`, `"s"`, `[..]`, `{..}`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    /// Null / missing value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point (always finite)
    Float(f64),

    /// String value
    String(SharedStr),

    /// Ordered list of values
    Array(Vec<Value>),

    /// Key-value pairs in insertion order
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Create a string value
    pub fn string(value: impl AsRef<str>) -> Self {
        Self::String(SharedStr::from(value.as_ref()))
    }

    /// Create an array from an iterator
    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(values.into_iter().collect())
    }

    /// Create an object from key-value pairs
    pub fn object(pairs: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Self {
        Self::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Create a float, mapping non-finite results to null
    pub fn float(value: f64) -> Self {
        if value.is_finite() {
            Self::Float(value)
        } else {
            Self::Null
        }
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truthiness: null, false, 0 and "" are false; arrays and objects are
    /// always true, even when empty
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::Float(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
            Self::Array(_) => 4,
            Self::Object(_) => 5,
        }
    }

    /// Try to convert to i64 (floats are truncated)
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// Try to convert to f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as array slice
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up an attribute of an object value
    ///
    /// Returns `None` for missing attributes and for non-object values.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Numeric conversion used by arithmetic and `TO_NUMBER()`
    ///
    /// null → 0, bool → 0/1, numeric strings parse, other strings → 0,
    /// `[]` → 0, `[x]` → number of x, longer arrays and objects → 0.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
            Self::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => 0.0,
            },
            Self::Object(_) => 0.0,
        }
    }

    /// String conversion used by `TO_STRING()` and `CONCAT()`
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::String(s) => s.to_string(),
            Self::Array(_) | Self::Object(_) => serde_json::Value::from(self.clone()).to_string(),
        }
    }

    /// Total ordering across all value types
    pub fn compare(&self, other: &Value) -> Ordering {
        let (lr, rr) = (self.type_rank(), other.type_rank());
        if lr != rr {
            return lr.cmp(&rr);
        }

        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (a @ (Self::Int(_) | Self::Float(_)), b @ (Self::Int(_) | Self::Float(_))) => {
                let (a, b) = (a.as_float().unwrap_or(0.0), b.as_float().unwrap_or(0.0));
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => {
                let len = a.len().max(b.len());
                for i in 0..len {
                    let left = a.get(i).unwrap_or(&Value::Null);
                    let right = b.get(i).unwrap_or(&Value::Null);
                    match left.compare(right) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                Ordering::Equal
            }
            (Self::Object(a), Self::Object(b)) => compare_objects(a, b),
            // Type ranks are equal above, so mixed variants are unreachable.
            _ => Ordering::Equal,
        }
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

/// Objects compare by their sorted key sets first, then by values in key order
fn compare_objects(a: &[(String, Value)], b: &[(String, Value)]) -> Ordering {
    let mut left_keys: Vec<&str> = a.iter().map(|(k, _)| k.as_str()).collect();
    let mut right_keys: Vec<&str> = b.iter().map(|(k, _)| k.as_str()).collect();
    left_keys.sort_unstable();
    right_keys.sort_unstable();

    match left_keys.cmp(&right_keys) {
        Ordering::Equal => {}
        other => return other,
    }

    for key in left_keys {
        let left = a.iter().find(|(k, _)| k == key).map(|(_, v)| v);
        let right = b.iter().find(|(k, _)| k == key).map(|(_, v)| v);
        match (left, right) {
            (Some(l), Some(r)) => match l.compare(r) {
                Ordering::Equal => continue,
                other => return other,
            },
            _ => continue,
        }
    }
    Ordering::Equal
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

// Conversion from common types

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Self::Int(i),
            Err(_) => Self::float(value as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(SharedStr::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(SharedStr::from(value))
    }
}

impl From<SharedStr> for Value {
    fn from(value: SharedStr) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    n.as_f64().map(Self::float).unwrap_or(Self::Null)
                }
            }
            serde_json::Value::String(s) => Self::from(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Object(pairs) => serde_json::Value::Object(
                pairs.into_iter().map(|(k, v)| (k, v.into())).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Bool(true).type_name(), "bool");
        assert_eq!(Value::Int(42).type_name(), "number");
        assert_eq!(Value::Float(1.5).type_name(), "number");
        assert_eq!(Value::string("x").type_name(), "string");
        assert_eq!(Value::array([]).type_name(), "array");
        assert_eq!(Value::Object(Vec::new()).type_name(), "object");
    }

    #[test]
    fn test_value_truthy() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::string("x").is_truthy());
        assert!(Value::array([]).is_truthy());
        assert!(Value::Object(Vec::new()).is_truthy());
    }

    #[test]
    fn test_type_rank_ordering() {
        let ordered = [
            Value::Null,
            Value::Bool(false),
            Value::Bool(true),
            Value::Int(-5),
            Value::Float(0.5),
            Value::Int(3),
            Value::string("a"),
            Value::string("b"),
            Value::array([]),
            Value::array([Value::Int(1)]),
            Value::object([("a", Value::Int(1))]),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(pair[0].compare(&pair[1]), Ordering::Less, "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_numeric_equality_across_variants() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::string("1"));
        assert_ne!(Value::Null, Value::Bool(false));
    }

    #[test]
    fn test_array_compare_pads_with_null() {
        let short = Value::array([Value::Int(1)]);
        let long = Value::array([Value::Int(1), Value::Null]);
        assert_eq!(short.compare(&long), Ordering::Equal);

        let longer = Value::array([Value::Int(1), Value::Int(0)]);
        assert_eq!(short.compare(&longer), Ordering::Less);
    }

    #[test]
    fn test_object_compare_ignores_key_order() {
        let a = Value::object([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = Value::object([("y", Value::Int(2)), ("x", Value::Int(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::Null.to_number(), 0.0);
        assert_eq!(Value::Bool(true).to_number(), 1.0);
        assert_eq!(Value::string(" 12.5 ").to_number(), 12.5);
        assert_eq!(Value::string("abc").to_number(), 0.0);
        assert_eq!(Value::array([Value::Int(7)]).to_number(), 7.0);
        assert_eq!(Value::array([Value::Int(7), Value::Int(8)]).to_number(), 0.0);
    }

    #[test]
    fn test_display_string() {
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Float(2.0).to_display_string(), "2");
        assert_eq!(Value::Float(2.5).to_display_string(), "2.5");
        assert_eq!(Value::array([Value::Int(1)]).to_display_string(), "[1]");
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({"_key": "A", "foo": true, "n": 3, "f": 1.5, "tags": ["x", null]});
        let value = Value::from(json.clone());
        assert_eq!(value.get("_key"), Some(&Value::string("A")));
        assert_eq!(value.get("n"), Some(&Value::Int(3)));
        assert_eq!(value.get("missing"), None);

        let back: serde_json::Value = value.into();
        assert_eq!(back, json);
    }

    #[test]
    fn test_serde_is_plain_json() {
        let value = Value::object([("a", Value::array([Value::Int(1), Value::Bool(false)]))]);
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"a":[1,false]}"#);

        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_float_non_finite_is_null() {
        assert!(Value::float(f64::INFINITY).is_null());
        assert!(Value::from(f64::NAN).is_null());
    }
}
