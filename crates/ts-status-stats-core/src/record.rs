// Flat record and scalar leaf types
//
// A FlatRecord keeps the insertion order of its keys so that column order in
// the stored files follows the order in which the flattener visited leaves.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use serde_json::{Number, Value as JsonValue};
use std::fmt;

/// Reserved key holding the capture instant of a record.
pub const TIMESTAMP_KEY: &str = "_timestamp";

/// Leaf value of a flattened document.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON number, preferring an exact integer representation.
    pub(crate) fn from_number(n: &Number) -> Self {
        match n.as_i64() {
            Some(v) => Scalar::Int(v),
            // u64 beyond i64::MAX and all non-integers
            None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
        }
    }

    /// Convert a JSON leaf. Returns `None` for objects and arrays.
    pub(crate) fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => Some(Scalar::Null),
            JsonValue::Bool(b) => Some(Scalar::Bool(*b)),
            JsonValue::Number(n) => Some(Scalar::from_number(n)),
            JsonValue::String(s) => Some(Scalar::String(s.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Int(v) => write!(f, "{}", v),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// One flattened, timestamped observation.
///
/// Records are built by [`crate::Flattener`] and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatRecord {
    fields: IndexMap<String, Scalar>,
}

impl FlatRecord {
    pub(crate) fn from_fields(fields: IndexMap<String, Scalar>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keys in first-visit order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Raw capture timestamp string, if present.
    pub fn timestamp(&self) -> Option<&str> {
        self.get(TIMESTAMP_KEY).and_then(Scalar::as_str)
    }

    /// Parsed capture timestamp.
    pub fn captured_at(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamp()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
    }
}

impl<'a> IntoIterator for &'a FlatRecord {
    type Item = (&'a String, &'a Scalar);
    type IntoIter = indexmap::map::Iter<'a, String, Scalar>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_from_json() {
        assert_eq!(Scalar::from_json(&json!(null)), Some(Scalar::Null));
        assert_eq!(Scalar::from_json(&json!(true)), Some(Scalar::Bool(true)));
        assert_eq!(Scalar::from_json(&json!(42)), Some(Scalar::Int(42)));
        assert_eq!(Scalar::from_json(&json!(-7)), Some(Scalar::Int(-7)));
        assert_eq!(Scalar::from_json(&json!(1.5)), Some(Scalar::Float(1.5)));
        assert_eq!(
            Scalar::from_json(&json!("x")),
            Some(Scalar::String("x".to_string()))
        );
        assert_eq!(Scalar::from_json(&json!([1])), None);
        assert_eq!(Scalar::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_large_unsigned_becomes_float() {
        let value = json!(u64::MAX);
        assert_eq!(
            Scalar::from_json(&value),
            Some(Scalar::Float(u64::MAX as f64))
        );
    }

    #[test]
    fn test_record_keeps_insertion_order() {
        let mut fields = IndexMap::new();
        fields.insert("z".to_string(), Scalar::Int(1));
        fields.insert("a".to_string(), Scalar::Int(2));
        let record = FlatRecord::from_fields(fields);

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(record.len(), 2);
        assert!(record.timestamp().is_none());
    }
}
