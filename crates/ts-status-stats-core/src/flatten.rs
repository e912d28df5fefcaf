// Structural flattening of nested status documents
//
// Objects contribute `prefix{sep}key`, arrays contribute `prefix_index`.
// Leaves are written into a single ordered map in depth-first order; when two
// paths produce the same key the later leaf replaces the earlier value and the
// key keeps its original position. Column names in stored files depend on this
// exact behaviour, so colliding paths are never disambiguated.

use crate::record::{FlatRecord, Scalar, TIMESTAMP_KEY};
use chrono::{DateTime, Local, SecondsFormat, TimeZone};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt::Display;

/// Separator placed between an object key and its parent path.
pub const DEFAULT_SEPARATOR: char = '_';

/// Joiner between a parent path and an array index. Not configurable.
pub const INDEX_SEPARATOR: char = '_';

/// Converts status documents into timestamped [`FlatRecord`]s.
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    separator: char,
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl Flattener {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    /// Flatten `document` and stamp it with the current local time.
    pub fn flatten(&self, document: &JsonValue) -> FlatRecord {
        self.flatten_at(document, Local::now())
    }

    /// Flatten `document` and stamp it with `captured_at`.
    ///
    /// The timestamp is written last, so a document key that flattens to
    /// `_timestamp` is replaced by the capture time.
    pub fn flatten_at<Tz>(&self, document: &JsonValue, captured_at: DateTime<Tz>) -> FlatRecord
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut fields = flatten_value(document, "", self.separator);
        fields.insert(
            TIMESTAMP_KEY.to_string(),
            Scalar::String(captured_at.to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
        FlatRecord::from_fields(fields)
    }
}

/// Flatten a JSON value into an ordered key/scalar map without a timestamp.
///
/// A scalar passed directly yields a single entry keyed by `prefix`, which may
/// be empty.
pub fn flatten_value(value: &JsonValue, prefix: &str, separator: char) -> IndexMap<String, Scalar> {
    let mut out = IndexMap::new();
    flatten_into(value, prefix, separator, &mut out);
    out
}

fn flatten_into(
    value: &JsonValue,
    prefix: &str,
    separator: char,
    out: &mut IndexMap<String, Scalar>,
) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                let child_key = join(prefix, separator, key);
                flatten_child(child, child_key, separator, out);
            }
        }
        JsonValue::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let child_key = join(prefix, INDEX_SEPARATOR, &index.to_string());
                flatten_child(child, child_key, separator, out);
            }
        }
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
            if let Some(scalar) = Scalar::from_json(value) {
                out.insert(prefix.to_string(), scalar);
            }
        }
    }
}

fn flatten_child(
    child: &JsonValue,
    child_key: String,
    separator: char,
    out: &mut IndexMap<String, Scalar>,
) {
    match Scalar::from_json(child) {
        Some(scalar) => {
            out.insert(child_key, scalar);
        }
        None => flatten_into(child, &child_key, separator, out),
    }
}

fn join(prefix: &str, separator: char, segment: &str) -> String {
    if prefix.is_empty() {
        return segment.to_string();
    }
    let mut key = String::with_capacity(prefix.len() + 1 + segment.len());
    key.push_str(prefix);
    key.push(separator);
    key.push_str(segment);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;

    #[test]
    fn test_nested_objects() {
        let doc = json!({
            "level1": {"level2": {"level3": "value"}, "another": "data"},
            "simple": "value",
        });

        let flat = flatten_value(&doc, "", '_');

        assert_eq!(flat["level1_level2_level3"], Scalar::from("value"));
        assert_eq!(flat["level1_another"], Scalar::from("data"));
        assert_eq!(flat["simple"], Scalar::from("value"));
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn test_lists_use_underscore_index() {
        let doc = json!({"items": ["a", "b", "c"], "nested": {"list": [1, 2, 3]}});

        let flat = flatten_value(&doc, "", '_');

        assert_eq!(flat["items_0"], Scalar::from("a"));
        assert_eq!(flat["items_1"], Scalar::from("b"));
        assert_eq!(flat["items_2"], Scalar::from("c"));
        assert_eq!(flat["nested_list_2"], Scalar::Int(3));
    }

    #[test]
    fn test_custom_separator_does_not_apply_to_indices() {
        let doc = json!({"Self": {"Addrs": ["a", "b"]}});

        let flat = flatten_value(&doc, "", '.');

        assert_eq!(flat["Self.Addrs_0"], Scalar::from("a"));
        assert_eq!(flat["Self.Addrs_1"], Scalar::from("b"));
    }

    #[test]
    fn test_top_level_array() {
        let doc = json!([{"a": 1}, [true, null]]);

        let flat = flatten_value(&doc, "", '_');

        assert_eq!(
            flat.keys().collect::<Vec<_>>(),
            vec!["0_a", "1_0", "1_1"]
        );
        assert_eq!(flat["1_0"], Scalar::Bool(true));
        assert_eq!(flat["1_1"], Scalar::Null);
    }

    #[test]
    fn test_top_level_scalar_uses_prefix() {
        assert_eq!(
            flatten_value(&json!(5), "", '_').into_iter().collect::<Vec<_>>(),
            vec![(String::new(), Scalar::Int(5))]
        );
        assert_eq!(
            flatten_value(&json!("up"), "state", '_')
                .into_iter()
                .collect::<Vec<_>>(),
            vec![("state".to_string(), Scalar::from("up"))]
        );
    }

    #[test]
    fn test_empty_containers_produce_nothing() {
        let doc = json!({"Peer": {}, "TailscaleIPs": [], "Version": "1.54.0"});

        let flat = flatten_value(&doc, "", '_');

        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["Version"]);
    }

    #[test]
    fn test_timestamp_is_added_last_and_wins() {
        let doc = json!({"_timestamp": "from-document", "a": 1});
        let at = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 14, 9, 26, 53)
            .unwrap();

        let record = Flattener::default().flatten_at(&doc, at);

        assert_eq!(record.timestamp(), Some("2025-03-14T09:26:53.000000+01:00"));
        assert_eq!(record.len(), 2);
    }
}
