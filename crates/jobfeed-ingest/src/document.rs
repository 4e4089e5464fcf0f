//! Raw posting documents and nested field lookup
//!
//! Upstream postings have no fixed shape. Every lookup goes through
//! [`resolve`], which walks a key path and yields `None` as soon as a key is
//! missing or the current value cannot be indexed.

use serde_json::Value;

use crate::error::{IngestError, Result};

/// A posting exactly as returned by the upstream API
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Identifier the document was fetched under
    pub external_id: String,
    /// Parsed JSON body
    pub body: Value,
}

impl RawDocument {
    pub fn new(external_id: impl Into<String>, body: Value) -> Self {
        Self {
            external_id: external_id.into(),
            body,
        }
    }

    /// Parse raw response text into a document
    ///
    /// Text that is not valid JSON is a hard failure for this one record.
    pub fn parse(external_id: impl Into<String>, text: &str) -> Result<Self> {
        let external_id = external_id.into();
        let body = serde_json::from_str(text).map_err(|source| IngestError::InvalidDocument {
            external_id: external_id.clone(),
            source,
        })?;
        Ok(Self { external_id, body })
    }

    /// Resolve a nested path inside the body
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        resolve(&self.body, path)
    }

    pub fn str_at(&self, path: &[&str]) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn f64_at(&self, path: &[&str]) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    pub fn array_at(&self, path: &[&str]) -> Option<&Vec<Value>> {
        self.get(path).and_then(Value::as_array)
    }
}

/// Walk `path` from `value`, returning `None` instead of failing
///
/// Objects are indexed by key. Arrays are indexed when the segment parses as
/// a position, so `["places", "0", "city"]` reaches into the first place.
/// An explicit JSON `null` at the end of the path counts as absent.
pub fn resolve<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let (head, rest) = match path.split_first() {
        Some(split) => split,
        None => return Some(value).filter(|v| !v.is_null()),
    };

    let next = match value {
        Value::Object(map) => map.get(*head)?,
        Value::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };

    resolve(next, rest)
}

/// Render a path the way diagnostics report it (`essentials.originalSalary`)
pub fn display_path(path: &[&str]) -> String {
    path.join(".")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "age": 67,
            "name": { "first": "Adam", "last": "Smith" },
            "places": [ { "city": "Remote" }, { "city": "Gdansk" } ],
            "nothing": null
        })
    }

    #[test]
    fn test_resolve_nested_key() {
        let doc = sample();
        assert_eq!(resolve(&doc, &["name", "first"]), Some(&json!("Adam")));
        assert_eq!(resolve(&doc, &["age"]), Some(&json!(67)));
    }

    #[test]
    fn test_resolve_missing_key_is_absent() {
        let doc = sample();
        assert_eq!(resolve(&doc, &["nationality"]), None);
        assert_eq!(resolve(&doc, &["name", "middle"]), None);
    }

    #[test]
    fn test_resolve_through_scalar_is_absent() {
        let doc = sample();
        assert_eq!(resolve(&doc, &["age", "years"]), None);
        assert_eq!(resolve(&doc, &["name", "first", "initial"]), None);
    }

    #[test]
    fn test_resolve_array_index() {
        let doc = sample();
        assert_eq!(resolve(&doc, &["places", "1", "city"]), Some(&json!("Gdansk")));
        assert_eq!(resolve(&doc, &["places", "7", "city"]), None);
        assert_eq!(resolve(&doc, &["places", "first"]), None);
    }

    #[test]
    fn test_resolve_null_is_absent() {
        let doc = sample();
        assert_eq!(resolve(&doc, &["nothing"]), None);
    }

    #[test]
    fn test_empty_path_returns_root() {
        let doc = sample();
        assert_eq!(resolve(&doc, &[]), Some(&doc));
    }

    #[test]
    fn test_typed_accessors_reject_wrong_types() {
        let doc = RawDocument::new("abc", sample());
        assert_eq!(doc.str_at(&["name", "first"]), Some("Adam"));
        assert_eq!(doc.str_at(&["age"]), None);
        assert_eq!(doc.f64_at(&["age"]), Some(67.0));
        assert!(doc.array_at(&["name"]).is_none());
        assert_eq!(doc.array_at(&["places"]).map(Vec::len), Some(2));
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        let err = RawDocument::parse("bad1", "{not json").unwrap_err();
        assert!(matches!(err, IngestError::InvalidDocument { ref external_id, .. } if external_id == "bad1"));
    }
}
