//! Nested configuration documents
//!
//! [`ConfigDocument`] is an object-rooted JSON tree. Reads are path based and
//! report shape problems instead of guessing; writes create intermediate
//! objects as needed.

use crate::path::ConfigPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrarily nested key/value configuration tree
///
/// The root is always an object. An empty document is the "no change"
/// signal produced by config observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create document from a JSON value
    ///
    /// # Errors
    /// Returns [`DocumentError::RootNotObject`] unless `value` is an object.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(DocumentError::RootNotObject {
                found: type_name(&other),
            }),
        }
    }

    /// Parse document from JSON text
    ///
    /// # Errors
    /// Returns [`DocumentError::Json`] on invalid JSON and
    /// [`DocumentError::RootNotObject`] if the top level is not an object.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Serialize document to compact JSON
    #[must_use]
    pub fn to_json(&self) -> String {
        Value::Object(self.root.clone()).to_string()
    }

    /// Convert into a JSON value
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    /// Check if the document has no keys
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Get value at path
    ///
    /// Returns `Ok(None)` when any segment is absent.
    ///
    /// # Errors
    /// Returns [`DocumentError::NotAnObject`] when an intermediate value on
    /// the path exists but is not an object.
    pub fn get(&self, path: &ConfigPath) -> Result<Option<&Value>, DocumentError> {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return Err(DocumentError::EmptyPath);
        };

        let mut current = &self.root;
        for (depth, segment) in parents.iter().enumerate() {
            match current.get(segment) {
                None => return Ok(None),
                Some(Value::Object(map)) => current = map,
                Some(other) => {
                    return Err(DocumentError::NotAnObject {
                        path: path.prefix(depth + 1).to_string(),
                        found: type_name(other),
                    })
                }
            }
        }
        Ok(current.get(leaf))
    }

    /// Read the ordered string sequence stored at path
    ///
    /// `null` is treated as absent.
    ///
    /// # Errors
    /// Returns [`DocumentError::UnexpectedType`] when the leaf is not an
    /// array of strings, and propagates [`Self::get`] errors.
    pub fn string_sequence(&self, path: &ConfigPath) -> Result<Option<Vec<String>>, DocumentError> {
        match self.get(path)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(DocumentError::UnexpectedType {
                        path: path.to_string(),
                        expected: "string sequence element",
                        found: type_name(other),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(other) => Err(DocumentError::UnexpectedType {
                path: path.to_string(),
                expected: "string sequence",
                found: type_name(other),
            }),
        }
    }

    /// Set value at path
    ///
    /// Creates intermediate objects as needed.
    ///
    /// # Errors
    /// Returns [`DocumentError::NotAnObject`] if an existing intermediate
    /// value is not an object; the document is left untouched in that case.
    pub fn set(&mut self, path: &ConfigPath, value: Value) -> Result<(), DocumentError> {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return Err(DocumentError::EmptyPath);
        };

        let mut current = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                other => {
                    return Err(DocumentError::NotAnObject {
                        path: path.prefix(depth + 1).to_string(),
                        found: type_name(other),
                    })
                }
            };
        }
        current.insert(leaf.clone(), value);
        Ok(())
    }

    /// Set an ordered string sequence at path
    ///
    /// # Errors
    /// See [`Self::set`].
    pub fn set_string_sequence<S: AsRef<str>>(
        &mut self,
        path: &ConfigPath,
        values: &[S],
    ) -> Result<(), DocumentError> {
        let array = values
            .iter()
            .map(|v| Value::String(v.as_ref().to_string()))
            .collect();
        self.set(path, Value::Array(array))
    }

    /// Copy of this document keeping only the given paths
    ///
    /// Paths that are absent, or that cross a non-object value, contribute
    /// nothing.
    #[must_use]
    pub fn pruned(&self, paths: &[ConfigPath]) -> Self {
        let mut out = Self::new();
        for path in paths {
            if let Ok(Some(value)) = self.get(path) {
                let branch = path.segments().iter().rev().fold(value.clone(), |inner, segment| {
                    let mut level = Map::new();
                    level.insert(segment.clone(), inner);
                    Value::Object(level)
                });
                if let Value::Object(branch) = branch {
                    merge_maps(&mut out.root, &branch);
                }
            }
        }
        out
    }

    /// Deep-merge `other` into this document
    ///
    /// Objects merge key by key; any other value in `other` replaces the
    /// value in `self`.
    pub fn merge(&mut self, other: &ConfigDocument) {
        merge_maps(&mut self.root, &other.root);
    }
}

fn merge_maps(into: &mut Map<String, Value>, from: &Map<String, Value>) {
    for (key, incoming) in from {
        match (into.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge_maps(existing, nested),
            _ => {
                into.insert(key.clone(), incoming.clone());
            }
        }
    }
}

/// Human-readable JSON type name
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Errors reading or writing documents
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Path has no segments
    #[error("empty path does not address a value")]
    EmptyPath,

    /// Document root is not an object
    #[error("document root must be an object, found {found}")]
    RootNotObject { found: &'static str },

    /// Intermediate value is not an object
    #[error("expected object at '{path}', found {found}")]
    NotAnObject { path: String, found: &'static str },

    /// Leaf value has the wrong type
    #[error("expected {expected} at '{path}', found {found}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Invalid JSON text
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn path(s: &str) -> ConfigPath {
        s.parse().unwrap()
    }

    fn doc(value: Value) -> ConfigDocument {
        ConfigDocument::from_value(value).unwrap()
    }

    #[test]
    fn get_nested_value() {
        let d = doc(json!({"server": {"host": "localhost", "port": 8080}}));
        assert_eq!(d.get(&path("server.host")).unwrap(), Some(&json!("localhost")));
        assert_eq!(d.get(&path("server.missing")).unwrap(), None);
        assert_eq!(d.get(&path("missing.host")).unwrap(), None);
    }

    #[test]
    fn get_through_scalar_is_error() {
        let d = doc(json!({"server": "oops"}));
        let err = d.get(&path("server.host")).unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject { ref path, .. } if path == "server"));
    }

    #[test]
    fn root_must_be_object() {
        assert!(matches!(
            ConfigDocument::from_value(json!([1, 2])),
            Err(DocumentError::RootNotObject { found: "array" })
        ));
        assert!(matches!(
            ConfigDocument::from_json("{not json"),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn string_sequence_reads() {
        let d = doc(json!({"args": {"a": ["1", "2"], "b": [], "c": null, "d": "x", "e": [1]}}));
        assert_eq!(
            d.string_sequence(&path("args.a")).unwrap(),
            Some(vec!["1".to_string(), "2".to_string()])
        );
        assert_eq!(d.string_sequence(&path("args.b")).unwrap(), Some(vec![]));
        assert_eq!(d.string_sequence(&path("args.c")).unwrap(), None);
        assert_eq!(d.string_sequence(&path("args.missing")).unwrap(), None);
        assert!(d.string_sequence(&path("args.d")).is_err());
        assert!(d.string_sequence(&path("args.e")).is_err());
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut d = ConfigDocument::new();
        d.set_string_sequence(&path("apiServerArguments.flag"), &["60"])
            .unwrap();
        assert_eq!(d.into_value(), json!({"apiServerArguments": {"flag": ["60"]}}));
    }

    #[test]
    fn set_refuses_to_overwrite_scalar_parent() {
        let mut d = doc(json!({"apiServerArguments": "legacy"}));
        let before = d.clone();
        assert!(d.set(&path("apiServerArguments.flag"), json!(["1"])).is_err());
        assert_eq!(d, before);
    }

    #[test]
    fn empty_path_is_rejected() {
        let mut d = ConfigDocument::new();
        assert!(matches!(d.get(&ConfigPath::new(vec![])), Err(DocumentError::EmptyPath)));
        assert!(matches!(
            d.set(&ConfigPath::new(vec![]), json!(1)),
            Err(DocumentError::EmptyPath)
        ));
    }

    #[test]
    fn pruned_keeps_only_requested_paths() {
        let d = doc(json!({
            "apiServerArguments": {"a": ["1"], "b": ["2"], "c": ["3"]},
            "servingInfo": {"bindAddress": "0.0.0.0:6443"}
        }));
        let pruned = d.pruned(&[path("apiServerArguments.a"), path("apiServerArguments.c"), path("nope.x")]);
        assert_eq!(
            pruned.into_value(),
            json!({"apiServerArguments": {"a": ["1"], "c": ["3"]}})
        );
    }

    #[test]
    fn pruned_keeps_nested_and_overlapping_paths() {
        let d = doc(json!({"a": {"b": {"c": ["1"], "d": ["2"]}, "e": 3}}));
        let pruned = d.pruned(&[path("a.b.c"), path("a.b"), path("a.e.f")]);
        assert_eq!(pruned.into_value(), json!({"a": {"b": {"c": ["1"], "d": ["2"]}}}));
    }

    #[test]
    fn merge_is_deep_and_right_biased() {
        let mut base = doc(json!({"apiServerArguments": {"a": ["1"], "b": ["2"]}, "keep": true}));
        let patch = doc(json!({"apiServerArguments": {"b": ["20"], "c": ["30"]}}));
        base.merge(&patch);
        assert_eq!(
            base.into_value(),
            json!({"apiServerArguments": {"a": ["1"], "b": ["20"], "c": ["30"]}, "keep": true})
        );
    }

    #[test]
    fn json_roundtrip_through_serde() {
        let d = doc(json!({"a": {"b": ["1"]}}));
        let text = d.to_json();
        assert_eq!(ConfigDocument::from_json(&text).unwrap(), d);
        let via_serde: ConfigDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(via_serde, d);
    }
}
