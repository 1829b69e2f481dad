//! Single-path observation

use crate::error::ObserveError;
use lpc_document::{ConfigDocument, ConfigPath};

/// Compute the minimal patch that makes `path` hold `[desired]`
///
/// Returns an empty document when `existing` already holds exactly
/// `[desired]` at `path`. Values compare as exact strings, the same way the
/// revision matcher compares them. Otherwise the returned document contains
/// only `path -> [desired]`.
///
/// # Errors
/// Returns [`ObserveError::MalformedDocument`] when an intermediate node of
/// `path` is not an object or the leaf is not a sequence of strings.
pub fn observe(
    path: &ConfigPath,
    desired: &str,
    existing: &ConfigDocument,
) -> Result<ConfigDocument, ObserveError> {
    let malformed = |source| ObserveError::MalformedDocument {
        path: path.to_string(),
        source,
    };

    let current = existing.string_sequence(path).map_err(malformed)?;
    if let Some([only]) = current.as_deref() {
        if only == desired {
            return Ok(ConfigDocument::new());
        }
    }

    let mut patch = ConfigDocument::new();
    patch.set_string_sequence(path, &[desired]).map_err(malformed)?;
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> ConfigDocument {
        ConfigDocument::from_value(value).unwrap()
    }

    fn not_ready() -> ConfigPath {
        "apiServerArguments.default-not-ready-toleration-seconds"
            .parse()
            .unwrap()
    }

    #[test]
    fn absent_path_yields_patch() {
        let patch = observe(&not_ready(), "300", &ConfigDocument::new()).unwrap();
        assert_eq!(
            patch,
            doc(json!({"apiServerArguments": {"default-not-ready-toleration-seconds": ["300"]}}))
        );
    }

    #[test]
    fn equal_value_yields_empty_patch() {
        let existing = doc(json!({"apiServerArguments": {
            "default-not-ready-toleration-seconds": ["60"],
            "other": ["x"],
        }}));
        assert!(observe(&not_ready(), "60", &existing).unwrap().is_empty());
    }

    #[test]
    fn padded_value_is_rewritten() {
        let existing = doc(json!({"apiServerArguments": {
            "default-not-ready-toleration-seconds": [" 60 "],
        }}));
        assert_eq!(
            observe(&not_ready(), "60", &existing).unwrap(),
            doc(json!({"apiServerArguments": {"default-not-ready-toleration-seconds": ["60"]}}))
        );
    }

    #[test]
    fn different_value_patch_contains_only_path() {
        let existing = doc(json!({"apiServerArguments": {
            "default-not-ready-toleration-seconds": ["300"],
            "other": ["x"],
        }}));
        let patch = observe(&not_ready(), "60", &existing).unwrap();
        assert_eq!(
            patch,
            doc(json!({"apiServerArguments": {"default-not-ready-toleration-seconds": ["60"]}}))
        );
    }

    #[test]
    fn extra_elements_are_rewritten() {
        let existing = doc(json!({"apiServerArguments": {
            "default-not-ready-toleration-seconds": ["60", "60"],
        }}));
        assert!(!observe(&not_ready(), "60", &existing).unwrap().is_empty());
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let scalar_leaf = doc(json!({"apiServerArguments": {
            "default-not-ready-toleration-seconds": "60",
        }}));
        let scalar_parent = doc(json!({"apiServerArguments": 7}));

        for existing in [scalar_leaf, scalar_parent] {
            assert!(matches!(
                observe(&not_ready(), "60", &existing),
                Err(ObserveError::MalformedDocument { .. })
            ));
        }
    }

    proptest! {
        #[test]
        fn applying_the_patch_is_idempotent(
            desired in "[0-9]{1,4}",
            current in prop::option::of(prop::collection::vec("[0-9 ]{0,4}", 0..3)),
        ) {
            let path = not_ready();
            let mut existing = ConfigDocument::new();
            if let Some(values) = &current {
                existing.set_string_sequence(&path, values).unwrap();
            }

            let patch = observe(&path, &desired, &existing).unwrap();
            existing.merge(&patch);
            prop_assert!(observe(&path, &desired, &existing).unwrap().is_empty());
        }
    }
}
