//! Deep merging of configuration overlays.
//!
//! The base image descriptor is replaced as a whole by the more specific
//! overlay. Named values merge key by key: mappings on both sides merge
//! recursively, anything else is overwritten by the overlay.

use std::collections::BTreeMap;

use serde_yaml::Value;

use crate::model::ImageConfig;

/// Merges `overlay` over `defaults` into a fresh configuration.
///
/// Either side may be absent. The result owns all of its data, so later
/// changes to either input never show up in it.
#[must_use]
pub fn merge(overlay: Option<&ImageConfig>, defaults: Option<&ImageConfig>) -> ImageConfig {
    match (overlay, defaults) {
        (None, None) => ImageConfig::default(),
        (None, Some(defaults)) => defaults.clone(),
        (Some(overlay), None) => overlay.clone(),
        (Some(overlay), Some(defaults)) => {
            let mut values = defaults.values.clone();
            merge_values(&mut values, &overlay.values);
            ImageConfig {
                base_image: overlay
                    .base_image
                    .as_ref()
                    .or(defaults.base_image.as_ref())
                    .cloned(),
                values,
            }
        }
    }
}

fn merge_values(dest: &mut BTreeMap<String, Value>, source: &BTreeMap<String, Value>) {
    for (key, value) in source {
        match dest.get_mut(key) {
            Some(existing) => merge_value(existing, value),
            None => {
                let _ = dest.insert(key.clone(), value.clone());
            }
        }
    }
}

fn merge_value(dest: &mut Value, source: &Value) {
    match (dest, source) {
        (Value::Mapping(dest), Value::Mapping(source)) => {
            for (key, value) in source {
                match dest.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        let _ = dest.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (dest, source) => *dest = source.clone(),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::model::BaseImage;

    fn config(yaml: &str) -> ImageConfig {
        serde_yaml::from_str(yaml).expect("valid overlay")
    }

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).expect("valid value")
    }

    #[test]
    fn overlay_base_image_wins_and_values_combine() {
        let overlay = config("base_image: {name: ubuntu, source: docker.io}\nkey1: value1\n");
        let defaults = config("base_image: {name: alpine, source: default.io}\nkey2: value2\n");

        let merged = merge(Some(&overlay), Some(&defaults));
        assert_eq!(
            merged.base_image,
            Some(BaseImage {
                name: "ubuntu".into(),
                source: Some("docker.io".into()),
            })
        );
        assert_eq!(merged.values.get("key1"), Some(&Value::from("value1")));
        assert_eq!(merged.values.get("key2"), Some(&Value::from("value2")));
    }

    #[test]
    fn base_image_is_never_field_merged() {
        let overlay = config("base_image: {name: ubuntu}\n");
        let defaults = config("base_image: {name: alpine, source: dockerhub}\n");

        let merged = merge(Some(&overlay), Some(&defaults));
        assert_eq!(merged.base_image, Some(BaseImage::new("ubuntu")));
    }

    #[test]
    fn missing_overlay_base_image_falls_back_to_defaults() {
        let overlay = config("key1: value1\n");
        let defaults = config("base_image: {name: alpine}\nkey2: value2\n");

        let merged = merge(Some(&overlay), Some(&defaults));
        assert_eq!(merged.base_image, Some(BaseImage::new("alpine")));
        assert_eq!(merged.values.len(), 2);
    }

    #[test]
    fn nested_mappings_merge_recursively() {
        let overlay = config("nested: {a: 1, b: 2}\n");
        let defaults = config("nested: {a: 0, c: 3}\n");

        let merged = merge(Some(&overlay), Some(&defaults));
        assert_eq!(merged.values.get("nested"), Some(&value("{a: 1, b: 2, c: 3}")));
    }

    #[test]
    fn deeply_nested_mappings_merge() {
        let overlay = config("outer: {inner: {x: new}}\n");
        let defaults = config("outer: {inner: {x: old, y: kept}, other: 1}\n");

        let merged = merge(Some(&overlay), Some(&defaults));
        assert_eq!(
            merged.values.get("outer"),
            Some(&value("{inner: {x: new, y: kept}, other: 1}"))
        );
    }

    #[test]
    fn non_mapping_overwrites_mapping_and_sequences_replace() {
        let overlay = config("nested: scalar\nlist: [3]\n");
        let defaults = config("nested: {a: 0}\nlist: [1, 2]\n");

        let merged = merge(Some(&overlay), Some(&defaults));
        assert_eq!(merged.values.get("nested"), Some(&Value::from("scalar")));
        assert_eq!(merged.values.get("list"), Some(&value("[3]")));
    }

    #[test]
    fn absent_defaults_is_identity() {
        let overlay = config("base_image: {name: ubuntu}\nkey: value\n");
        assert_eq!(merge(Some(&overlay), None), overlay);
    }

    #[test]
    fn absent_overlay_is_identity() {
        let defaults = config("base_image: {name: alpine}\nkey: value\n");
        assert_eq!(merge(None, Some(&defaults)), defaults);
    }

    #[test]
    fn both_absent_is_empty() {
        assert_eq!(merge(None, None), ImageConfig::default());
    }

    #[test]
    fn inputs_mutated_after_merge_do_not_affect_result() {
        let mut overlay = config("nested: {a: 1}\n");
        let mut defaults = config("nested: {b: 2}\nlist: [1]\n");

        let merged = merge(Some(&overlay), Some(&defaults));
        let snapshot = merged.clone();

        let _ = overlay.values.insert("test_key".into(), Value::from("x"));
        if let Some(Value::Mapping(nested)) = defaults.values.get_mut("nested") {
            let _ = nested.insert(Value::from("c"), Value::from(3));
        }
        if let Some(Value::Sequence(list)) = defaults.values.get_mut("list") {
            list.push(Value::from(2));
        }

        assert_eq!(merged, snapshot);
        assert!(!merged.values.contains_key("test_key"));
    }

    #[test]
    fn result_mutated_after_merge_does_not_affect_inputs() {
        let defaults = config("nested: {b: 2}\n");
        let before = defaults.clone();

        let mut merged = merge(None, Some(&defaults));
        if let Some(Value::Mapping(nested)) = merged.values.get_mut("nested") {
            let _ = nested.insert(Value::from("new_nested"), Value::from("value"));
        }

        assert_eq!(defaults, before);
    }
}
