//! Per-render state for one image version.
//!
//! A context is created for each (image, version) pair, shared by every
//! template of that version, and dropped once its files are written.

use std::collections::BTreeMap;

use imagesmith_common::constants::{APP_NAME, BASE_IMAGE_KEY, IMAGE_NAME_KEY};
use imagesmith_manifest::{BaseImage, ImageConfig};
use serde_yaml::{Mapping, Value};

/// Values and resolver state for rendering one image version.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub(crate) values: BTreeMap<String, Value>,
    image_name: String,
    header: String,
    pub(crate) registry_declared: bool,
}

impl RenderContext {
    /// Creates a fresh context from a resolved configuration.
    ///
    /// The base image descriptor is exposed as the `base_image` value and
    /// the image name as `image_name`.
    #[must_use]
    pub fn new(config: ImageConfig, image_name: &str) -> Self {
        let ImageConfig {
            base_image,
            mut values,
        } = config;

        if let Some(base_image) = base_image {
            let _ = values.insert(BASE_IMAGE_KEY.to_owned(), descriptor_value(&base_image));
        }
        let _ = values.insert(
            IMAGE_NAME_KEY.to_owned(),
            Value::String(image_name.to_owned()),
        );

        Self {
            values,
            image_name: image_name.to_owned(),
            header: header_message(image_name),
            registry_declared: false,
        }
    }

    /// Looks up a top-level value.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// All values visible to templates.
    #[must_use]
    pub const fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Name of the image being rendered.
    #[must_use]
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Header placed at the top of generated files.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Whether `ARG REGISTRY=...` has already been emitted in this render.
    #[must_use]
    pub const fn registry_declared(&self) -> bool {
        self.registry_declared
    }
}

/// Builds the "do not edit" header for an image's generated files.
#[must_use]
pub fn header_message(image_name: &str) -> String {
    format!(
        "# GENERATED FILE, DO NOT MODIFY!\n\
         #\n\
         # To update this file please edit the relevant template file and run:\n\
         #   {APP_NAME} generate image {image_name}\n\
         #\n\
         # Or regenerate all images with:\n\
         #   {APP_NAME} generate image --all"
    )
}

fn descriptor_value(base_image: &BaseImage) -> Value {
    let mut mapping = Mapping::new();
    let _ = mapping.insert(Value::from("name"), Value::from(base_image.name.as_str()));
    if let Some(source) = &base_image.source {
        let _ = mapping.insert(Value::from("source"), Value::from(source.as_str()));
    }
    Value::Mapping(mapping)
}

/// Text a value renders as: strings verbatim, scalars via their YAML form,
/// null as nothing, collections as compact JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(_) | Value::Mapping(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| format!("{value:?}"))
        }
        Value::Tagged(tagged) => display_value(&tagged.value),
    }
}
