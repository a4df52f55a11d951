//! Base image resolution into `FROM` directives.
//!
//! Images from the public registry are referenced by name. Everything else
//! is pulled through `${REGISTRY}`, whose `ARG` declaration is emitted only
//! on the first private reference of a render.
//!
//! Registry problems do not fail the render: they are written into the
//! build file as `# ERROR:` comments so the broken reference is visible in
//! the generated artifact.

use std::collections::HashSet;
use std::fmt::Write as _;

use imagesmith_common::constants::{
    PUBLIC_SOURCE, REGISTRY_ARG, REGISTRY_KEY, REGISTRY_PLACEHOLDER,
};
use imagesmith_manifest::BaseImage;
use serde_yaml::Value;

use crate::context::{RenderContext, display_value};

/// A reference to the image a build starts from.
#[derive(Debug, Clone, Copy)]
pub enum ImageRef<'a> {
    /// A key into the context values, followed through string indirection.
    /// A key that names no value is used as a literal image name.
    Key(&'a str),
    /// A descriptor given directly.
    Image(&'a BaseImage),
    /// An arbitrary value: strings act as keys, mappings as descriptors,
    /// anything else as the display text of an image name.
    Value(&'a Value),
}

/// Where an image reference ended up after following indirection.
#[derive(Debug)]
struct Target {
    name: String,
    source: Option<String>,
    circular_through: Option<String>,
}

impl Target {
    fn literal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            circular_through: None,
        }
    }

    fn is_public(&self) -> bool {
        self.source.as_deref() == Some(PUBLIC_SOURCE)
    }
}

impl RenderContext {
    /// Produces the `FROM` directive (with any preceding `ARG` or error
    /// lines) for `reference`.
    ///
    /// The first private reference in a render declares
    /// `ARG REGISTRY=<registry>`; later ones only emit their `FROM` line.
    /// When the registry is missing or not a string an `# ERROR:` comment
    /// is emitted instead and the declaration stays pending.
    pub fn resolve_origin(&mut self, reference: ImageRef<'_>) -> String {
        let target = match reference {
            ImageRef::Image(base_image) => Target {
                name: base_image.name.clone(),
                source: base_image.source.clone(),
                circular_through: None,
            },
            ImageRef::Key(key) => self.follow_key(key, &mut HashSet::new()),
            ImageRef::Value(value) => self.target_of(value, &mut HashSet::new()),
        };
        self.origin_directive(&target)
    }

    fn follow_key(&self, key: &str, visited: &mut HashSet<String>) -> Target {
        if !visited.insert(key.to_owned()) {
            return Target {
                circular_through: Some(key.to_owned()),
                ..Target::literal(key)
            };
        }
        match self.values.get(key) {
            Some(value) => self.target_of(value, visited),
            None => Target::literal(key),
        }
    }

    fn target_of(&self, value: &Value, visited: &mut HashSet<String>) -> Target {
        match value {
            Value::String(key) => self.follow_key(key, visited),
            Value::Mapping(mapping) => {
                let text = |field: &str| mapping.get(field).and_then(Value::as_str).map(str::to_owned);
                Target {
                    name: text("name").unwrap_or_default(),
                    source: text("source"),
                    circular_through: None,
                }
            }
            other => Target::literal(display_value(other)),
        }
    }

    fn origin_directive(&mut self, target: &Target) -> String {
        if target.is_public() {
            return format!("FROM {}", target.name);
        }

        let image_path = format!("{REGISTRY_PLACEHOLDER}/{}", target.name);
        let mut directive = String::new();

        if let Some(key) = &target.circular_through {
            tracing::warn!(image = %self.image_name(), key = %key, "circular base image reference");
            let _ = writeln!(
                directive,
                "# ERROR: circular base image reference through \"{key}\""
            );
        }

        if !self.registry_declared {
            match self.values.get(REGISTRY_KEY) {
                None => {
                    tracing::warn!(image = %self.image_name(), "registry not set");
                    directive.push_str("# ERROR: registry not set in config\n");
                }
                Some(Value::String(registry)) => {
                    let _ = writeln!(directive, "ARG {REGISTRY_ARG}={registry}");
                    self.registry_declared = true;
                }
                Some(_) => {
                    tracing::warn!(image = %self.image_name(), "registry is not a string");
                    directive.push_str("# ERROR: registry is not a string\n");
                }
            }
        }

        let _ = write!(directive, "FROM {image_path}");
        directive
    }
}
