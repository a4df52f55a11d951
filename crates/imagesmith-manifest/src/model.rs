//! Manifest data model.
//!
//! A manifest maps image names to images; each image maps version labels
//! to configuration overlays that are merged over the image defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use imagesmith_common::constants::{PUBLIC_SOURCE, REGISTRY_KEY, SOURCE_DIR, VERSION_KEY};
use imagesmith_common::error::{ImagesmithError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::merge::merge;

/// Root of a version 1 manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Schema version of the document.
    pub version: i64,
    /// Settings inherited by every image.
    #[serde(default)]
    pub defaults: Defaults,
    /// Images keyed by name.
    #[serde(default)]
    pub images: BTreeMap<String, Image>,
}

/// Global defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Private registry host images are pulled through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    /// Directory relative image paths are resolved against.
    ///
    /// Never read from the document; set by the loader.
    #[serde(skip)]
    pub base_path: Option<PathBuf>,
}

/// One image and its versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Source/output root, relative to the base path or absolute.
    #[serde(default)]
    pub path: PathBuf,
    /// Overlay shared by every version of this image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<ImageConfig>,
    /// Per-version overlays keyed by version label.
    #[serde(default, deserialize_with = "deserialize_versions")]
    pub versions: BTreeMap<String, Option<ImageConfig>>,
}

/// A configuration overlay: an optional base image plus free-form values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Upstream image this build starts from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_image: Option<BaseImage>,
    /// Every other key of the overlay.
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

/// Descriptor of an upstream image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseImage {
    /// Image reference, e.g. `ubuntu:24.04` or `core:v1`.
    pub name: String,
    /// Where the image is pulled from; `dockerhub` bypasses the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl BaseImage {
    /// Creates a descriptor routed through the private registry.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
        }
    }

    /// Creates a descriptor pulled straight from the public registry.
    #[must_use]
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(PUBLIC_SOURCE.to_owned()),
        }
    }

    /// Returns `true` when the image bypasses the private registry.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.source.as_deref() == Some(PUBLIC_SOURCE)
    }
}

impl Manifest {
    /// Looks up an image by name.
    ///
    /// # Errors
    ///
    /// Returns [`ImagesmithError::NotFound`] if the manifest has no such image.
    pub fn image(&self, name: &str) -> Result<&Image> {
        self.images.get(name).ok_or_else(|| ImagesmithError::NotFound {
            kind: "image",
            id: name.to_owned(),
        })
    }

    /// Resolves the on-disk root directory of an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not exist, or if its path is
    /// relative and the manifest has no base path.
    pub fn image_root(&self, name: &str) -> Result<PathBuf> {
        let image = self.image(name)?;
        image.root(self.defaults.base_path.as_deref())
    }

    /// Produces the resolved configuration for one image version.
    ///
    /// The version overlay is merged over the image defaults, then
    /// `version` is set to the label and `registry` is inherited from the
    /// global defaults unless the merged values already define it. An
    /// undeclared global registry is injected as the empty string, so the
    /// build file still declares `ARG REGISTRY=` for `--build-arg`.
    ///
    /// # Errors
    ///
    /// Returns [`ImagesmithError::NotFound`] if the image or version does
    /// not exist.
    pub fn resolve_version(&self, image_name: &str, version: &str) -> Result<ImageConfig> {
        let image = self.image(image_name)?;
        let overlay = image
            .versions
            .get(version)
            .ok_or_else(|| ImagesmithError::NotFound {
                kind: "version",
                id: format!("{image_name}:{version}"),
            })?;

        let mut config = merge(overlay.as_ref(), image.defaults.as_ref());
        let _ = config
            .values
            .insert(VERSION_KEY.to_owned(), Value::String(version.to_owned()));
        if !config.values.contains_key(REGISTRY_KEY) {
            let registry = self.defaults.registry.clone().unwrap_or_default();
            let _ = config
                .values
                .insert(REGISTRY_KEY.to_owned(), Value::String(registry));
        }
        Ok(config)
    }
}

impl Image {
    /// Resolves this image's root against `base_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ImagesmithError::Config`] if the path is relative and no
    /// base path is available.
    pub fn root(&self, base_path: Option<&Path>) -> Result<PathBuf> {
        if self.path.is_absolute() {
            return Ok(self.path.clone());
        }
        base_path
            .map(|base| base.join(&self.path))
            .ok_or_else(|| ImagesmithError::Config {
                message: "base path not set in manifest".into(),
            })
    }

    /// The directory `version` is generated into under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ImagesmithError::Config`] if the label is empty, names the
    /// `source/` directory, is `.` or `..`, or contains a path separator.
    pub fn version_dir(root: &Path, version: &str) -> Result<PathBuf> {
        let invalid = version.is_empty()
            || version == SOURCE_DIR
            || version == "."
            || version == ".."
            || version.contains(['/', '\\']);
        if invalid {
            return Err(ImagesmithError::Config {
                message: format!("invalid version label {version:?}"),
            });
        }
        Ok(root.join(version))
    }
}

/// Version labels keep their literal text, so `3.20` stays distinct from
/// `3.2`. A null `versions` entry means no versions.
fn deserialize_versions<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, Option<ImageConfig>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, Option<ImageConfig>>>::deserialize(deserializer)?
        .unwrap_or_default())
}
