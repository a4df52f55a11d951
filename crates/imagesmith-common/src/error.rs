//! Unified error types for the imagesmith workspace.
//!
//! Registry resolution problems have no variant here; they are reported
//! inline in the rendered build file instead.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ImagesmithError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest does not declare a schema version.
    #[error("manifest version is required")]
    MissingVersion,

    /// The manifest declares a schema version this build does not understand.
    #[error("unsupported manifest version {version} (only version 1 is supported)")]
    UnsupportedVersion {
        /// Version found in the document.
        version: i64,
    },

    /// The manifest is malformed.
    #[error("invalid manifest: {message}")]
    Manifest {
        /// Description of the problem.
        message: String,
    },

    /// No manifest was given and none of the default locations exist.
    #[error("no manifest file found in any of the default locations ({})", display_paths(.searched))]
    ManifestNotFound {
        /// Every location that was tried, in order.
        searched: Vec<PathBuf>,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A template could not be parsed or evaluated.
    #[error("template {path}: {message}")]
    Template {
        /// Template file (or a synthetic name for in-memory templates).
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The job graph contains a cycle.
    #[error("circular dependency detected involving job {job} (cycle: {})", .cycle.join(", "))]
    CircularDependency {
        /// Job at which the cycle was detected.
        job: String,
        /// Every job in the strongly connected component containing `job`.
        cycle: Vec<String>,
    },

    /// An inner error annotated with what was being done when it happened.
    #[error("{context}: {source}")]
    Context {
        /// What was being done.
        context: String,
        /// Underlying error.
        source: Box<ImagesmithError>,
    },

    /// YAML serialization or deserialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying serialization error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl ImagesmithError {
    /// Wraps `self` with a description of the operation in progress.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Builds an [`ImagesmithError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ImagesmithError>;
