//! Domain primitive types used across the imagesmith workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a build job, safe to use as a CI job key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a job ID from an already sanitized value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives the job ID for one image version.
    ///
    /// Runs of characters outside `[A-Za-z0-9_-]` become a single `-`,
    /// repeated dashes collapse, leading and trailing dashes are trimmed, and
    /// `build-` is prepended unless the result starts with a letter or `_`.
    #[must_use]
    pub fn for_image(image: &str, version: &str) -> Self {
        let raw = format!("{image}-{version}");
        let mut id = String::with_capacity(raw.len());
        for c in raw.chars() {
            let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            };
            if c == '-' && id.ends_with('-') {
                continue;
            }
            id.push(c);
        }
        let id = id.trim_matches('-');

        match id.chars().next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => Self(id.to_owned()),
            _ => Self(format!("build-{id}")),
        }
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `<image>:<version>` key linking build file references to jobs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyKey(String);

impl DependencyKey {
    /// Creates the key for one image version.
    #[must_use]
    pub fn new(image: &str, version: &str) -> Self {
        Self(format!("{image}:{version}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
