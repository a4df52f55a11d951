//! Dependency extraction from rendered build files.
//!
//! Only references through the registry placeholder are tracked:
//!
//! ```text
//! FROM ${REGISTRY}/core:v1 AS base        -> core:v1
//! COPY --from=${REGISTRY}/tools:v2 /x /x  -> tools:v2
//! COPY --from=base /y /y                  -> (stage alias, ignored)
//! FROM ubuntu:24.04                       -> (public image, ignored)
//! ```
//!
//! Instruction keywords are matched case-insensitively.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use imagesmith_common::error::{ImagesmithError, Result};
use imagesmith_common::types::DependencyKey;
use regex::Regex;

#[allow(clippy::expect_used)]
static REGISTRY_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:FROM)\s+\$\{REGISTRY\}/([^:\s]+):(\S+)").expect("valid regex")
});

#[allow(clippy::expect_used)]
static COPY_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:COPY)\s+.*--from=(\S+)").expect("valid regex")
});

#[allow(clippy::expect_used)]
static STAGE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?i:FROM)\s+.*\s+(?i:AS)\s+(\S+)").expect("valid regex")
});

#[allow(clippy::expect_used)]
static REGISTRY_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$\{REGISTRY\}/([^:\s]+):(\S+)").expect("valid regex")
});

/// Reads a build file and returns the images it depends on.
///
/// # Errors
///
/// Returns [`ImagesmithError::Io`] if the file cannot be read.
pub fn extract_dependencies(path: &Path) -> Result<BTreeSet<DependencyKey>> {
    let content = std::fs::read_to_string(path).map_err(|e| ImagesmithError::io(path, e))?;
    Ok(extract_from_str(&content))
}

/// Returns the deduplicated, sorted set of images `content` depends on.
#[must_use]
pub fn extract_from_str(content: &str) -> BTreeSet<DependencyKey> {
    let stages: HashSet<&str> = content
        .lines()
        .filter_map(|line| STAGE_ALIAS.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    let mut deps = BTreeSet::new();
    for line in content.lines() {
        if let Some(caps) = REGISTRY_FROM.captures(line) {
            let _ = deps.insert(DependencyKey::new(&caps[1], &caps[2]));
        }

        if let Some(caps) = COPY_FROM.captures(line) {
            let reference = &caps[1];
            if stages.contains(reference) {
                continue;
            }
            if let Some(caps) = REGISTRY_REF.captures(reference) {
                let _ = deps.insert(DependencyKey::new(&caps[1], &caps[2]));
            }
        }
    }
    deps
}
