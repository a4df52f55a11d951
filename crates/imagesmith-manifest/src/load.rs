//! Manifest loading from files, standard input, and default locations.
//!
//! The schema version is checked before the rest of the document is
//! interpreted, so a missing version and an unsupported one are reported
//! as distinct errors.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use imagesmith_common::constants::{
    DEFAULT_MANIFEST_LOCATIONS, STDIN_MARKER, SUPPORTED_MANIFEST_VERSION,
};
use imagesmith_common::error::{ImagesmithError, Result};
use serde_yaml::Value;

use crate::model::Manifest;

/// Loads a manifest.
///
/// - `Some("-")` reads standard input; the base path is the current
///   directory.
/// - `Some(path)` reads that file; the base path is its parent directory.
/// - `None` searches the default locations under the current directory.
///
/// # Errors
///
/// Returns an error if the manifest cannot be found, read, or parsed, or if
/// its schema version is missing or unsupported.
pub fn load(location: Option<&Path>) -> Result<Manifest> {
    match location {
        Some(path) if path == Path::new(STDIN_MARKER) => {
            tracing::debug!("reading manifest from standard input");
            let cwd = std::env::current_dir().map_err(|e| ImagesmithError::io(".", e))?;
            load_reader(std::io::stdin().lock(), cwd)
        }
        Some(path) => load_file(path),
        None => {
            let cwd = std::env::current_dir().map_err(|e| ImagesmithError::io(".", e))?;
            discover(&cwd)
        }
    }
}

/// Loads the first manifest found in the default locations under `dir`.
///
/// Once a location exists, any error loading it is returned as is; the
/// search only continues past locations that do not exist.
///
/// # Errors
///
/// Returns [`ImagesmithError::ManifestNotFound`] if none of the default
/// locations exist, or the error from loading the first one that does.
pub fn discover(dir: &Path) -> Result<Manifest> {
    let mut searched = Vec::with_capacity(DEFAULT_MANIFEST_LOCATIONS.len());
    for candidate in DEFAULT_MANIFEST_LOCATIONS {
        let path = dir.join(candidate);
        match load_file(&path) {
            Err(ImagesmithError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                searched.push(path);
            }
            other => return other,
        }
    }
    Err(ImagesmithError::ManifestNotFound { searched })
}

/// Loads a manifest file, using its parent directory as the base path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid manifest.
pub fn load_file(path: &Path) -> Result<Manifest> {
    tracing::debug!(path = %path.display(), "loading manifest");
    let file = std::fs::File::open(path).map_err(|e| ImagesmithError::io(path, e))?;
    let absolute = std::path::absolute(path).map_err(|e| ImagesmithError::io(path, e))?;
    let base_path = absolute
        .parent()
        .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
    load_reader(file, base_path)
}

fn load_reader(mut reader: impl Read, base_path: PathBuf) -> Result<Manifest> {
    let mut content = String::new();
    let _ = reader
        .read_to_string(&mut content)
        .map_err(|e| ImagesmithError::io(&base_path, e))?;
    let mut manifest = parse_manifest(&content)?;
    manifest.defaults.base_path = Some(base_path);
    Ok(manifest)
}

/// Parses manifest text after checking its schema version.
///
/// The returned manifest has no base path.
///
/// # Errors
///
/// Returns [`ImagesmithError::MissingVersion`] if `version` is absent or
/// zero, [`ImagesmithError::UnsupportedVersion`] for any version other than
/// 1, and [`ImagesmithError::Manifest`] for malformed documents.
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    if content.trim().is_empty() {
        return Err(ImagesmithError::MissingVersion);
    }
    let document: Value = serde_yaml::from_str(content).map_err(|e| ImagesmithError::Manifest {
        message: format!("failed to parse manifest: {e}"),
    })?;

    let version = match document.get("version") {
        None | Some(Value::Null) => return Err(ImagesmithError::MissingVersion),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| ImagesmithError::Manifest {
            message: format!("version must be an integer, got {n}"),
        })?,
        Some(other) => {
            return Err(ImagesmithError::Manifest {
                message: format!("version must be an integer, got {other:?}"),
            });
        }
    };

    match version {
        0 => Err(ImagesmithError::MissingVersion),
        SUPPORTED_MANIFEST_VERSION => {
            serde_yaml::from_value(document).map_err(|e| ImagesmithError::Manifest {
                message: format!("failed to parse v1 manifest: {e}"),
            })
        }
        other => Err(ImagesmithError::UnsupportedVersion { version: other }),
    }
}
