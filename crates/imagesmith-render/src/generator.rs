//! Per-image output generation.
//!
//! Each image root holds a `source/` directory plus one generated directory
//! per declared version:
//!
//! ```text
//! images/core/
//! ├── source/
//! │   ├── Dockerfile.tmpl
//! │   └── entrypoint.sh
//! ├── v1/
//! │   ├── Dockerfile
//! │   └── entrypoint.sh
//! └── v2/
//!     └── ...
//! ```
//!
//! Version directories are wiped and rebuilt on every run. Directories that
//! no longer match a declared version are removed.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use imagesmith_common::constants::{SOURCE_DIR, TEMPLATE_SUFFIX};
use imagesmith_common::error::{ImagesmithError, Result};
use imagesmith_manifest::{Image, Manifest};
use walkdir::WalkDir;

use crate::context::RenderContext;
use crate::template;

/// Generates every image in the manifest, in name order.
///
/// Returns the number of version directories written.
///
/// # Errors
///
/// Stops at the first image that fails, wrapping its error with the image
/// name.
pub fn generate_all(manifest: &Manifest) -> Result<usize> {
    let mut total = 0;
    for name in manifest.images.keys() {
        tracing::debug!(image = %name, "generating image");
        total += generate_image(manifest, name)
            .map_err(|e| e.context(format!("generating {name}")))?;
    }
    Ok(total)
}

/// Generates every version of one image.
///
/// Returns the number of version directories written.
///
/// # Errors
///
/// Returns an error if the image is unknown, its root cannot be resolved,
/// its `source/` directory is missing, a version label is not a plain
/// directory name, or any template fails to render.
pub fn generate_image(manifest: &Manifest, name: &str) -> Result<usize> {
    let image = manifest.image(name)?;
    let root = image.root(manifest.defaults.base_path.as_deref())?;
    let source_dir = root.join(SOURCE_DIR);
    if !source_dir.is_dir() {
        return Err(ImagesmithError::NotFound {
            kind: "source directory",
            id: source_dir.display().to_string(),
        });
    }

    let outputs = image
        .versions
        .keys()
        .map(|version| Image::version_dir(&root, version).map(|dir| (version, dir)))
        .collect::<Result<Vec<_>>>()?;

    remove_orphaned_versions(&root, image)?;
    let sources = SourceTree::scan(&source_dir)?;

    for (version, output_dir) in outputs {
        tracing::debug!(image = %name, version = %version, "rendering version");
        let config = manifest.resolve_version(name, version)?;
        recreate_dir(&output_dir)?;

        let mut context = RenderContext::new(config, name);
        sources.render_into(&output_dir, &mut context)?;
    }

    tracing::info!(image = %name, versions = image.versions.len(), "generated image");
    Ok(image.versions.len())
}

/// Removes the generated directory of every declared version.
///
/// Removal failures are logged and skipped. Returns the number of
/// directories removed.
///
/// # Errors
///
/// Returns an error if an image root cannot be resolved or a version label
/// does not name a directory under it.
pub fn clean(manifest: &Manifest) -> Result<usize> {
    let mut total = 0;
    for (name, image) in &manifest.images {
        let root = image.root(manifest.defaults.base_path.as_deref())?;
        let mut removed = 0;
        for version in image.versions.keys() {
            let dir = Image::version_dir(&root, version)?;
            if !dir.exists() {
                continue;
            }
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::debug!(path = %dir.display(), "removed");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %dir.display(), error = %e, "failed to remove");
                }
            }
        }
        if removed > 0 {
            tracing::info!(image = %name, versions = removed, "cleaned image");
        }
        total += removed;
    }
    Ok(total)
}

/// Files found under an image's `source/` directory, relative to it.
#[derive(Debug, Default)]
struct SourceTree {
    root: PathBuf,
    templates: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl SourceTree {
    fn scan(source_dir: &Path) -> Result<Self> {
        let mut tree = Self {
            root: source_dir.to_path_buf(),
            ..Self::default()
        };

        for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source_dir).to_path_buf();
                ImagesmithError::io(path, e.into())
            })?;
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .map_err(|e| ImagesmithError::Config {
                    message: format!(
                        "{} escapes {}: {e}",
                        entry.path().display(),
                        source_dir.display()
                    ),
                })?
                .to_path_buf();

            if entry.file_type().is_dir() {
                tree.dirs.push(relative);
            } else if entry.file_name().to_string_lossy().ends_with(TEMPLATE_SUFFIX) {
                tree.templates.push(relative);
            } else {
                tree.files.push(relative);
            }
        }

        Ok(tree)
    }

    /// Renders templates, then mirrors directories and copies static files.
    fn render_into(&self, output_dir: &Path, context: &mut RenderContext) -> Result<()> {
        for relative in &self.templates {
            let output = output_dir.join(template::output_name(relative, TEMPLATE_SUFFIX));
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ImagesmithError::io(parent, e))?;
            }
            tracing::debug!(template = %relative.display(), "rendering template");
            template::write_file(&self.root.join(relative), &output, context)?;
        }

        for relative in &self.dirs {
            let dir = output_dir.join(relative);
            std::fs::create_dir_all(&dir).map_err(|e| ImagesmithError::io(&dir, e))?;
        }

        for relative in &self.files {
            let from = self.root.join(relative);
            let to = output_dir.join(relative);
            let _ = std::fs::copy(&from, &to).map_err(|e| ImagesmithError::io(&from, e))?;
        }

        Ok(())
    }
}

fn remove_orphaned_versions(root: &Path, image: &Image) -> Result<()> {
    let entries = std::fs::read_dir(root).map_err(|e| ImagesmithError::io(root, e))?;
    let mut orphans = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ImagesmithError::io(root, e))?;
        let is_dir = entry
            .file_type()
            .map_err(|e| ImagesmithError::io(entry.path(), e))?
            .is_dir();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_dir && name != SOURCE_DIR && !image.versions.contains_key(&name) {
            orphans.push(entry.path());
        }
    }

    orphans.sort();
    for path in orphans {
        tracing::info!(path = %path.display(), "removing orphaned version directory");
        std::fs::remove_dir_all(&path).map_err(|e| ImagesmithError::io(&path, e))?;
    }
    Ok(())
}

fn recreate_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(ImagesmithError::io(dir, e)),
    }
    std::fs::create_dir_all(dir).map_err(|e| ImagesmithError::io(dir, e))
}
