//! Well-known file names, directory names, and markers.

/// Manifest locations tried, in order, when no manifest path is given.
pub const DEFAULT_MANIFEST_LOCATIONS: [&str; 6] = [
    "images/manifest.yml",
    "images/manifest.yaml",
    "manifest.yml",
    "manifest.yaml",
    ".manifest.yml",
    ".manifest.yaml",
];

/// Manifest path that means "read from standard input".
pub const STDIN_MARKER: &str = "-";

/// The only manifest schema version understood by this build.
pub const SUPPORTED_MANIFEST_VERSION: i64 = 1;

/// Directory under each image root holding templates and static files.
pub const SOURCE_DIR: &str = "source";

/// Suffix marking a file under [`SOURCE_DIR`] as a template.
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

/// File name of the rendered build file inside each version directory.
pub const BUILD_FILE_NAME: &str = "Dockerfile";

/// Base image source tag meaning "pull directly, bypass the private registry".
pub const PUBLIC_SOURCE: &str = "dockerhub";

/// Build argument carrying the private registry host.
pub const REGISTRY_ARG: &str = "REGISTRY";

/// Placeholder prefix for images pulled through the private registry.
pub const REGISTRY_PLACEHOLDER: &str = "${REGISTRY}";

/// Configuration key holding the registry host.
pub const REGISTRY_KEY: &str = "registry";

/// Configuration key receiving the version label.
pub const VERSION_KEY: &str = "version";

/// Configuration key holding the base image descriptor.
pub const BASE_IMAGE_KEY: &str = "base_image";

/// Configuration key receiving the image name.
pub const IMAGE_NAME_KEY: &str = "image_name";

/// Application name used in CLI output and generated headers.
pub const APP_NAME: &str = "imagesmith";
