//! # imagesmith-manifest
//!
//! The declarative image manifest and everything needed to turn it into
//! per-version configuration.
//!
//! Handles:
//! - **Model**: Manifest, image, and overlay types deserialized from YAML.
//! - **Load**: Reading a manifest from a file, standard input, or the
//!   default search locations, with schema version checks.
//! - **Merge**: Deep merging of a version overlay over image defaults.

pub mod load;
pub mod merge;
pub mod model;

pub use load::{discover, load, load_file, parse_manifest};
pub use merge::merge;
pub use model::{BaseImage, Defaults, Image, ImageConfig, Manifest};
