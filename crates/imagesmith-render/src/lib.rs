//! # imagesmith-render
//!
//! Turns resolved image configuration into build files on disk.
//!
//! Handles:
//! - **Context**: Per-render lookup state for one image version.
//! - **Origin**: Resolution of base image references into `FROM` directives,
//!   declaring the registry build argument once per render.
//! - **Template**: Expansion of `{{ ... }}` actions in `.tmpl` files.
//! - **Generator**: Per-image output directory management.

pub mod context;
pub mod generator;
pub mod origin;
pub mod template;

pub use context::RenderContext;
pub use generator::{clean, generate_all, generate_image};
pub use origin::ImageRef;
