//! # imagesmith-workflow
//!
//! Derives a CI workflow from generated build files.
//!
//! Handles:
//! - **Extract**: Registry-indirected image references in build files.
//! - **Job**: One build job per image version, linked to the jobs it needs.
//! - **Graph**: Dependency-first ordering with cycle detection via `petgraph`.
//! - **Writer**: GitHub Actions workflow serialization.

pub mod extract;
pub mod graph;
pub mod job;
pub mod writer;

pub use extract::{extract_dependencies, extract_from_str};
pub use graph::{DependencyGraph, order_jobs};
pub use job::{Job, build_jobs, link_dependencies, plan};
pub use writer::{WorkflowOptions, render_workflow, write_workflow};
