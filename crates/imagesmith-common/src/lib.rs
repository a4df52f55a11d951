//! # imagesmith-common
//!
//! Shared error definitions, identifier types, and constants used across
//! the entire imagesmith workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives that the manifest, render,
//! and workflow crates build upon.

pub mod constants;
pub mod error;
pub mod types;
