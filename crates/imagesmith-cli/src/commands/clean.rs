//! `imagesmith clean`: Remove generated version directories.

use std::path::Path;
use std::time::Instant;

use anyhow::Context as _;
use clap::Args;

use crate::output::{count, format_elapsed};

/// Arguments for the `clean` command.
#[derive(Args, Debug)]
pub struct CleanArgs {}

/// Executes the `clean` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or an image root
/// cannot be resolved.
pub fn execute(_args: &CleanArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let manifest = super::load_manifest(config)?;
    let removed = imagesmith_render::clean(&manifest).context("failed to clean")?;

    if removed == 0 {
        tracing::info!("no generated directories found to clean");
    } else {
        tracing::info!(
            "cleaned {} after {}",
            count(removed, "version directory", "version directories"),
            format_elapsed(start.elapsed())
        );
    }
    Ok(())
}
