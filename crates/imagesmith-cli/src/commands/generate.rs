//! `imagesmith generate`: Render build files or the CI workflow.

use std::path::Path;
use std::time::Instant;

use anyhow::Context as _;
use clap::{Args, Subcommand};

use super::workflow::{self, WorkflowArgs};
use crate::output::{count, format_elapsed};

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// What to generate.
    #[command(subcommand)]
    pub target: Target,
}

/// Generation targets.
#[derive(Subcommand, Debug)]
pub enum Target {
    /// Render build files for one image or all images.
    #[command(visible_alias = "img")]
    Image(ImageArgs),
    /// Write a CI workflow with dependency-ordered build jobs.
    #[command(visible_alias = "wf")]
    Workflow(WorkflowArgs),
}

/// Arguments for `generate image`.
#[derive(Args, Debug)]
pub struct ImageArgs {
    /// Image to generate.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Generate every image in the manifest.
    #[arg(short = 'A', long)]
    pub all: bool,
}

/// Executes the `generate` command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be loaded or generation fails.
pub fn execute(args: GenerateArgs, config: Option<&Path>) -> anyhow::Result<()> {
    match args.target {
        Target::Image(image) => generate_images(&image, config),
        Target::Workflow(workflow_args) => workflow::execute(&workflow_args, config),
    }
}

fn generate_images(args: &ImageArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();
    let manifest = super::load_manifest(config)?;

    match args.name.as_deref() {
        Some(name) => {
            let versions = imagesmith_render::generate_image(&manifest, name)
                .with_context(|| format!("failed to generate image '{name}'"))?;
            tracing::info!(
                "generated image '{name}' ({}) after {}",
                count(versions, "version", "versions"),
                format_elapsed(start.elapsed())
            );
        }
        None => {
            let versions = imagesmith_render::generate_all(&manifest)
                .context("failed to generate all images")?;
            tracing::info!(
                "generated {} ({}) after {}",
                count(manifest.images.len(), "image", "images"),
                count(versions, "version", "versions"),
                format_elapsed(start.elapsed())
            );
        }
    }
    Ok(())
}
