//! CLI command definitions and dispatch.

pub mod clean;
pub mod generate;
pub mod workflow;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use imagesmith_manifest::Manifest;

/// Generate container build files from templates.
#[derive(Parser, Debug)]
#[command(name = "imagesmith", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Manifest file to load (`-` reads standard input). Defaults to the
    /// first of the well-known locations that exists.
    #[arg(short, long, global = true, env = "IMAGESMITH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate build files or the CI workflow.
    #[command(visible_alias = "gen")]
    Generate(generate::GenerateArgs),
    /// Remove generated version directories, leaving sources intact.
    Clean(clean::CleanArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Command::Generate(args) => generate::execute(args, config),
        Command::Clean(args) => clean::execute(&args, config),
    }
}

/// Loads the manifest named by `--config`, or discovers one.
fn load_manifest(config: Option<&Path>) -> anyhow::Result<Manifest> {
    imagesmith_manifest::load(config).with_context(|| match config {
        Some(path) => format!("loading manifest {}", path.display()),
        None => "loading manifest".to_owned(),
    })
}
