//! `imagesmith generate workflow`: Emit the CI workflow.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Args;
use imagesmith_workflow::WorkflowOptions;

/// Arguments for `generate workflow`.
#[derive(Args, Debug)]
pub struct WorkflowArgs {
    /// File to write; standard output when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes `generate workflow`.
///
/// Build files must already be generated; their references decide the job
/// order.
///
/// # Errors
///
/// Returns an error if planning fails or the workflow cannot be written.
pub fn execute(args: &WorkflowArgs, config: Option<&Path>) -> anyhow::Result<()> {
    let manifest = super::load_manifest(config)?;
    let jobs = imagesmith_workflow::plan(&manifest).context("failed to plan build jobs")?;
    let options = WorkflowOptions::for_manifest(&manifest);

    match &args.output {
        Some(path) => {
            imagesmith_workflow::write_workflow(&jobs, &options, path)
                .with_context(|| format!("failed to write workflow {}", path.display()))?;
        }
        None => {
            let content = imagesmith_workflow::render_workflow(&jobs, &options)
                .context("failed to render workflow")?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .context("failed to write workflow to standard output")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
