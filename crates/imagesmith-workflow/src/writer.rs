//! GitHub Actions workflow generation.
//!
//! Jobs are written in build order, each needing the jobs its build file
//! references, so the CI runner builds base images before the images that
//! start from them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use imagesmith_common::constants::{APP_NAME, REGISTRY_ARG};
use imagesmith_common::error::{ImagesmithError, Result};
use imagesmith_common::types::JobId;
use imagesmith_manifest::Manifest;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::job::Job;

/// Settings for the generated workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Workflow display name.
    pub name: String,
    /// Branch whose pushes trigger a build.
    pub branch: String,
    /// Runner label for every job.
    pub runs_on: String,
    /// Directory build paths are made relative to (the repository root).
    pub base_path: PathBuf,
    /// Registry images are tagged for and logged in to.
    pub registry: Option<String>,
}

impl WorkflowOptions {
    /// Default options rooted at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            name: "Build images".into(),
            branch: "main".into(),
            runs_on: "ubuntu-latest".into(),
            base_path: base_path.into(),
            registry: None,
        }
    }

    /// Options taking the base path and registry from a loaded manifest.
    #[must_use]
    pub fn for_manifest(manifest: &Manifest) -> Self {
        let base_path = manifest
            .defaults
            .base_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            registry: manifest.defaults.registry.clone(),
            ..Self::new(base_path)
        }
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.base_path).unwrap_or(path)
    }
}

#[derive(Debug, Serialize)]
struct Workflow<'a> {
    name: &'a str,
    on: Triggers<'a>,
    jobs: Mapping,
}

#[derive(Debug, Serialize)]
struct Triggers<'a> {
    push: BranchFilter<'a>,
    pull_request: BranchFilter<'a>,
    workflow_dispatch: Mapping,
}

#[derive(Debug, Serialize)]
struct BranchFilter<'a> {
    branches: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct WorkflowJob<'a> {
    name: &'a str,
    #[serde(rename = "runs-on")]
    runs_on: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    needs: Vec<&'a str>,
    steps: Vec<Step>,
}

#[derive(Debug, Serialize)]
struct Step {
    name: String,
    uses: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    with: BTreeMap<&'static str, Value>,
}

impl Step {
    fn new(name: impl Into<String>, uses: &'static str) -> Self {
        Self {
            name: name.into(),
            uses,
            with: BTreeMap::new(),
        }
    }

    fn with(mut self, key: &'static str, value: impl Into<Value>) -> Self {
        let _ = self.with.insert(key, value.into());
        self
    }
}

/// Serializes `jobs` (already in build order) as a workflow document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_workflow(jobs: &[Job], options: &WorkflowOptions) -> Result<String> {
    let mut entries = Mapping::new();
    for job in jobs {
        let value = serde_yaml::to_value(workflow_job(job, options))?;
        let _ = entries.insert(Value::from(job.id.as_str()), value);
    }

    let workflow = Workflow {
        name: &options.name,
        on: Triggers {
            push: BranchFilter {
                branches: [options.branch.as_str()],
            },
            pull_request: BranchFilter {
                branches: [options.branch.as_str()],
            },
            workflow_dispatch: Mapping::new(),
        },
        jobs: entries,
    };

    let body = serde_yaml::to_string(&workflow)?;
    Ok(format!(
        "# GENERATED FILE, DO NOT MODIFY!\n# Regenerate with: {APP_NAME} generate workflow\n{body}"
    ))
}

/// Renders the workflow and writes it to `path`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns an error if rendering fails or the file cannot be written.
pub fn write_workflow(jobs: &[Job], options: &WorkflowOptions, path: &Path) -> Result<()> {
    let content = render_workflow(jobs, options)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ImagesmithError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| ImagesmithError::io(path, e))?;
    tracing::info!(path = %path.display(), jobs = jobs.len(), "wrote workflow");
    Ok(())
}

fn workflow_job<'a>(job: &'a Job, options: &'a WorkflowOptions) -> WorkflowJob<'a> {
    let file = options.relative(&job.build_file);
    let context = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let image = format!("{}:{}", job.image, job.version);

    let mut steps = vec![
        Step::new("Checkout", "actions/checkout@v4"),
        Step::new("Set up Docker Buildx", "docker/setup-buildx-action@v3"),
    ];

    let mut build = Step::new(format!("Build {image}"), "docker/build-push-action@v6")
        .with("context", context.display().to_string())
        .with("file", file.display().to_string())
        .with("push", true);

    match &options.registry {
        Some(registry) => {
            steps.push(
                Step::new("Log in to registry", "docker/login-action@v3")
                    .with("registry", registry.as_str())
                    .with("username", "${{ secrets.REGISTRY_USERNAME }}")
                    .with("password", "${{ secrets.REGISTRY_PASSWORD }}"),
            );
            build = build
                .with("build-args", format!("{REGISTRY_ARG}={registry}"))
                .with("tags", format!("{registry}/{image}"));
        }
        None => build = build.with("tags", image),
    }
    steps.push(build);

    WorkflowJob {
        name: &job.name,
        runs_on: &options.runs_on,
        needs: job.needs.iter().map(JobId::as_str).collect(),
        steps,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn jobs() -> Vec<Job> {
        let base = Job::new("myapp", "v1", "/repo/images/myapp/v1/Dockerfile");
        let mut next = Job::new("myapp", "v2", "/repo/images/myapp/v2/Dockerfile");
        next.needs = vec![JobId::new("myapp-v1")];
        vec![base, next]
    }

    fn options() -> WorkflowOptions {
        WorkflowOptions {
            registry: Some("registry.example.com".into()),
            ..WorkflowOptions::new("/repo")
        }
    }

    fn parse(text: &str) -> Value {
        serde_yaml::from_str(text).expect("valid workflow yaml")
    }

    #[test]
    fn jobs_appear_in_given_order_with_needs() {
        let text = render_workflow(&jobs(), &options()).expect("should render");
        let doc = parse(&text);

        let keys: Vec<&str> = doc["jobs"]
            .as_mapping()
            .expect("jobs mapping")
            .keys()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(keys, vec!["myapp-v1", "myapp-v2"]);

        assert_eq!(doc["jobs"]["myapp-v1"]["name"], Value::from("Build myapp:v1"));
        assert!(doc["jobs"]["myapp-v1"].get("needs").is_none());
        assert_eq!(doc["jobs"]["myapp-v2"]["needs"][0], Value::from("myapp-v1"));
        assert_eq!(doc["jobs"]["myapp-v2"]["runs-on"], Value::from("ubuntu-latest"));
    }

    #[test]
    fn triggers_and_header() {
        let text = render_workflow(&jobs(), &options()).expect("should render");
        assert!(text.starts_with("# GENERATED FILE, DO NOT MODIFY!\n"));

        let doc = parse(&text);
        assert_eq!(doc["name"], Value::from("Build images"));
        assert_eq!(doc["on"]["push"]["branches"][0], Value::from("main"));
        assert_eq!(doc["on"]["pull_request"]["branches"][0], Value::from("main"));
        assert!(doc["on"].get("workflow_dispatch").is_some());
    }

    #[test]
    fn build_step_uses_relative_paths_and_registry() {
        let text = render_workflow(&jobs(), &options()).expect("should render");
        let doc = parse(&text);
        let steps = doc["jobs"]["myapp-v2"]["steps"]
            .as_sequence()
            .expect("steps");
        let build = steps.last().expect("build step");

        assert_eq!(build["uses"], Value::from("docker/build-push-action@v6"));
        assert_eq!(build["with"]["context"], Value::from("images/myapp/v2"));
        assert_eq!(build["with"]["file"], Value::from("images/myapp/v2/Dockerfile"));
        assert_eq!(
            build["with"]["build-args"],
            Value::from("REGISTRY=registry.example.com")
        );
        assert_eq!(
            build["with"]["tags"],
            Value::from("registry.example.com/myapp:v2")
        );
        assert!(
            steps
                .iter()
                .any(|s| s["uses"] == Value::from("docker/login-action@v3"))
        );
    }

    #[test]
    fn no_registry_means_no_login_or_build_args() {
        let text =
            render_workflow(&jobs(), &WorkflowOptions::new("/repo")).expect("should render");
        let doc = parse(&text);
        let steps = doc["jobs"]["myapp-v1"]["steps"]
            .as_sequence()
            .expect("steps");
        assert_eq!(steps.len(), 3);
        let build = &steps[2];
        assert!(build["with"].get("build-args").is_none());
        assert_eq!(build["with"]["tags"], Value::from("myapp:v1"));
    }

    #[test]
    fn empty_job_list_renders() {
        let text = render_workflow(&[], &options()).expect("should render");
        let doc = parse(&text);
        assert!(doc["jobs"].as_mapping().is_some_and(Mapping::is_empty));
    }

    #[test]
    fn for_manifest_takes_registry_and_base_path() {
        let mut manifest = imagesmith_manifest::parse_manifest(
            "version: 1\ndefaults:\n  registry: r.io\n",
        )
        .expect("valid manifest");
        manifest.defaults.base_path = Some(PathBuf::from("/repo"));
        let options = WorkflowOptions::for_manifest(&manifest);
        assert_eq!(options.registry.as_deref(), Some("r.io"));
        assert_eq!(options.base_path, PathBuf::from("/repo"));
    }

    #[test]
    fn write_workflow_creates_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(".github/workflows/build.yml");
        write_workflow(&jobs(), &options(), &path).expect("should write");

        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.contains("myapp-v1"));
        assert!(content.contains("Build myapp:v2"));
    }
}
