//! Build jobs: one per image version.

use std::collections::HashMap;
use std::path::PathBuf;

use imagesmith_common::constants::BUILD_FILE_NAME;
use imagesmith_common::error::Result;
use imagesmith_common::types::{DependencyKey, JobId};
use imagesmith_manifest::{Image, Manifest};

use crate::extract::extract_dependencies;
use crate::graph::order_jobs;

/// A CI job building one image version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Sanitized job key.
    pub id: JobId,
    /// Human-readable name, `Build <image>:<version>`.
    pub name: String,
    /// Image name from the manifest.
    pub image: String,
    /// Version label.
    pub version: String,
    /// Rendered build file for this version.
    pub build_file: PathBuf,
    /// Jobs that must finish first.
    pub needs: Vec<JobId>,
}

impl Job {
    /// Creates a job with no dependencies.
    #[must_use]
    pub fn new(image: &str, version: &str, build_file: impl Into<PathBuf>) -> Self {
        Self {
            id: JobId::for_image(image, version),
            name: format!("Build {image}:{version}"),
            image: image.to_owned(),
            version: version.to_owned(),
            build_file: build_file.into(),
            needs: Vec::new(),
        }
    }

    /// The `<image>:<version>` key other build files reference this job by.
    #[must_use]
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.image, &self.version)
    }
}

/// Lists one job per image version, ordered by image name then version.
///
/// # Errors
///
/// Returns an error if an image root cannot be resolved.
pub fn build_jobs(manifest: &Manifest) -> Result<Vec<Job>> {
    let mut jobs = Vec::new();
    for (name, image) in &manifest.images {
        let root = image.root(manifest.defaults.base_path.as_deref())?;
        for version in image.versions.keys() {
            let build_file = Image::version_dir(&root, version)?.join(BUILD_FILE_NAME);
            jobs.push(Job::new(name, version, build_file));
        }
    }
    Ok(jobs)
}

/// Fills in each job's `needs` from the references in its build file.
///
/// References to images that are not jobs are dropped.
///
/// # Errors
///
/// Returns an error naming the job if a build file cannot be read.
pub fn link_dependencies(jobs: &mut [Job]) -> Result<()> {
    let by_key: HashMap<DependencyKey, JobId> =
        jobs.iter().map(|job| (job.key(), job.id.clone())).collect();

    for job in jobs.iter_mut() {
        let deps = extract_dependencies(&job.build_file)
            .map_err(|e| e.context(format!("parsing dependencies for {}", job.name)))?;

        job.needs = deps
            .into_iter()
            .filter_map(|key| {
                let id = by_key.get(&key).cloned();
                if id.is_none() {
                    tracing::debug!(job = %job.id, reference = %key, "reference is not a known job");
                }
                id
            })
            .collect();
    }
    Ok(())
}

/// Lists, links, and orders every job of the manifest.
///
/// # Errors
///
/// Returns an error if a build file is missing or the jobs form a cycle.
pub fn plan(manifest: &Manifest) -> Result<Vec<Job>> {
    let mut jobs = build_jobs(manifest)?;
    link_dependencies(&mut jobs)?;
    order_jobs(jobs)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use std::fs;
    use std::path::Path;

    use imagesmith_common::error::ImagesmithError;
    use imagesmith_manifest::parse_manifest;

    use super::*;

    fn manifest(base: &Path) -> Manifest {
        let mut manifest = parse_manifest(
            r"version: 1
images:
  zeta:
    path: images/zeta
    versions:
      v1: {}
  alpha:
    path: images/alpha
    versions:
      v2: {}
      v1: {}
",
        )
        .expect("valid manifest");
        manifest.defaults.base_path = Some(base.to_path_buf());
        manifest
    }

    fn write_build_file(base: &Path, image: &str, version: &str, content: &str) {
        let dir = base.join("images").join(image).join(version);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("Dockerfile"), content).expect("write");
    }

    #[test]
    fn jobs_are_enumerated_in_name_order() {
        let jobs = build_jobs(&manifest(Path::new("/repo"))).expect("should build");
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha-v1", "alpha-v2", "zeta-v1"]);
        assert_eq!(jobs[0].name, "Build alpha:v1");
        assert_eq!(
            jobs[0].build_file,
            PathBuf::from("/repo/images/alpha/v1/Dockerfile")
        );
        assert!(jobs.iter().all(|j| j.needs.is_empty()));
    }

    #[test]
    fn empty_manifest_has_no_jobs() {
        let manifest = parse_manifest("version: 1\n").expect("valid manifest");
        assert!(build_jobs(&manifest).expect("should build").is_empty());
    }

    #[test]
    fn job_ids_are_sanitized() {
        let job = Job::new("my.app", "v1.0", "Dockerfile");
        assert_eq!(job.id.as_str(), "my-app-v1-0");
        assert_eq!(job.key().as_str(), "my.app:v1.0");
    }

    #[test]
    fn link_resolves_known_references_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_build_file(dir.path(), "alpha", "v1", "FROM ubuntu:24.04\n");
        write_build_file(
            dir.path(),
            "alpha",
            "v2",
            "FROM ${REGISTRY}/alpha:v1\nCOPY --from=${REGISTRY}/external:v9 /a /a\n",
        );
        write_build_file(dir.path(), "zeta", "v1", "FROM ${REGISTRY}/alpha:v2\n");

        let mut jobs = build_jobs(&manifest(dir.path())).expect("should build");
        link_dependencies(&mut jobs).expect("should link");

        assert!(jobs[0].needs.is_empty());
        assert_eq!(jobs[1].needs, vec![JobId::new("alpha-v1")]);
        assert_eq!(jobs[2].needs, vec![JobId::new("alpha-v2")]);
    }

    #[test]
    fn numeric_version_labels_link_by_literal_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut manifest = parse_manifest(
            r"version: 1
images:
  alpine:
    path: images/alpine
    versions:
      3.2: {}
      3.20: {}
  app:
    path: images/app
    versions:
      1.10: {}
",
        )
        .expect("valid manifest");
        manifest.defaults.base_path = Some(dir.path().to_path_buf());
        write_build_file(dir.path(), "alpine", "3.2", "FROM alpine:3.2\n");
        write_build_file(dir.path(), "alpine", "3.20", "FROM alpine:3.20\n");
        write_build_file(dir.path(), "app", "1.10", "FROM ${REGISTRY}/alpine:3.20\n");

        let mut jobs = build_jobs(&manifest).expect("should build");
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["alpine-3-2", "alpine-3-20", "app-1-10"]);

        link_dependencies(&mut jobs).expect("should link");
        assert_eq!(jobs[2].needs, vec![JobId::new("alpine-3-20")]);
    }

    #[test]
    fn link_missing_build_file_names_job() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut jobs = build_jobs(&manifest(dir.path())).expect("should build");
        let err = link_dependencies(&mut jobs).expect_err("no build files");
        assert!(matches!(err, ImagesmithError::Context { .. }));
        assert!(err.to_string().contains("Build alpha:v1"), "got: {err}");
    }

    #[test]
    fn plan_orders_dependencies_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_build_file(dir.path(), "alpha", "v1", "FROM ${REGISTRY}/zeta:v1\n");
        write_build_file(dir.path(), "alpha", "v2", "FROM ${REGISTRY}/alpha:v1\n");
        write_build_file(dir.path(), "zeta", "v1", "FROM ubuntu:24.04\n");

        let jobs = plan(&manifest(dir.path())).expect("should plan");
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta-v1", "alpha-v1", "alpha-v2"]);
    }

    #[test]
    fn plan_rejects_cycles() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_build_file(dir.path(), "alpha", "v1", "FROM ${REGISTRY}/zeta:v1\n");
        write_build_file(dir.path(), "alpha", "v2", "FROM ubuntu:24.04\n");
        write_build_file(dir.path(), "zeta", "v1", "FROM ${REGISTRY}/alpha:v1\n");

        let err = plan(&manifest(dir.path())).expect_err("cycle");
        assert!(matches!(err, ImagesmithError::CircularDependency { .. }));
    }
}
