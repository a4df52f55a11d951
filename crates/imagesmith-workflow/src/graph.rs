//! Job dependency graph using `petgraph`.
//!
//! Edges point from a job to the jobs it needs. Ordering is a depth-first
//! traversal that visits jobs in insertion order and dependencies in the
//! order they were added, so the result is stable across runs.

use std::collections::HashMap;

use imagesmith_common::error::{ImagesmithError, Result};
use imagesmith_common::types::JobId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::job::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Visited,
}

/// A dependency graph of build jobs.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<JobId, ()>,
    nodes: HashMap<JobId, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job node, or returns the existing node for `id`.
    pub fn add_job(&mut self, id: JobId) -> NodeIndex {
        if let Some(&index) = self.nodes.get(&id) {
            return index;
        }
        let index = self.graph.add_node(id.clone());
        let _ = self.nodes.insert(id, index);
        index
    }

    /// Looks up the node for `id`.
    #[must_use]
    pub fn node(&self, id: &JobId) -> Option<NodeIndex> {
        self.nodes.get(id).copied()
    }

    /// Records that `dependent` needs `dependency` to finish first.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) {
        let _ = self.graph.add_edge(dependent, dependency, ());
    }

    /// Returns job IDs with every dependency before its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`ImagesmithError::CircularDependency`] if the graph has a
    /// cycle.
    pub fn resolve_order(&self) -> Result<Vec<JobId>> {
        Ok(self
            .order()?
            .into_iter()
            .map(|index| self.graph[index].clone())
            .collect())
    }

    fn order(&self) -> Result<Vec<NodeIndex>> {
        let mut marks = vec![None; self.graph.node_count()];
        let mut sorted = Vec::with_capacity(self.graph.node_count());
        for index in self.graph.node_indices() {
            self.visit(index, &mut marks, &mut sorted)?;
        }
        Ok(sorted)
    }

    fn visit(
        &self,
        index: NodeIndex,
        marks: &mut [Option<Mark>],
        sorted: &mut Vec<NodeIndex>,
    ) -> Result<()> {
        match marks[index.index()] {
            Some(Mark::Visited) => return Ok(()),
            Some(Mark::Visiting) => return Err(self.cycle_error(index)),
            None => {}
        }

        marks[index.index()] = Some(Mark::Visiting);
        for dependency in self.dependencies(index) {
            self.visit(dependency, marks, sorted)?;
        }
        marks[index.index()] = Some(Mark::Visited);
        sorted.push(index);
        Ok(())
    }

    /// Outgoing neighbors in the order their edges were added.
    fn dependencies(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self.graph.edges(index).collect();
        edges.sort_by_key(|edge| edge.id());
        edges.into_iter().map(|edge| edge.target()).collect()
    }

    fn cycle_error(&self, index: NodeIndex) -> ImagesmithError {
        let mut cycle: Vec<String> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.contains(&index))
            .unwrap_or_else(|| vec![index])
            .into_iter()
            .map(|member| self.graph[member].to_string())
            .collect();
        cycle.sort();
        ImagesmithError::CircularDependency {
            job: self.graph[index].to_string(),
            cycle,
        }
    }
}

/// Orders jobs so that each comes after every job it needs.
///
/// Jobs keep their relative order where dependencies allow. Needs that do
/// not name a job in `jobs` are ignored.
///
/// # Errors
///
/// Returns [`ImagesmithError::CircularDependency`] if the jobs form a
/// cycle, or [`ImagesmithError::Config`] if two jobs share an ID.
pub fn order_jobs(jobs: Vec<Job>) -> Result<Vec<Job>> {
    let mut graph = DependencyGraph::new();
    for job in &jobs {
        if graph.node(&job.id).is_some() {
            return Err(ImagesmithError::Config {
                message: format!("duplicate job id {} ({})", job.id, job.name),
            });
        }
        let _ = graph.add_job(job.id.clone());
    }

    for job in &jobs {
        let Some(dependent) = graph.node(&job.id) else {
            continue;
        };
        for need in &job.needs {
            match graph.node(need) {
                Some(dependency) => graph.add_dependency(dependent, dependency),
                None => tracing::warn!(job = %job.id, need = %need, "ignoring unknown job"),
            }
        }
    }

    let order = graph.order()?;
    let mut slots: Vec<Option<Job>> = jobs.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|index| slots.get_mut(index.index()).and_then(Option::take))
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn id(s: &str) -> JobId {
        JobId::new(s)
    }

    fn names(order: &[JobId]) -> Vec<&str> {
        order.iter().map(JobId::as_str).collect()
    }

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new();
        let order = graph.resolve_order().expect("should resolve");
        assert!(order.is_empty());
    }

    #[test]
    fn single_node_resolves() {
        let mut graph = DependencyGraph::new();
        let _ = graph.add_job(id("api"));
        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(names(&order), vec!["api"]);
    }

    #[test]
    fn adding_a_job_twice_reuses_the_node() {
        let mut graph = DependencyGraph::new();
        let first = graph.add_job(id("api"));
        let second = graph.add_job(id("api"));
        assert_eq!(first, second);
    }

    #[test]
    fn linear_dependency_chain() {
        let mut graph = DependencyGraph::new();
        let api = graph.add_job(id("api"));
        let db = graph.add_job(id("db"));
        graph.add_dependency(api, db);

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(names(&order), vec!["db", "api"]);
    }

    #[test]
    fn diamond_dependency() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_job(id("a"));
        let b = graph.add_job(id("b"));
        let c = graph.add_job(id("c"));
        let d = graph.add_job(id("d"));
        graph.add_dependency(a, b);
        graph.add_dependency(a, c);
        graph.add_dependency(b, d);
        graph.add_dependency(c, d);

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(names(&order), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn dependencies_follow_insertion_order() {
        let mut graph = DependencyGraph::new();
        let app = graph.add_job(id("app"));
        let z = graph.add_job(id("z"));
        let y = graph.add_job(id("y"));
        graph.add_dependency(app, z);
        graph.add_dependency(app, y);

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(names(&order), vec!["z", "y", "app"]);
    }

    #[test]
    fn cycle_detection() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_job(id("a"));
        let b = graph.add_job(id("b"));
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);

        let err = graph.resolve_order().expect_err("cycle");
        match err {
            ImagesmithError::CircularDependency { job, cycle } => {
                assert_eq!(job, "a");
                assert_eq!(cycle, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn three_node_cycle_excludes_outsiders() {
        let mut graph = DependencyGraph::new();
        let root = graph.add_job(id("root"));
        let a = graph.add_job(id("a"));
        let b = graph.add_job(id("b"));
        let c = graph.add_job(id("c"));
        graph.add_dependency(root, a);
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);
        graph.add_dependency(c, a);

        let err = graph.resolve_order().expect_err("cycle");
        match err {
            ImagesmithError::CircularDependency { cycle, .. } => {
                assert_eq!(cycle, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_job(id("a"));
        graph.add_dependency(a, a);
        assert!(graph.resolve_order().is_err());
    }

    #[test]
    fn independent_nodes_keep_insertion_order() {
        let mut graph = DependencyGraph::new();
        let _ = graph.add_job(id("x"));
        let _ = graph.add_job(id("y"));
        let _ = graph.add_job(id("z"));

        let order = graph.resolve_order().expect("should resolve");
        assert_eq!(names(&order), vec!["x", "y", "z"]);
    }

    fn job(image: &str, needs: &[&str]) -> Job {
        let mut job = Job::new(image, "v1", format!("images/{image}/v1/Dockerfile"));
        job.needs = needs.iter().map(|n| id(n)).collect();
        job
    }

    #[test]
    fn order_jobs_moves_dependencies_first() {
        let jobs = vec![
            job("a", &["b-v1", "c-v1"]),
            job("b", &["d-v1"]),
            job("c", &["d-v1"]),
            job("d", &[]),
        ];
        let ordered = order_jobs(jobs).expect("should order");
        let ids: Vec<&str> = ordered.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["d-v1", "b-v1", "c-v1", "a-v1"]);
        assert_eq!(ordered[3].needs, vec![id("b-v1"), id("c-v1")]);
    }

    #[test]
    fn order_jobs_cycle_returns_no_order() {
        let jobs = vec![job("a", &["b-v1"]), job("b", &["a-v1"])];
        let err = order_jobs(jobs).expect_err("cycle");
        assert!(err.to_string().contains("circular dependency"), "got: {err}");
    }

    #[test]
    fn order_jobs_ignores_unknown_needs() {
        let jobs = vec![job("a", &["ghost-v1"]), job("b", &[])];
        let ordered = order_jobs(jobs).expect("should order");
        assert_eq!(ordered.len(), 2);
        assert_eq!(ordered[0].id.as_str(), "a-v1");
    }

    #[test]
    fn order_jobs_rejects_duplicate_ids() {
        let jobs = vec![job("my.app", &[]), job("my-app", &[])];
        let err = order_jobs(jobs).expect_err("duplicate");
        assert!(matches!(err, ImagesmithError::Config { .. }));
    }
}
