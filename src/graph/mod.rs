//! Forward and reverse dependency mappings built from one edge set.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A resolved import: `source_file` depends on `target_file`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub source_file: String,
    pub target_file: String,
}

impl ResolvedDependency {
    pub fn new(source_file: impl Into<String>, target_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            target_file: target_file.into(),
        }
    }
}

/// Immutable file-level dependency graph.
///
/// `B` is in `dependencies[A]` exactly when `A` is in `dependents[B]`. Both
/// sides keep first-seen order and hold no duplicates or self-edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    dependencies: IndexMap<String, IndexSet<String>>,
    dependents: IndexMap<String, IndexSet<String>>,
}

impl DependencyGraph {
    pub fn build<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = ResolvedDependency>,
    {
        let mut graph = Self::default();
        for edge in edges {
            if edge.source_file == edge.target_file {
                continue;
            }
            graph
                .dependents
                .entry(edge.target_file.clone())
                .or_default()
                .insert(edge.source_file.clone());
            graph
                .dependencies
                .entry(edge.source_file)
                .or_default()
                .insert(edge.target_file);
        }
        graph
    }

    /// Files `path` imports, in first-seen order. Empty for unknown paths.
    pub fn dependencies_of(&self, path: &str) -> Vec<&str> {
        Self::lookup(&self.dependencies, path)
    }

    /// Files importing `path`, in first-seen order. Empty for unknown paths.
    pub fn dependents_of(&self, path: &str) -> Vec<&str> {
        Self::lookup(&self.dependents, path)
    }

    /// Every file appearing on either end of an edge, sources first.
    pub fn files(&self) -> Vec<&str> {
        let mut files: IndexSet<&str> = self.dependencies.keys().map(String::as_str).collect();
        files.extend(self.dependents.keys().map(String::as_str));
        files.into_iter().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .flat_map(|(source, targets)| targets.iter().map(move |target| (source.as_str(), target.as_str())))
    }

    fn lookup<'a>(map: &'a IndexMap<String, IndexSet<String>>, path: &str) -> Vec<&'a str> {
        map.get(path)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
