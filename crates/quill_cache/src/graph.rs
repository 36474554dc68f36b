//! Bidirectional resource/file dependency edges.
//!
//! The forward map answers "which files did this resource's sub-build read?"
//! and the reverse map answers "which resources must be recompiled when this
//! file changes?". [`DependencyGraph::record_dependencies`] keeps the two in
//! step: `file ∈ forward[resource]` exactly when `resource ∈ reverse[file]`.

use std::collections::{HashMap, HashSet};

use quill_common::NormalizedPath;

/// Forward and reverse dependency maps between resources and files.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: HashMap<NormalizedPath, HashSet<NormalizedPath>>,
    reverse: HashMap<NormalizedPath, HashSet<NormalizedPath>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the dependency set of `resource` with `files`.
    ///
    /// Files that were dependencies before but are not in `files` lose their
    /// reverse edge to `resource`.
    pub fn record_dependencies(
        &mut self,
        resource: NormalizedPath,
        files: impl IntoIterator<Item = NormalizedPath>,
    ) {
        let files: HashSet<NormalizedPath> = files.into_iter().collect();

        if let Some(previous) = self.forward.get(&resource) {
            for stale in previous.difference(&files) {
                if let Some(dependents) = self.reverse.get_mut(stale) {
                    dependents.remove(&resource);
                    if dependents.is_empty() {
                        self.reverse.remove(stale);
                    }
                }
            }
        }

        for file in &files {
            self.reverse
                .entry(file.clone())
                .or_default()
                .insert(resource.clone());
        }

        tracing::trace!(resource = %resource, files = files.len(), "recorded dependencies");
        self.forward.insert(resource, files);
    }

    /// Files `resource` depends on. Empty if the resource is unknown.
    pub fn dependencies(&self, resource: &str) -> HashSet<NormalizedPath> {
        self.forward.get(resource).cloned().unwrap_or_default()
    }

    /// Resources that depend on `file`. Empty if the file is unknown.
    pub fn dependents(&self, file: &str) -> HashSet<NormalizedPath> {
        self.reverse.get(file).cloned().unwrap_or_default()
    }

    /// Overwrites the dependents of `file` directly.
    ///
    /// The forward map is not touched; a caller supplying dependents this
    /// way is responsible for keeping the two directions consistent.
    pub fn set_dependents(
        &mut self,
        file: NormalizedPath,
        resources: impl IntoIterator<Item = NormalizedPath>,
    ) {
        let resources: HashSet<NormalizedPath> = resources.into_iter().collect();
        if resources.is_empty() {
            self.reverse.remove(&file);
        } else {
            self.reverse.insert(file, resources);
        }
    }

    /// Every file that at least one resource depends on.
    pub fn files(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.reverse.keys()
    }

    /// Number of resources with a recorded dependency set.
    pub fn resource_count(&self) -> usize {
        self.forward.len()
    }
}
