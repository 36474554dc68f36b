//! In-memory incremental state for resource compilation.
//!
//! [`ArtifactCache`] holds the last successful output per resource,
//! [`DependencyGraph`] records which files each resource's sub-build read
//! (and the reverse), and [`SourceHasher`] turns two polls of the file tree
//! into a [`ChangeSet`] that drives selective invalidation.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod graph;
pub mod hasher;

pub use artifact::{ArtifactCache, CompilationOutput};
pub use error::CacheError;
pub use graph::DependencyGraph;
pub use hasher::{ChangeSet, FileSnapshot, SourceHasher};
