//! File fingerprinting and change detection between watch polls.
//!
//! A [`FileSnapshot`] maps each watched path to its content hash. Comparing
//! two snapshots yields a [`ChangeSet`] classifying every path as new,
//! modified, deleted, or unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use quill_common::ContentHash;

use crate::error::CacheError;

/// Content hashes of the watched files at one point in time.
pub type FileSnapshot = HashMap<PathBuf, ContentHash>;

/// Result of comparing the current snapshot against the previous one.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Files absent from the previous snapshot.
    pub new_files: Vec<PathBuf>,

    /// Files whose content hash differs from the previous snapshot.
    pub modified_files: Vec<PathBuf>,

    /// Files in the previous snapshot that are gone or unreadable now.
    pub deleted_files: Vec<PathBuf>,

    /// Files whose content hash is unchanged.
    pub unchanged_files: Vec<PathBuf>,
}

impl ChangeSet {
    /// Returns `true` if there are no new, modified, or deleted files.
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Every path whose state differs from the previous snapshot, sorted.
    ///
    /// This is the list handed to an incremental rebuild: a new file can
    /// satisfy an import that previously failed, and a deleted one must
    /// invalidate whatever imported it.
    pub fn changed_files(&self) -> Vec<PathBuf> {
        let mut all: Vec<PathBuf> = self
            .new_files
            .iter()
            .chain(&self.modified_files)
            .chain(&self.deleted_files)
            .cloned()
            .collect();
        all.sort();
        all
    }
}

/// Utility for fingerprinting files and detecting changes.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the content hash of a single file.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let content = std::fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(ContentHash::from_bytes(&content))
    }

    /// Fingerprints every readable path. Unreadable paths are left out.
    pub fn snapshot<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> FileSnapshot {
        let mut hashes = HashMap::new();
        for path in paths {
            match Self::hash_file(path) {
                Ok(hash) => {
                    hashes.insert(path.clone(), hash);
                }
                Err(err) => tracing::trace!(%err, "skipping unreadable file"),
            }
        }
        hashes
    }

    /// Compares `current` against `previous`.
    pub fn detect_changes(current: &FileSnapshot, previous: &FileSnapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for (path, hash) in current {
            match previous.get(path) {
                Some(old) if old == hash => changes.unchanged_files.push(path.clone()),
                Some(_) => changes.modified_files.push(path.clone()),
                None => changes.new_files.push(path.clone()),
            }
        }

        changes.deleted_files = previous
            .keys()
            .filter(|p| !current.contains_key(*p))
            .cloned()
            .collect();

        changes.new_files.sort();
        changes.modified_files.sort();
        changes.deleted_files.sort();
        changes.unchanged_files.sort();
        changes
    }
}
