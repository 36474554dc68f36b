//! Error types for cache operations.

use std::path::PathBuf;

/// Errors raised while fingerprinting files.
///
/// Snapshotting is fail-safe: an unreadable file is simply absent from the
/// snapshot (and so reported as deleted). This type surfaces only from the
/// single-file API.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading a file to hash it.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
