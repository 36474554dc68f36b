//! Shared foundational types used across the quill build toolchain.
//!
//! This crate provides the path normalizer that derives every cache and
//! dependency-graph key, and content hashing for change detection.

#![warn(missing_docs)]

pub mod hash;
pub mod path;

pub use hash::ContentHash;
pub use path::{normalize, NormalizedPath};
