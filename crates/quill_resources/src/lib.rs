//! Incremental compilation of component resources.
//!
//! Stylesheets and templates referenced from source modules are compiled
//! through isolated child builds of the [`quill_bundle`] engine. The
//! [`ResourceLoader`] caches each successful result under its normalized
//! path, records which files every resource read, and on each incremental
//! rebuild evicts exactly the resources whose dependencies changed.

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod hooks;
pub mod loader;
pub mod runner;

pub use driver::{CompileRequest, ResourceCompiler};
pub use error::ResourceError;
pub use hooks::{select_hook_adapter, CapturedOutput, LegacyAssetHooks, ProcessAssetsHooks, SubBuildHookAdapter};
pub use loader::ResourceLoader;
pub use runner::{EngineRunner, EntryDescriptor, SubBuildOutput, SubBuildRunner};
