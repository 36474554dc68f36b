//! The quill build engine.
//!
//! A deliberately small bundler: a [`Compiler`] holds the parent build
//! context (project directory, file system, resolver options) and spawns
//! [`ChildCompiler`]s that turn a single stylesheet or template entry into an
//! emitted JavaScript-shaped module. Plugins observe the emitted assets
//! through one of two hook surfaces, depending on the engine's major
//! version. The [`sandbox`] evaluates emitted modules to recover the final
//! string value.

#![warn(missing_docs)]

pub mod codes;
pub mod compilation;
pub mod emit;
pub mod error;
pub mod fs;
pub mod kind;
pub mod resolve;
pub mod sandbox;
pub mod transform;

pub use compilation::{
    Asset, AssetTable, ChildCompiler, ChildRun, CompilationHooks, Compiler, EngineVersion,
    HookSurface, OutputOptions, ProcessAssetsStage,
};
pub use error::EngineError;
pub use fs::{FileSystem, InlineOverlay, MemoryFs, NativeFs, RESOURCE_SCHEME};
pub use kind::{is_code_module, ResourceKind};
pub use resolve::{Probe, ResolveOptions, Resolver};
pub use sandbox::{evaluate, EvalError, Value};
