//! Running one resource through an isolated sub-build.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use quill_bundle::{Compiler, FileSystem, HookSurface, InlineOverlay, OutputOptions};
use quill_common::NormalizedPath;
use quill_diagnostics::Diagnostic;

use crate::error::ResourceError;
use crate::hooks::{select_hook_adapter, CapturedOutput, SubBuildHookAdapter};

/// The single entry point of a sub-build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDescriptor {
    /// A resource file on disk.
    File(NormalizedPath),
    /// Inline data served under a synthetic `quill-resource:` id.
    Inline {
        /// The synthetic entry path; its extension selects the transform.
        id: NormalizedPath,
        /// The resource text.
        data: String,
    },
}

impl EntryDescriptor {
    /// The path the sub-build starts from.
    pub fn entry_path(&self) -> &NormalizedPath {
        match self {
            EntryDescriptor::File(path) => path,
            EntryDescriptor::Inline { id, .. } => id,
        }
    }

    /// Name of the emitted module asset.
    pub fn output_name(&self) -> String {
        let path = self.entry_path();
        let name = path.file_name().unwrap_or(path.as_str());
        format!("{}.js", name.replace(':', "-"))
    }
}

/// Everything a sub-build reported back.
#[derive(Debug, Clone, Default)]
pub struct SubBuildOutput {
    /// The emitted module, captured before it reached the output.
    pub emitted_code: Option<String>,
    /// The adjacent source map.
    pub map: Option<String>,
    /// Errors and warnings of the sub-build.
    pub diagnostics: Vec<Diagnostic>,
    /// Every file the sub-build read or probed.
    pub file_dependencies: BTreeSet<NormalizedPath>,
}

impl SubBuildOutput {
    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Runs isolated sub-builds on behalf of the parent build.
pub trait SubBuildRunner: Send + Sync {
    /// Builds `entry` to completion and returns its captured output.
    fn run_isolated(&self, entry: &EntryDescriptor) -> Result<SubBuildOutput, ResourceError>;
}

/// A [`SubBuildRunner`] backed by the quill engine.
pub struct EngineRunner {
    compiler: Compiler,
    adapter: Box<dyn SubBuildHookAdapter>,
}

impl EngineRunner {
    /// Wraps `compiler`, probing it once for its hook surface.
    pub fn new(compiler: Compiler) -> Self {
        let adapter = select_hook_adapter(&compiler);
        tracing::debug!(engine = %compiler.version(), surface = %adapter.surface(), "resource runner ready");
        Self { compiler, adapter }
    }

    /// The parent compiler.
    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    /// The hook surface output is captured through.
    pub fn surface(&self) -> HookSurface {
        self.adapter.surface()
    }
}

impl SubBuildRunner for EngineRunner {
    fn run_isolated(&self, entry: &EntryDescriptor) -> Result<SubBuildOutput, ResourceError> {
        let output_name = entry.output_name();
        let overlay: Option<Arc<dyn FileSystem>> = match entry {
            EntryDescriptor::File(_) => None,
            EntryDescriptor::Inline { id, data } => {
                let mut overlay = InlineOverlay::new(Arc::clone(self.compiler.fs()));
                overlay.insert(id.clone(), data.as_str());
                Some(Arc::new(overlay))
            }
        };

        let mut child = self.compiler.create_child_compiler(
            "quill-resource",
            OutputOptions {
                filename: output_name.clone(),
            },
            overlay,
        );
        let slot = Arc::new(Mutex::new(CapturedOutput::default()));
        self.adapter
            .attach(&mut child, &output_name, Arc::clone(&slot))
            .map_err(|err| ResourceError::SubBuild {
                resource: entry.entry_path().to_string(),
                message: err.to_string(),
            })?;

        let run = child.run_as_child(entry.entry_path());
        if !run.assets.is_empty() {
            tracing::warn!(
                entry = %entry.entry_path(),
                leftover = run.assets.len(),
                "sub-build left assets behind"
            );
        }

        let captured = std::mem::take(&mut *slot.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(SubBuildOutput {
            emitted_code: captured.code,
            map: captured.map,
            diagnostics: run.diagnostics,
            file_dependencies: run.file_dependencies,
        })
    }
}
