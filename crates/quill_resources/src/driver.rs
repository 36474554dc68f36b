//! The nested compilation driver.
//!
//! One call compiles one resource: reject code modules, run the sub-build,
//! record its file dependencies, evaluate the emitted module, and check the
//! shape of the exported value.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use quill_bundle::{evaluate, is_code_module, ResourceKind, Value, RESOURCE_SCHEME};
use quill_cache::{CompilationOutput, DependencyGraph};
use quill_common::{normalize, NormalizedPath};
use quill_diagnostics::DiagnosticSink;

use crate::error::ResourceError;
use crate::runner::{EntryDescriptor, SubBuildRunner};

static INLINE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Allocates a process-unique synthetic entry id for inline data.
pub fn next_inline_id(kind: ResourceKind) -> NormalizedPath {
    let n = INLINE_COUNTER.fetch_add(1, Ordering::Relaxed);
    normalize(format!("{RESOURCE_SCHEME}{n}.{}", kind.extension()))
}

/// What to compile.
#[derive(Debug, Clone, Copy)]
pub enum CompileRequest<'a> {
    /// A resource file.
    File(&'a Path),
    /// Inline data and the MIME type selecting its transform.
    Inline {
        /// The resource text.
        data: &'a str,
        /// e.g. `text/css`.
        mime: &'a str,
    },
}

/// Compiles single resources through a [`SubBuildRunner`].
pub struct ResourceCompiler {
    runner: Arc<dyn SubBuildRunner>,
}

impl ResourceCompiler {
    /// Creates a driver on top of `runner`.
    pub fn new(runner: Arc<dyn SubBuildRunner>) -> Self {
        Self { runner }
    }

    /// Compiles one resource.
    ///
    /// File dependencies of file-backed resources are recorded in `graph`
    /// before the emitted module is evaluated, so they survive failed builds.
    /// Sub-build diagnostics go to `sink`. `Err` is returned only for code
    /// modules, sub-build setup failures, and exports of the wrong shape.
    pub fn compile(
        &self,
        request: CompileRequest<'_>,
        graph: &RwLock<DependencyGraph>,
        sink: &DiagnosticSink,
    ) -> Result<CompilationOutput, ResourceError> {
        let (entry, resource_key) = match request {
            CompileRequest::File(path) => {
                let key = normalize(path);
                if is_code_module(key.as_str()) {
                    return Err(ResourceError::UnsupportedResourceType {
                        path: path.display().to_string(),
                    });
                }
                (EntryDescriptor::File(key.clone()), Some(key))
            }
            CompileRequest::Inline { data, mime } => {
                let id = next_inline_id(ResourceKind::from_mime(mime));
                let entry = EntryDescriptor::Inline {
                    id,
                    data: data.to_string(),
                };
                (entry, None)
            }
        };

        tracing::debug!(entry = %entry.entry_path(), "compiling resource");
        let output = self.runner.run_isolated(&entry)?;

        if let Some(key) = resource_key {
            graph
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .record_dependencies(key, output.file_dependencies.iter().cloned());
        }

        let success = !output.has_errors();
        sink.extend(output.diagnostics);

        let content = match output.emitted_code.as_deref().and_then(evaluate_quietly) {
            Some(value) => extract_export(entry.entry_path(), value)?,
            None => String::new(),
        };

        tracing::debug!(entry = %entry.entry_path(), success, bytes = content.len(), "resource compiled");
        Ok(CompilationOutput {
            content,
            map: output.map,
            success,
        })
    }
}

/// Evaluates an emitted module, treating any failure as "no value".
///
/// A throwing module is how the engine reports build errors, which already
/// reached the diagnostic sink.
fn evaluate_quietly(code: &str) -> Option<Value> {
    match evaluate(code) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(%err, "resource module evaluation failed");
            None
        }
    }
}

/// Accepts a string or an object whose `default` field is a string.
fn extract_export(resource: &NormalizedPath, value: Value) -> Result<String, ResourceError> {
    let found = match value {
        Value::Str(s) => return Ok(s),
        Value::Object(mut fields) => match fields.remove("default") {
            Some(Value::Str(s)) => return Ok(s),
            Some(other) => format!("an object whose 'default' is a {}", other.type_name()),
            None => "an object without 'default'".to_string(),
        },
    };
    Err(ResourceError::InvalidResourceExport {
        resource: resource.to_string(),
        found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::SubBuildOutput;
    use quill_diagnostics::{Category, Diagnostic, DiagnosticCode};
    use std::collections::BTreeSet;

    struct Fixed(SubBuildOutput);

    impl SubBuildRunner for Fixed {
        fn run_isolated(&self, _entry: &EntryDescriptor) -> Result<SubBuildOutput, ResourceError> {
            Ok(self.0.clone())
        }
    }

    fn output(code: &str, deps: &[&str], error: bool) -> SubBuildOutput {
        SubBuildOutput {
            emitted_code: Some(code.to_string()),
            map: None,
            diagnostics: if error {
                vec![Diagnostic::error(DiagnosticCode::new(Category::Error, 301), "boom")]
            } else {
                Vec::new()
            },
            file_dependencies: deps.iter().map(normalize).collect::<BTreeSet<_>>(),
        }
    }

    fn compile(out: SubBuildOutput, request: CompileRequest<'_>) -> (Result<CompilationOutput, ResourceError>, DependencyGraph, DiagnosticSink) {
        let driver = ResourceCompiler::new(Arc::new(Fixed(out)));
        let graph = RwLock::new(DependencyGraph::new());
        let sink = DiagnosticSink::new();
        let result = driver.compile(request, &graph, &sink);
        (result, graph.into_inner().unwrap(), sink)
    }

    #[test]
    fn plain_string_export() {
        let (result, graph, _) = compile(
            output("module.exports = '<p></p>';", &["/t.html"], false),
            CompileRequest::File(Path::new("/t.html")),
        );
        let out = result.unwrap();
        assert_eq!(out.content, "<p></p>");
        assert!(out.success);
        assert!(graph.dependents("/t.html").contains("/t.html"));
    }

    #[test]
    fn default_export() {
        let (result, _, _) = compile(
            output("exports.default = 'a{}';", &[], false),
            CompileRequest::File(Path::new("/a.css")),
        );
        assert_eq!(result.unwrap().content, "a{}");
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let (result, graph, _) = compile(
            output("exports.other = 'a{}';", &["/a.css"], false),
            CompileRequest::File(Path::new("/a.css")),
        );
        assert!(matches!(result, Err(ResourceError::InvalidResourceExport { .. })));
        assert!(graph.dependents("/a.css").contains("/a.css"));

        let (result, _, _) = compile(
            output("exports.default = { x: 'y' };", &[], false),
            CompileRequest::File(Path::new("/a.css")),
        );
        assert!(matches!(
            result,
            Err(ResourceError::InvalidResourceExport { found, .. }) if found.contains("object")
        ));
    }

    #[test]
    fn failed_build_records_dependencies_and_swallows_throw() {
        let (result, graph, sink) = compile(
            output("throw 'boom';", &["/a.scss", "/_vars.scss"], true),
            CompileRequest::File(Path::new("/a.scss")),
        );
        let out = result.unwrap();
        assert!(!out.success);
        assert_eq!(out.content, "");
        assert!(graph.dependents("/_vars.scss").contains("/a.scss"));
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn code_modules_are_rejected_before_running() {
        struct Panics;
        impl SubBuildRunner for Panics {
            fn run_isolated(&self, _entry: &EntryDescriptor) -> Result<SubBuildOutput, ResourceError> {
                panic!("must not run");
            }
        }
        let driver = ResourceCompiler::new(Arc::new(Panics));
        let graph = RwLock::new(DependencyGraph::new());
        let sink = DiagnosticSink::new();
        let err = driver
            .compile(CompileRequest::File(Path::new("src/foo.ts")), &graph, &sink)
            .unwrap_err();
        assert!(matches!(err, ResourceError::UnsupportedResourceType { .. }));
    }

    #[test]
    fn inline_does_not_touch_graph() {
        let (result, graph, _) = compile(
            output("exports.default = 'p{}';", &["/_vars.scss"], false),
            CompileRequest::Inline {
                data: "p{}",
                mime: "text/css",
            },
        );
        assert_eq!(result.unwrap().content, "p{}");
        assert_eq!(graph.resource_count(), 0);
    }

    #[test]
    fn inline_ids_are_unique() {
        let a = next_inline_id(ResourceKind::Css);
        let b = next_inline_id(ResourceKind::Css);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("quill-resource:"));
        assert!(a.as_str().ends_with(".css"));
        assert!(next_inline_id(ResourceKind::Scss).as_str().ends_with(".scss"));
    }
}
