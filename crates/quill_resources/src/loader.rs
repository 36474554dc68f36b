//! The update/invalidation coordinator.
//!
//! A [`ResourceLoader`] belongs to one build session. The parent build calls
//! [`update`](ResourceLoader::update) at the start of every build, then
//! requests resources with [`get`](ResourceLoader::get) and
//! [`process`](ResourceLoader::process), possibly from several threads.
//! `update` must not run concurrently with those requests.
//!
//! The dependency graph survives every kind of rebuild. The artifact cache
//! is cleared by a full rebuild and pruned by an incremental one.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};

use quill_bundle::is_code_module;
use quill_cache::{ArtifactCache, DependencyGraph};
use quill_common::{normalize, NormalizedPath};
use quill_diagnostics::{Diagnostic, DiagnosticSink};

use crate::driver::{CompileRequest, ResourceCompiler};
use crate::error::ResourceError;
use crate::runner::SubBuildRunner;

type Outcome = Result<String, ResourceError>;

/// A compilation some thread is already running.
#[derive(Default)]
struct InFlight {
    outcome: Mutex<Option<Outcome>>,
    ready: Condvar,
}

impl InFlight {
    fn complete(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut guard = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = self.ready.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

type InFlightTable = Mutex<HashMap<NormalizedPath, Arc<InFlight>>>;

/// The leader's claim on an in-flight compilation.
///
/// Dropping it releases the key and wakes every waiter, with an error if no
/// outcome was recorded because the compilation unwound.
struct LeaderSlot<'a> {
    table: &'a InFlightTable,
    key: NormalizedPath,
    flight: Arc<InFlight>,
    outcome: Option<Outcome>,
}

impl Drop for LeaderSlot<'_> {
    fn drop(&mut self) {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        let outcome = self.outcome.take().unwrap_or_else(|| {
            tracing::warn!(resource = %self.key, "resource compilation panicked");
            Err(ResourceError::SubBuild {
                resource: self.key.to_string(),
                message: "compilation panicked".to_string(),
            })
        });
        self.flight.complete(outcome);
    }
}

/// Caches compiled resources and invalidates them by file dependency.
#[derive(Default)]
pub struct ResourceLoader {
    context: RwLock<Option<Arc<dyn SubBuildRunner>>>,
    graph: RwLock<DependencyGraph>,
    cache: RwLock<ArtifactCache>,
    modified: RwLock<HashSet<NormalizedPath>>,
    in_flight: InFlightTable,
    sink: DiagnosticSink,
}

impl ResourceLoader {
    /// Creates a loader with no parent context bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a build cycle.
    ///
    /// Binds `context` as the parent build. With `changed_files` absent the
    /// whole cache is dropped; otherwise only resources depending on a
    /// changed file are evicted and remembered as modified. The dependency
    /// graph is kept either way.
    pub fn update(&self, context: Arc<dyn SubBuildRunner>, changed_files: Option<&[PathBuf]>) {
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = Some(context);

        let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let mut modified = self.modified.write().unwrap_or_else(PoisonError::into_inner);
        modified.clear();

        match changed_files {
            None => {
                tracing::debug!(dropped = cache.len(), "full rebuild: resource cache cleared");
                cache.clear();
            }
            Some(files) => {
                for file in files {
                    let key = normalize(file);
                    for resource in graph.dependents(key.as_str()) {
                        cache.remove(resource.as_str());
                        tracing::debug!(resource = %resource, file = %key, "resource invalidated");
                        modified.insert(resource);
                    }
                }
                tracing::debug!(
                    changed = files.len(),
                    invalidated = modified.len(),
                    "incremental rebuild"
                );
            }
        }
    }

    fn runner(&self) -> Result<Arc<dyn SubBuildRunner>, ResourceError> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ResourceError::MissingParentContext)
    }

    fn cached(&self, key: &str) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|output| output.content.clone())
    }

    /// Returns the compiled content of the resource at `file_path`.
    ///
    /// A cache hit returns without compiling. Concurrent requests for the
    /// same uncached resource share one compilation. Only successful
    /// compilations are cached.
    pub fn get(&self, file_path: impl AsRef<Path>) -> Result<String, ResourceError> {
        let file_path = file_path.as_ref();
        let key = normalize(file_path);
        if is_code_module(key.as_str()) {
            return Err(ResourceError::UnsupportedResourceType {
                path: file_path.display().to_string(),
            });
        }

        if let Some(content) = self.cached(key.as_str()) {
            tracing::trace!(resource = %key, "resource cache hit");
            return Ok(content);
        }
        let runner = self.runner()?;

        let (flight, leader) = {
            let mut table = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match table.get(&key) {
                Some(flight) => (Arc::clone(flight), false),
                None => {
                    let flight = Arc::new(InFlight::default());
                    table.insert(key.clone(), Arc::clone(&flight));
                    (flight, true)
                }
            }
        };
        if !leader {
            tracing::trace!(resource = %key, "waiting on in-flight compilation");
            return flight.wait();
        }
        let mut slot = LeaderSlot {
            table: &self.in_flight,
            key,
            flight,
            outcome: None,
        };

        // A previous leader may have finished between the cache check and
        // taking the in-flight slot.
        let outcome = match self.cached(slot.key.as_str()) {
            Some(content) => Ok(content),
            None => self.compile_file(runner, &slot.key),
        };
        slot.outcome = Some(outcome.clone());
        outcome
    }

    fn compile_file(&self, runner: Arc<dyn SubBuildRunner>, key: &NormalizedPath) -> Outcome {
        tracing::debug!(resource = %key, "resource cache miss");
        let output = ResourceCompiler::new(runner).compile(
            CompileRequest::File(key.as_path()),
            &self.graph,
            &self.sink,
        )?;
        let content = output.content.clone();
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), output);
        Ok(content)
    }

    /// Compiles inline resource data. Never cached.
    ///
    /// Whitespace-only data yields `""` without compiling.
    pub fn process(&self, data: &str, mime_type: &str) -> Result<String, ResourceError> {
        if data.trim().is_empty() {
            return Ok(String::new());
        }
        let runner = self.runner()?;
        let output = ResourceCompiler::new(runner).compile(
            CompileRequest::Inline {
                data,
                mime: mime_type,
            },
            &self.graph,
            &self.sink,
        )?;
        Ok(output.content)
    }

    /// Files the resource at `file_path` read when it was last compiled.
    pub fn resource_dependencies(&self, file_path: impl AsRef<Path>) -> HashSet<NormalizedPath> {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dependencies(normalize(file_path).as_str())
    }

    /// Resources that read `file` when they were last compiled.
    pub fn affected_resources(&self, file: impl AsRef<Path>) -> HashSet<NormalizedPath> {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dependents(normalize(file).as_str())
    }

    /// Overwrites the resources affected by `file`.
    ///
    /// Only the reverse direction changes; the caller is responsible for
    /// keeping it consistent with [`resource_dependencies`](Self::resource_dependencies).
    pub fn set_affected_resources<P: AsRef<Path>>(
        &self,
        file: impl AsRef<Path>,
        resources: impl IntoIterator<Item = P>,
    ) {
        self.graph
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_dependents(normalize(file), resources.into_iter().map(normalize));
    }

    /// Resources evicted by the most recent [`update`](Self::update).
    pub fn modified_resource_files(&self) -> HashSet<NormalizedPath> {
        self.modified
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every file some resource depends on, sorted.
    pub fn watched_files(&self) -> Vec<NormalizedPath> {
        let mut files: Vec<NormalizedPath> = self
            .graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .files()
            .cloned()
            .collect();
        files.sort();
        files
    }

    /// Whether a successful compilation of `file_path` is cached.
    pub fn is_cached(&self, file_path: impl AsRef<Path>) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(normalize(file_path).as_str())
            .is_some()
    }

    /// Number of cached resources.
    pub fn cached_count(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Diagnostics reported by sub-builds so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.sink.diagnostics()
    }

    /// Drains the accumulated diagnostics.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.sink.take_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{EntryDescriptor, SubBuildOutput};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Echo {
        calls: AtomicUsize,
    }

    impl SubBuildRunner for Echo {
        fn run_isolated(&self, entry: &EntryDescriptor) -> Result<SubBuildOutput, ResourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = entry.entry_path().clone();
            Ok(SubBuildOutput {
                emitted_code: Some(format!("module.exports = '{path}';")),
                file_dependencies: [path].into_iter().collect(),
                ..SubBuildOutput::default()
            })
        }
    }

    #[test]
    fn requests_before_update_fail() {
        let loader = ResourceLoader::new();
        assert_eq!(loader.get("/a.css"), Err(ResourceError::MissingParentContext));
        assert_eq!(
            loader.process("a{}", "text/css"),
            Err(ResourceError::MissingParentContext)
        );
    }

    #[test]
    fn blank_inline_data_short_circuits_even_without_context() {
        let loader = ResourceLoader::new();
        assert_eq!(loader.process(" \n", "text/css"), Ok(String::new()));
    }

    #[test]
    fn keys_are_normalized() {
        let echo = Arc::new(Echo::default());
        let loader = ResourceLoader::new();
        loader.update(echo.clone(), None);
        assert_eq!(loader.get("/src/a.css").unwrap(), "/src/a.css");
        assert_eq!(loader.get("/src/./x/../a.css").unwrap(), "/src/a.css");
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn watched_files_and_set_affected() {
        let loader = ResourceLoader::new();
        loader.update(Arc::new(Echo::default()), None);
        loader.get("/b.css").unwrap();
        loader.get("/a.css").unwrap();
        assert_eq!(loader.watched_files(), [normalize("/a.css"), normalize("/b.css")]);

        loader.set_affected_resources("/shared.css", ["/a.css", "/b.css"]);
        assert_eq!(loader.affected_resources("/shared.css").len(), 2);
        loader.update(Arc::new(Echo::default()), Some(&[PathBuf::from("/shared.css")]));
        assert_eq!(loader.modified_resource_files().len(), 2);
        assert_eq!(loader.cached_count(), 0);
    }

    #[test]
    fn concurrent_gets_share_one_compilation() {
        struct Slow {
            calls: AtomicUsize,
        }
        impl SubBuildRunner for Slow {
            fn run_isolated(&self, _entry: &EntryDescriptor) -> Result<SubBuildOutput, ResourceError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(50));
                Ok(SubBuildOutput {
                    emitted_code: Some("exports.default = 'x';".to_string()),
                    ..SubBuildOutput::default()
                })
            }
        }

        let slow = Arc::new(Slow {
            calls: AtomicUsize::new(0),
        });
        let loader = ResourceLoader::new();
        loader.update(slow.clone(), None);
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| loader.get("/a.css"))).collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap().unwrap(), "x");
            }
        });
        assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_compilation_releases_waiters() {
        struct PanicsOnce {
            calls: AtomicUsize,
            entered: Mutex<std::sync::mpsc::Sender<()>>,
        }
        impl SubBuildRunner for PanicsOnce {
            fn run_isolated(&self, _entry: &EntryDescriptor) -> Result<SubBuildOutput, ResourceError> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    self.entered.lock().unwrap().send(()).unwrap();
                    std::thread::sleep(std::time::Duration::from_millis(200));
                    panic!("runner blew up");
                }
                Ok(SubBuildOutput {
                    emitted_code: Some("exports.default = 'x';".to_string()),
                    ..SubBuildOutput::default()
                })
            }
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let runner = Arc::new(PanicsOnce {
            calls: AtomicUsize::new(0),
            entered: Mutex::new(tx),
        });
        let loader = ResourceLoader::new();
        loader.update(runner.clone(), None);

        std::thread::scope(|scope| {
            let leader = scope.spawn(|| loader.get("/a.css"));
            rx.recv().unwrap();
            let waiter = scope.spawn(|| loader.get("/a.css"));

            assert!(leader.join().is_err());
            let err = waiter.join().unwrap().unwrap_err();
            assert!(matches!(err, ResourceError::SubBuild { ref resource, .. } if resource == "/a.css"));
        });

        assert!(loader.in_flight.lock().unwrap().is_empty());
        assert_eq!(loader.get("/a.css").unwrap(), "x");
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }
}
