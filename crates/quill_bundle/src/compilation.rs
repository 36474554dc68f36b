//! The parent compiler, child compilations, and their asset hooks.
//!
//! A [`Compiler`] is the long-lived build context. Each resource is built by
//! a [`ChildCompiler`] that shares the parent's file system and resolver
//! options but owns its asset set: whatever the hooks leave in
//! [`ChildRun::assets`] is what the child would have written.
//!
//! Engine v4 exposes assets through the `additional-assets` hook, which hands
//! taps the raw asset map. Engine v5 replaced it with staged
//! `process-assets` taps working through an [`AssetTable`]. Exactly one of
//! the two is available per engine version; [`Compiler::supports`] is the
//! probe plugins use to pick one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quill_common::{normalize, NormalizedPath};
use quill_diagnostics::Diagnostic;

use crate::emit::{emit_failure, emit_module, source_map, ExportShape};
use crate::error::EngineError;
use crate::fs::FileSystem;
use crate::kind::ResourceKind;
use crate::resolve::{ResolveOptions, Resolver};
use crate::transform::transform_entry;

/// The engine's version. Only the major number changes behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EngineVersion {
    /// Major version.
    pub major: u32,
}

impl EngineVersion {
    /// The last version with the `additional-assets` hook.
    pub const LEGACY: Self = Self { major: 4 };
    /// The first version with staged `process-assets` hooks.
    pub const CURRENT: Self = Self { major: 5 };
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.major)
    }
}

/// The two asset hook surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookSurface {
    /// Taps receive the raw asset map (engine v4).
    AdditionalAssets,
    /// Staged taps receive an [`AssetTable`] (engine v5).
    ProcessAssets,
}

impl fmt::Display for HookSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookSurface::AdditionalAssets => f.write_str("additional-assets"),
            HookSurface::ProcessAssets => f.write_str("process-assets"),
        }
    }
}

/// Ordering of `process-assets` taps. Taps run from the first stage to the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessAssetsStage {
    /// Add new assets.
    Additional,
    /// Basic preprocessing of existing assets.
    PreProcess,
    /// Derive new assets from existing ones.
    Derived,
    /// Add sections to existing assets.
    Additions,
    /// Optimize existing assets.
    Optimize,
    /// Summarize the asset set.
    Summarize,
    /// Read-only reporting; the last stage.
    Report,
}

/// One emitted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// File content.
    pub source: String,
    /// Name of the source map asset belonging to this one, if any.
    pub related_map: Option<String>,
}

/// The `process-assets` view of a child's assets.
pub struct AssetTable<'a> {
    assets: &'a mut BTreeMap<String, Asset>,
}

impl<'a> AssetTable<'a> {
    fn new(assets: &'a mut BTreeMap<String, Asset>) -> Self {
        Self { assets }
    }

    /// Looks up an asset by name.
    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.get(name)
    }

    /// Removes an asset so it is not written, returning it.
    pub fn delete(&mut self, name: &str) -> Option<Asset> {
        self.assets.remove(name)
    }

    /// Names of all current assets, sorted.
    pub fn names(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }

    /// Adds a new asset.
    pub fn emit(&mut self, name: impl Into<String>, asset: Asset) -> Result<(), EngineError> {
        let name = name.into();
        if self.assets.contains_key(&name) {
            return Err(EngineError::AssetConflict { name });
        }
        self.assets.insert(name, asset);
        Ok(())
    }
}

type AdditionalAssetsTap = Box<dyn FnMut(&mut BTreeMap<String, Asset>)>;
type ProcessAssetsTap = Box<dyn FnMut(&mut AssetTable<'_>)>;

/// Hooks of one child compilation.
pub struct CompilationHooks {
    version: EngineVersion,
    additional_assets: Vec<(String, AdditionalAssetsTap)>,
    process_assets: Vec<(String, ProcessAssetsStage, ProcessAssetsTap)>,
}

impl CompilationHooks {
    fn new(version: EngineVersion) -> Self {
        Self {
            version,
            additional_assets: Vec::new(),
            process_assets: Vec::new(),
        }
    }

    fn check(&self, plugin: &str, surface: HookSurface) -> Result<(), EngineError> {
        if surface_available(self.version, surface) {
            Ok(())
        } else {
            Err(EngineError::HookUnavailable {
                plugin: plugin.to_string(),
                surface,
                major: self.version.major,
            })
        }
    }

    /// Taps the legacy `additional-assets` hook.
    pub fn tap_additional_assets(
        &mut self,
        plugin: &str,
        tap: impl FnMut(&mut BTreeMap<String, Asset>) + 'static,
    ) -> Result<(), EngineError> {
        self.check(plugin, HookSurface::AdditionalAssets)?;
        self.additional_assets.push((plugin.to_string(), Box::new(tap)));
        Ok(())
    }

    /// Taps the `process-assets` hook at `stage`.
    pub fn tap_process_assets(
        &mut self,
        plugin: &str,
        stage: ProcessAssetsStage,
        tap: impl FnMut(&mut AssetTable<'_>) + 'static,
    ) -> Result<(), EngineError> {
        self.check(plugin, HookSurface::ProcessAssets)?;
        self.process_assets.push((plugin.to_string(), stage, Box::new(tap)));
        Ok(())
    }

    fn run(&mut self, assets: &mut BTreeMap<String, Asset>) {
        for (plugin, tap) in &mut self.additional_assets {
            tracing::trace!(plugin = %plugin, "additional-assets tap");
            tap(assets);
        }
        // Stable sort keeps registration order within a stage.
        self.process_assets.sort_by_key(|(_, stage, _)| *stage);
        for (plugin, stage, tap) in &mut self.process_assets {
            tracing::trace!(plugin = %plugin, ?stage, "process-assets tap");
            tap(&mut AssetTable::new(assets));
        }
    }
}

fn surface_available(version: EngineVersion, surface: HookSurface) -> bool {
    match surface {
        HookSurface::AdditionalAssets => version < EngineVersion::CURRENT,
        HookSurface::ProcessAssets => version >= EngineVersion::CURRENT,
    }
}

/// Output naming of a child compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// Name of the emitted module asset.
    pub filename: String,
}

/// The parent build context.
pub struct Compiler {
    context: NormalizedPath,
    fs: Arc<dyn FileSystem>,
    resolve: ResolveOptions,
    source_maps: bool,
    version: EngineVersion,
}

impl Compiler {
    /// Creates a current-version compiler rooted at `context`.
    pub fn new(context: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            context: normalize(context),
            fs,
            resolve: ResolveOptions::default(),
            source_maps: false,
            version: EngineVersion::CURRENT,
        }
    }

    /// Sets the engine version.
    pub fn with_version(mut self, version: EngineVersion) -> Self {
        self.version = version;
        self
    }

    /// Sets resolver aliases.
    pub fn with_aliases(mut self, aliases: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        self.resolve = ResolveOptions::new(aliases.into_iter().map(|(alias, dir)| (alias, normalize(dir))));
        self
    }

    /// Enables or disables source map assets.
    pub fn with_source_maps(mut self, enabled: bool) -> Self {
        self.source_maps = enabled;
        self
    }

    /// The project directory.
    pub fn context(&self) -> &NormalizedPath {
        &self.context
    }

    /// The shared file system.
    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// The engine version.
    pub fn version(&self) -> EngineVersion {
        self.version
    }

    /// Returns `true` if this engine version provides `surface`.
    pub fn supports(&self, surface: HookSurface) -> bool {
        surface_available(self.version, surface)
    }

    /// Spawns a child compilation.
    ///
    /// `fs` replaces the parent's file system for this child only; pass an
    /// [`InlineOverlay`](crate::InlineOverlay) wrapping
    /// [`fs()`](Self::fs) to serve synthetic entries.
    pub fn create_child_compiler(
        &self,
        name: &str,
        output: OutputOptions,
        fs: Option<Arc<dyn FileSystem>>,
    ) -> ChildCompiler<'_> {
        ChildCompiler {
            parent: self,
            name: name.to_string(),
            output,
            fs: fs.unwrap_or_else(|| Arc::clone(&self.fs)),
            hooks: CompilationHooks::new(self.version),
        }
    }
}

/// A single-entry compilation spawned from a [`Compiler`].
pub struct ChildCompiler<'p> {
    parent: &'p Compiler,
    name: String,
    output: OutputOptions,
    fs: Arc<dyn FileSystem>,
    hooks: CompilationHooks,
}

/// What a child compilation produced.
#[derive(Debug, Default)]
pub struct ChildRun {
    /// Assets left after every tap ran. These would be written to disk.
    pub assets: BTreeMap<String, Asset>,
    /// Every on-disk file the compilation read or probed.
    pub file_dependencies: BTreeSet<NormalizedPath>,
    /// Errors and warnings.
    pub diagnostics: Vec<Diagnostic>,
}

impl ChildRun {
    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

impl ChildCompiler<'_> {
    /// The child's hooks.
    pub fn hooks_mut(&mut self) -> &mut CompilationHooks {
        &mut self.hooks
    }

    /// The output options this child was created with.
    pub fn output(&self) -> &OutputOptions {
        &self.output
    }

    /// Builds `entry` to completion and runs the asset hooks.
    pub fn run_as_child(mut self, entry: &NormalizedPath) -> ChildRun {
        tracing::debug!(child = %self.name, entry = %entry, "child compilation started");
        let kind = ResourceKind::from_path(entry);
        let resolver = Resolver::new(self.fs.as_ref(), &self.parent.resolve);
        let transformed = transform_entry(entry, kind, self.fs.as_ref(), &resolver, &self.parent.context);

        let code = match transformed.diagnostics.iter().find(|d| d.is_error()) {
            Some(first) => emit_failure(&first.message),
            None if kind.is_stylesheet() => emit_module(&transformed.chunks, ExportShape::Default),
            None => emit_module(&transformed.chunks, ExportShape::Plain),
        };

        let filename = self.output.filename.clone();
        let map_name = format!("{filename}.map");
        let mut assets = BTreeMap::new();
        let with_map = self.parent.source_maps && !transformed.has_errors();
        if with_map {
            assets.insert(
                map_name.clone(),
                Asset {
                    source: source_map(&filename, &transformed.chunks),
                    related_map: None,
                },
            );
        }
        assets.insert(
            filename,
            Asset {
                source: code,
                related_map: with_map.then_some(map_name),
            },
        );

        self.hooks.run(&mut assets);

        let run = ChildRun {
            assets,
            file_dependencies: transformed.dependencies,
            diagnostics: transformed.diagnostics,
        };
        tracing::debug!(
            child = %self.name,
            entry = %entry,
            dependencies = run.file_dependencies.len(),
            errors = run.has_errors(),
            "child compilation finished"
        );
        run
    }
}
