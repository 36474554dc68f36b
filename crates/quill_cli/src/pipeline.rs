//! Shared pipeline helpers for CLI commands.
//!
//! Project root resolution, config loading, source module discovery, engine
//! setup, and diagnostic rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quill_bundle::codes::D001;
use quill_bundle::{is_code_module, Compiler, EngineVersion, NativeFs};
use quill_config::{HookApi, ProjectConfig, ResolvedProject, CONFIG_FILE};
use quill_diagnostics::{Diagnostic, DiagnosticRenderer, TerminalRenderer};
use quill_resources::EngineRunner;

use crate::GlobalArgs;

/// A loaded `quill.toml` together with its resolved directories.
pub struct Project {
    /// The parsed configuration.
    pub config: ProjectConfig,
    /// Directories and build settings anchored to the project root.
    pub resolved: ResolvedProject,
}

/// Walks up from `start` looking for the nearest directory containing `quill.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `quill.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Finds, loads, and resolves the project configuration.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let root = if root.is_absolute() {
        root
    } else {
        std::env::current_dir()?.join(root)
    };
    let config = quill_config::load_config(&root)?;
    let resolved = quill_config::resolve_project(&config, &root)?;
    Ok(Project { config, resolved })
}

/// Discovers source modules under each directory (recursive), sorted by path.
///
/// Directories that do not exist are skipped.
pub fn discover_source_files(dirs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for dir in dirs.iter().filter(|d| d.is_dir()) {
        walk_dir(dir, &mut files)?;
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if is_code_module(&path.to_string_lossy()) {
            files.push(path);
        }
    }
    Ok(())
}

/// The engine generation that exposes the configured hook surface.
pub fn engine_version(hook_api: HookApi) -> EngineVersion {
    match hook_api {
        HookApi::ProcessAssets => EngineVersion::CURRENT,
        HookApi::AdditionalAssets => EngineVersion::LEGACY,
    }
}

/// Creates a fresh parent compiler context over the real file system.
pub fn make_runner(project: &ResolvedProject) -> Arc<EngineRunner> {
    let compiler = Compiler::new(&project.root, Arc::new(NativeFs))
        .with_version(engine_version(project.hook_api))
        .with_aliases(project.aliases.clone())
        .with_source_maps(project.source_maps);
    Arc::new(EngineRunner::new(compiler))
}

/// The deprecation notice for projects still on the legacy hook surface.
pub fn hook_api_notice(project: &ResolvedProject) -> Option<Diagnostic> {
    (project.hook_api == HookApi::AdditionalAssets).then(|| {
        Diagnostic::warning(
            D001,
            "the `additional-assets` hook surface is deprecated",
        )
        .with_help("set `hook_api = \"process-assets\"` under [build] in quill.toml")
    })
}

/// Renders diagnostics to stderr using the terminal renderer.
///
/// Returns the number of diagnostics rendered.
pub fn render_diagnostics(diagnostics: &[Diagnostic], color: bool) -> usize {
    let renderer = TerminalRenderer::new(color);
    for diag in diagnostics {
        eprintln!("{}", renderer.render(diag));
    }
    diagnostics.len()
}
