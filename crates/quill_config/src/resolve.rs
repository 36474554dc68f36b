//! Anchoring configured directories to the project root.

use crate::error::ConfigError;
use crate::types::{HookApi, ProjectConfig, StyleLanguage};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A configuration whose relative paths have been joined onto the project root.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    /// The directory containing `quill.toml`.
    pub root: PathBuf,
    /// Directories scanned for component modules.
    pub sources: Vec<PathBuf>,
    /// Directory that receives build output.
    pub out_dir: PathBuf,
    /// Import aliases mapped to absolute directories, longest alias first.
    pub aliases: Vec<(String, PathBuf)>,
    /// Language of inline component styles.
    pub inline_style_language: StyleLanguage,
    /// Whether compiled resources carry source maps.
    pub source_maps: bool,
    /// Engine hook surface to build with.
    pub hook_api: HookApi,
    /// Milliseconds between watch polls.
    pub poll_interval_ms: u64,
}

/// Resolves `config` against `root`.
///
/// Fails if the output directory would coincide with a source directory,
/// since a rebuild would then scan its own output.
pub fn resolve_project(config: &ProjectConfig, root: &Path) -> Result<ResolvedProject, ConfigError> {
    let sources: Vec<PathBuf> = config.project.sources.iter().map(|s| root.join(s)).collect();
    let out_dir = root.join(&config.project.out_dir);

    if sources.iter().any(|s| s == &out_dir) {
        return Err(ConfigError::ValidationError(format!(
            "project.out_dir '{}' must not be one of project.sources",
            config.project.out_dir
        )));
    }

    let mut aliases: Vec<(String, PathBuf)> = config
        .build
        .aliases
        .iter()
        .map(|(name, dir)| (name.trim_end_matches('/').to_string(), root.join(dir)))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect();
    // `@app/theme` must win over `@app` when both are configured.
    aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

    Ok(ResolvedProject {
        root: root.to_path_buf(),
        sources,
        out_dir,
        aliases,
        inline_style_language: config.build.inline_style_language,
        source_maps: config.build.source_maps,
        hook_api: config.build.hook_api,
        poll_interval_ms: config.watch.poll_interval_ms,
    })
}
