//! `quill build`: compile every component resource.
//!
//! A [`BuildSession`] owns one [`ResourceLoader`] for its whole lifetime, so
//! `quill watch` can call [`BuildSession::rebuild`] repeatedly and only pay
//! for the resources an edit actually affected.
//!
//! Each rebuild:
//!
//! 1. Binds a fresh parent compiler context to the loader
//! 2. Rescans source modules for component resource references
//! 3. Compiles all resources in parallel
//! 4. Writes compiled files under `out_dir/resources/`
//! 5. Writes `out_dir/quill-manifest.json`

use std::path::{Path, PathBuf};

use quill_common::{normalize, NormalizedPath};
use quill_diagnostics::{Diagnostic, DiagnosticSink, Severity};
use quill_resources::ResourceLoader;
use rayon::prelude::*;
use serde::Serialize;

use crate::pipeline::{self, Project};
use crate::scan::{Component, ComponentScanner};
use crate::{BuildArgs, GlobalArgs, ReportFormat};

/// Name of the manifest written to the output directory.
pub const MANIFEST_FILE: &str = "quill-manifest.json";

/// Runs the `quill build` command.
///
/// Returns exit code 0 if no errors, 1 if there are errors.
pub fn run(
    args: &BuildArgs,
    global: &GlobalArgs,
    project: &Project,
) -> Result<i32, Box<dyn std::error::Error>> {
    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!(
            "   Building {} v{}",
            project.config.project.name, project.config.project.version
        );
    }

    let mut session = BuildSession::new(project)?;
    let report = session.rebuild(None)?;
    Ok(print_report(&report, args.format, global))
}

/// Prints a rebuild's diagnostics and summary, returning the exit code.
pub fn print_report(report: &BuildReport, format: ReportFormat, global: &GlobalArgs) -> i32 {
    match format {
        ReportFormat::Text => {
            pipeline::render_diagnostics(&report.diagnostics, global.color);
        }
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report.diagnostics)
                .unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }

    if !global.quiet && format == ReportFormat::Text {
        eprintln!(
            "   Result: {} resource(s) compiled, {} error(s), {} warning(s)",
            report.compiled,
            report.count(Severity::Error),
            report.count(Severity::Warning)
        );
    }

    if report.has_errors() {
        1
    } else {
        0
    }
}

/// What one rebuild did.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Resource files that compiled successfully (cached or fresh).
    pub compiled: usize,
    /// Resources evicted by this rebuild's `update`.
    pub invalidated: Vec<NormalizedPath>,
    /// Diagnostics emitted during this rebuild.
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildReport {
    /// Whether any error diagnostic was emitted.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// The build manifest consumed by the application bundle.
#[derive(Debug, Serialize)]
pub struct Manifest {
    /// Project name from `quill.toml`.
    pub project: String,
    /// Project version from `quill.toml`.
    pub version: String,
    /// One entry per component module, sorted by module path.
    pub components: Vec<ManifestComponent>,
}

/// Compiled resources of one component.
#[derive(Debug, Serialize)]
pub struct ManifestComponent {
    /// Module path relative to the project root.
    pub module: String,
    /// Compiled template, relative to the output directory.
    pub template: Option<String>,
    /// Compiled stylesheets, relative to the output directory.
    pub styles: Vec<String>,
    /// Compiled inline styles in declaration order.
    pub inline_styles: Vec<String>,
}

/// A resource file and its compiled content, `None` if compilation failed.
struct CompiledFile {
    source: NormalizedPath,
    content: Option<String>,
}

struct CompiledComponent {
    module: PathBuf,
    template: Option<CompiledFile>,
    styles: Vec<CompiledFile>,
    inline_styles: Vec<String>,
}

/// A long-lived build over one project.
pub struct BuildSession<'p> {
    project: &'p Project,
    scanner: ComponentScanner,
    loader: ResourceLoader,
    components: Vec<Component>,
    notices: Vec<Diagnostic>,
}

impl<'p> BuildSession<'p> {
    /// Creates a session with an empty cache.
    pub fn new(project: &'p Project) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            project,
            scanner: ComponentScanner::new()?,
            loader: ResourceLoader::new(),
            components: Vec::new(),
            notices: pipeline::hook_api_notice(&project.resolved).into_iter().collect(),
        })
    }

    /// The session's resource loader.
    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    /// Components found by the last rescan.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Every file whose change should trigger a rebuild: the source modules
    /// currently on disk plus everything in the dependency graph.
    pub fn watched_files(&self) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
        let mut files = pipeline::discover_source_files(&self.project.resolved.sources)?;
        files.extend(
            self.loader
                .watched_files()
                .into_iter()
                .map(|f| f.as_path().to_path_buf()),
        );
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// Runs one build. `None` is a full rebuild; `Some` lists the files
    /// changed since the previous one.
    pub fn rebuild(
        &mut self,
        changed: Option<&[PathBuf]>,
    ) -> Result<BuildReport, Box<dyn std::error::Error>> {
        let runner = pipeline::make_runner(&self.project.resolved);
        self.loader.update(runner, changed);

        let mut invalidated: Vec<NormalizedPath> =
            self.loader.modified_resource_files().into_iter().collect();
        invalidated.sort();

        self.rescan()?;

        let errors = DiagnosticSink::new();
        let compiled: Vec<CompiledComponent> = self
            .components
            .par_iter()
            .map(|component| self.compile_component(component, &errors))
            .collect();

        let manifest = self.write_outputs(&compiled)?;
        let compiled_files = compiled
            .iter()
            .flat_map(|c| c.template.iter().chain(c.styles.iter()))
            .filter(|f| f.content.is_some())
            .count();
        tracing::info!(
            components = manifest.components.len(),
            resources = compiled_files,
            cached = self.loader.cached_count(),
            "build finished"
        );

        let mut diagnostics = std::mem::take(&mut self.notices);
        diagnostics.extend(errors.take_all());
        diagnostics.extend(self.loader.take_diagnostics());

        Ok(BuildReport {
            compiled: compiled_files,
            invalidated,
            diagnostics,
        })
    }

    fn rescan(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let sources = pipeline::discover_source_files(&self.project.resolved.sources)?;
        let mut components = Vec::new();
        for module in &sources {
            let content = match std::fs::read_to_string(module) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(module = %module.display(), %err, "skipping unreadable module");
                    continue;
                }
            };
            components.extend(self.scanner.scan(module, &content));
        }
        tracing::debug!(modules = sources.len(), components = components.len(), "scanned sources");
        self.components = components;
        Ok(())
    }

    fn compile_component(&self, component: &Component, errors: &DiagnosticSink) -> CompiledComponent {
        let compile_file = |path: &PathBuf| {
            let source = normalize(path);
            let content = match self.loader.get(path) {
                Ok(content) if self.loader.is_cached(path) => Some(content),
                Ok(_) => None,
                Err(err) => {
                    errors.emit(err.to_diagnostic());
                    None
                }
            };
            CompiledFile { source, content }
        };

        let mime = self.project.resolved.inline_style_language.mime_type();
        let inline_styles = component
            .inline_styles
            .iter()
            .filter_map(|data| match self.loader.process(data, mime) {
                Ok(css) => Some(css),
                Err(err) => {
                    errors.emit(err.to_diagnostic());
                    None
                }
            })
            .collect();

        CompiledComponent {
            module: component.module.clone(),
            template: component.template.as_ref().map(compile_file),
            styles: component.styles.iter().map(compile_file).collect(),
            inline_styles,
        }
    }

    fn write_outputs(
        &self,
        compiled: &[CompiledComponent],
    ) -> Result<Manifest, Box<dyn std::error::Error>> {
        let out_dir = &self.project.resolved.out_dir;
        let root = normalize(&self.project.resolved.root);

        let write = |file: &CompiledFile| -> Result<Option<String>, std::io::Error> {
            let Some(content) = &file.content else {
                return Ok(None);
            };
            let relative = output_path(&root, &file.source);
            let target = out_dir.join(&relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, content)?;
            Ok(Some(relative))
        };

        let mut components = Vec::with_capacity(compiled.len());
        for component in compiled {
            let template = match &component.template {
                Some(file) => write(file)?,
                None => None,
            };
            let mut styles = Vec::new();
            for file in &component.styles {
                styles.extend(write(file)?);
            }
            components.push(ManifestComponent {
                module: relative_to(&root, &normalize(&component.module)),
                template,
                styles,
                inline_styles: component.inline_styles.clone(),
            });
        }
        components.sort_by(|a, b| a.module.cmp(&b.module));

        let manifest = Manifest {
            project: self.project.config.project.name.clone(),
            version: self.project.config.project.version.clone(),
            components,
        };
        std::fs::create_dir_all(out_dir)?;
        std::fs::write(
            out_dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        Ok(manifest)
    }
}

/// Output location of a compiled resource, relative to the output directory.
///
/// Resources under the project root keep their relative layout below
/// `resources/`; others land in `resources/external/`. Stylesheets that
/// compile to plain CSS get a `.css` extension.
fn output_path(root: &NormalizedPath, source: &NormalizedPath) -> String {
    let relative = if source.as_str().starts_with(&format!("{}/", root.as_str())) {
        relative_to(root, source)
    } else {
        format!("external/{}", source.file_name().unwrap_or(source.as_str()))
    };
    let relative = match relative.strip_suffix(".scss") {
        Some(stem) => format!("{stem}.css"),
        None => relative,
    };
    format!("resources/{relative}")
}

fn relative_to(root: &NormalizedPath, path: &NormalizedPath) -> String {
    Path::new(path.as_str())
        .strip_prefix(root.as_str())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{load, write_project};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn build_writes_resources_and_manifest() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), "");
        let project = load(tmp.path());

        let mut session = BuildSession::new(&project).unwrap();
        let report = session.rebuild(None).unwrap();
        assert!(!report.has_errors(), "{:?}", report.diagnostics);
        assert_eq!(report.compiled, 2);

        let resources = tmp.path().join("dist").join("resources").join("src").join("app");
        let css = fs::read_to_string(resources.join("button.css")).unwrap();
        assert_eq!(css.trim(), ".btn { color: teal; }");
        let html = fs::read_to_string(resources.join("button.html")).unwrap();
        assert_eq!(html, "<button class=\"btn\"></button>");

        let manifest: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(tmp.path().join("dist").join(MANIFEST_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["project"], "shop");
        let component = &manifest["components"][0];
        assert_eq!(component["module"], "src/app/button.ts");
        assert_eq!(component["template"], "resources/src/app/button.html");
        assert_eq!(component["styles"][0], "resources/src/app/button.css");
        assert_eq!(
            component["inline_styles"][0].as_str().unwrap().trim(),
            ".inline { margin: 0; }"
        );
    }

    #[test]
    fn incremental_rebuild_recompiles_only_affected() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), "");
        let app = tmp.path().join("src").join("app");
        fs::write(app.join("other.css"), "p { margin: 0; }").unwrap();
        fs::write(app.join("other.ts"), "styleUrl: './other.css'").unwrap();
        let project = load(tmp.path());

        let mut session = BuildSession::new(&project).unwrap();
        session.rebuild(None).unwrap();
        assert_eq!(session.loader().cached_count(), 3);
        assert!(session.watched_files().unwrap().contains(&app.join("_vars.scss")));

        fs::write(app.join("_vars.scss"), "$primary: navy;\n").unwrap();
        let changed = vec![app.join("_vars.scss")];
        let report = session.rebuild(Some(changed.as_slice())).unwrap();
        assert_eq!(report.invalidated, vec![normalize(app.join("button.scss"))]);

        let css = fs::read_to_string(tmp.path().join("dist/resources/src/app/button.css")).unwrap();
        assert_eq!(css.trim(), ".btn { color: navy; }");
    }

    #[test]
    fn failed_resources_are_reported_and_not_written() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), "");
        let app = tmp.path().join("src").join("app");
        fs::write(app.join("button.scss"), "@import 'missing';\n.btn { color: red; }\n").unwrap();
        let project = load(tmp.path());

        let mut session = BuildSession::new(&project).unwrap();
        let report = session.rebuild(None).unwrap();
        assert!(report.has_errors());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.code.to_string() == "E301"));
        assert!(!tmp.path().join("dist/resources/src/app/button.css").exists());
        assert!(tmp.path().join("dist/resources/src/app/button.html").exists());
        assert_eq!(report.compiled, 1);
    }

    #[test]
    fn legacy_hook_api_builds_with_notice_once() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), "\n[build]\nhook_api = \"additional-assets\"\n");
        let project = load(tmp.path());

        let mut session = BuildSession::new(&project).unwrap();
        let first = session.rebuild(None).unwrap();
        assert!(!first.has_errors());
        assert!(first.diagnostics.iter().any(|d| d.code.to_string() == "D001"));
        assert_eq!(first.compiled, 2);

        let second = session.rebuild(Some(&[][..])).unwrap();
        assert!(second.diagnostics.is_empty());
    }

    #[test]
    fn scss_inline_style_language() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), "\n[build]\ninline_style_language = \"scss\"\n");
        let app = tmp.path().join("src").join("app");
        fs::write(
            app.join("card.ts"),
            "styles: [`$gap: 4px;\n.card { padding: $gap; }`]",
        )
        .unwrap();
        let project = load(tmp.path());

        let mut session = BuildSession::new(&project).unwrap();
        let report = session.rebuild(None).unwrap();
        assert!(!report.has_errors(), "{:?}", report.diagnostics);

        let manifest = fs::read_to_string(tmp.path().join("dist").join(MANIFEST_FILE)).unwrap();
        assert!(manifest.contains(".card { padding: 4px; }"));
    }

    #[test]
    fn output_paths() {
        let root = normalize("/work/shop");
        assert_eq!(
            output_path(&root, &normalize("/work/shop/src/a/b.scss")),
            "resources/src/a/b.css"
        );
        assert_eq!(
            output_path(&root, &normalize("/work/shop/src/a/b.html")),
            "resources/src/a/b.html"
        );
        assert_eq!(
            output_path(&root, &normalize("/opt/theme/base.css")),
            "resources/external/base.css"
        );
        assert_eq!(
            output_path(&root, &normalize("/work/shopping/x.css")),
            "resources/external/x.css"
        );
    }
}
