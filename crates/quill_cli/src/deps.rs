//! `quill deps`: show what a resource read and what else shares those files.

use std::path::{Path, PathBuf};

use quill_common::normalize;
use quill_resources::ResourceLoader;
use serde::Serialize;

use crate::build::BuildSession;
use crate::pipeline::{self, Project};
use crate::{DepsArgs, GlobalArgs, ReportFormat};

/// Dependencies of one resource.
#[derive(Debug, Serialize)]
pub struct DepsReport {
    /// The inspected resource.
    pub resource: String,
    /// Every file its last compilation read or probed for, sorted.
    pub dependencies: Vec<DependencyEntry>,
}

/// One file a resource depends on.
#[derive(Debug, Serialize)]
pub struct DependencyEntry {
    /// The file.
    pub file: String,
    /// Every resource a change to `file` would recompile, sorted.
    pub affects: Vec<String>,
}

/// Runs the `quill deps` command.
pub fn run(
    args: &DepsArgs,
    global: &GlobalArgs,
    project: &Project,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut session = BuildSession::new(project)?;
    let build = session.rebuild(None)?;
    if !global.quiet {
        pipeline::render_diagnostics(&build.diagnostics, global.color);
    }

    let resource = resource_path(&args.resource, &project.resolved.root);
    let Some(report) = dependency_report(session.loader(), &resource) else {
        return Err(format!(
            "{} is not a resource referenced by any component",
            resource.display()
        )
        .into());
    };

    match args.format {
        ReportFormat::Text => print!("{}", render_text(&report)),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(0)
}

/// Resolves a command-line resource path.
///
/// Relative paths are taken from the current directory when the file exists
/// there, and from the project root otherwise.
fn resource_path(arg: &str, root: &Path) -> PathBuf {
    let path = PathBuf::from(arg);
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) if cwd.join(&path).is_file() => cwd.join(path),
        _ => root.join(path),
    }
}

/// Builds the report, or `None` if nothing is known about `resource`.
pub fn dependency_report(loader: &ResourceLoader, resource: &Path) -> Option<DepsReport> {
    let mut files: Vec<_> = loader.resource_dependencies(resource).into_iter().collect();
    if files.is_empty() {
        return None;
    }
    files.sort();

    let dependencies = files
        .into_iter()
        .map(|file| {
            let mut affects: Vec<String> = loader
                .affected_resources(file.as_path())
                .into_iter()
                .map(String::from)
                .collect();
            affects.sort();
            DependencyEntry {
                file: file.into(),
                affects,
            }
        })
        .collect();

    Some(DepsReport {
        resource: normalize(resource).into(),
        dependencies,
    })
}

fn render_text(report: &DepsReport) -> String {
    let mut out = format!("{}\n", report.resource);
    for entry in &report.dependencies {
        out.push_str(&format!("  {}\n", entry.file));
        for other in entry.affects.iter().filter(|r| **r != report.resource) {
            out.push_str(&format!("    also affects {other}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{load, write_project};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn report_lists_dependencies_and_shared_files() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), "");
        let app = tmp.path().join("src").join("app");
        fs::write(app.join("card.scss"), "@import 'vars';\n.card { color: $primary; }\n").unwrap();
        fs::write(app.join("card.ts"), "styleUrl: './card.scss'").unwrap();
        let project = load(tmp.path());

        let mut session = BuildSession::new(&project).unwrap();
        session.rebuild(None).unwrap();

        let report = dependency_report(session.loader(), &app.join("button.scss")).unwrap();
        let button = normalize(app.join("button.scss")).as_str().to_string();
        let card = normalize(app.join("card.scss")).as_str().to_string();
        let vars = normalize(app.join("_vars.scss")).as_str().to_string();

        assert_eq!(report.resource, button);
        let files: Vec<&str> = report.dependencies.iter().map(|d| d.file.as_str()).collect();
        assert!(files.contains(&vars.as_str()));
        assert!(files.contains(&button.as_str()));

        let shared = report.dependencies.iter().find(|d| d.file == vars).unwrap();
        assert_eq!(shared.affects.len(), 2);
        assert!(shared.affects.contains(&card));

        let text = render_text(&report);
        assert!(text.starts_with(&format!("{button}\n")));
        assert!(text.contains(&format!("    also affects {card}\n")));
    }

    #[test]
    fn unknown_resource_has_no_report() {
        let tmp = TempDir::new().unwrap();
        write_project(tmp.path(), "");
        let project = load(tmp.path());

        let mut session = BuildSession::new(&project).unwrap();
        session.rebuild(None).unwrap();
        assert!(dependency_report(session.loader(), &tmp.path().join("nope.css")).is_none());
    }

    #[test]
    fn relative_resource_paths_fall_back_to_root() {
        let root = Path::new("/definitely/not/here");
        assert_eq!(
            resource_path("src/app/x.scss", root),
            root.join("src/app/x.scss")
        );
        assert_eq!(resource_path("/abs/x.css", root), PathBuf::from("/abs/x.css"));
    }
}
