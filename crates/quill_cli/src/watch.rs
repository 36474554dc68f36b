//! `quill watch`: rebuild whenever a watched file changes.
//!
//! Changes are found by polling content hashes rather than timestamps, so
//! saving a file without editing it does not trigger a rebuild.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use quill_cache::{FileSnapshot, SourceHasher};

use crate::build::{self, BuildReport, BuildSession};
use crate::pipeline::Project;
use crate::{GlobalArgs, ReportFormat, WatchArgs};

/// Runs the `quill watch` command.
///
/// Returns the exit code of the most recent build.
pub fn run(
    args: &WatchArgs,
    global: &GlobalArgs,
    project: &Project,
) -> Result<i32, Box<dyn std::error::Error>> {
    let interval = Duration::from_millis(
        args.poll_interval_ms
            .unwrap_or(project.resolved.poll_interval_ms)
            .max(1),
    );
    if !global.quiet {
        eprintln!(
            "   Watching {} v{} (every {}ms)",
            project.config.project.name,
            project.config.project.version,
            interval.as_millis()
        );
    }

    let mut session = BuildSession::new(project)?;
    let report = session.rebuild(None)?;
    let mut code = build::print_report(&report, ReportFormat::Text, global);
    let mut poller = Poller::new(&session.watched_files()?);

    let mut cycles = 0u32;
    while args.max_cycles.map_or(true, |max| cycles < max) {
        thread::sleep(interval);
        cycles += 1;
        if let Some(report) = cycle(&mut session, &mut poller)? {
            code = build::print_report(&report, ReportFormat::Text, global);
        }
    }
    Ok(code)
}

/// Polls once and rebuilds if anything changed.
fn cycle(
    session: &mut BuildSession<'_>,
    poller: &mut Poller,
) -> Result<Option<BuildReport>, Box<dyn std::error::Error>> {
    let changed = poller.poll(&session.watched_files()?);
    if changed.is_empty() {
        return Ok(None);
    }
    tracing::info!(files = changed.len(), "change detected");
    for file in &changed {
        tracing::debug!(file = %file.display(), "changed");
    }

    let report = session.rebuild(Some(&changed[..]))?;
    for resource in &report.invalidated {
        tracing::info!(%resource, "recompiled");
    }
    poller.track(&session.watched_files()?);
    Ok(Some(report))
}

/// Content-hash change detection over a shifting set of files.
pub struct Poller {
    snapshot: FileSnapshot,
}

impl Poller {
    /// Starts tracking `files` at their current contents.
    pub fn new(files: &[PathBuf]) -> Self {
        Self {
            snapshot: SourceHasher::snapshot(files),
        }
    }

    /// Rehashes `files` and returns those that were added, modified, or
    /// deleted since the previous poll.
    pub fn poll(&mut self, files: &[PathBuf]) -> Vec<PathBuf> {
        let current = SourceHasher::snapshot(files);
        let changes = SourceHasher::detect_changes(&current, &self.snapshot);
        self.snapshot = current;
        changes.changed_files()
    }

    /// Narrows tracking to `files`, hashing only the ones not tracked yet.
    ///
    /// Known files keep their previous hash so an edit made while a rebuild
    /// was running still shows up on the next poll.
    pub fn track(&mut self, files: &[PathBuf]) {
        self.snapshot.retain(|path, _| files.contains(path));
        let untracked: Vec<PathBuf> = files
            .iter()
            .filter(|f| !self.snapshot.contains_key(*f))
            .cloned()
            .collect();
        self.snapshot.extend(SourceHasher::snapshot(&untracked));
    }
}
