//! The `quill` command-line interface.
//!
//! `quill build` compiles every stylesheet and template referenced from the
//! project's source modules, `quill watch` keeps doing so incrementally as
//! files change, and `quill deps` shows what a compiled resource read.

#![warn(missing_docs)]

mod build;
mod deps;
mod logging;
mod pipeline;
mod scan;
#[cfg(test)]
mod testutil;
mod watch;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Incremental component resource compiler.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Quill component resource compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `quill.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile every component resource once.
    Build(BuildArgs),
    /// Compile, then recompile affected resources whenever files change.
    Watch(WatchArgs),
    /// Print the files a resource depends on.
    Deps(DepsArgs),
}

/// Arguments for the `quill build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `quill watch` subcommand.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Stop after this many polls instead of running until interrupted.
    #[arg(long)]
    pub max_cycles: Option<u32>,

    /// Override `[watch] poll_interval_ms` from `quill.toml`.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

/// Arguments for the `quill deps` subcommand.
#[derive(Parser, Debug)]
pub struct DepsArgs {
    /// The resource file to inspect (e.g. `src/app/button.scss`).
    pub resource: String,

    /// Output format for the dependency listing.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = pipeline::load_project(&global).and_then(|project| {
        logging::init(&project.config.logging, &global);
        match cli.command {
            Command::Build(ref args) => build::run(args, &global, &project),
            Command::Watch(ref args) => watch::run(args, &global, &project),
            Command::Deps(ref args) => deps::run(args, &global, &project),
        }
    });

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Rough terminal detection based on the `TERM` environment variable.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok_and(|term| term != "dumb")
}
