//! Tracing subscriber setup.
//!
//! The filter starts from `[logging] level`, is overridden by `--verbose`
//! or `--quiet`, and has `RUST_LOG` directives merged on top. Everything is
//! written to stderr so stdout stays clean for `--format json`.

use quill_config::LoggingConfig;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::GlobalArgs;

/// Installs the global subscriber. A second call is a no-op.
pub fn init(config: &LoggingConfig, global: &GlobalArgs) {
    let env = std::env::var("RUST_LOG").ok();
    let filter = env_filter(&base_directives(config, global), env.as_deref());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .try_init();
}

fn base_directives(config: &LoggingConfig, global: &GlobalArgs) -> String {
    if global.verbose {
        "debug".to_string()
    } else if global.quiet {
        "error".to_string()
    } else {
        config.directives()
    }
}

/// Combines the base directives with optional `RUST_LOG` directives.
///
/// An unparsable combination falls back to the env directives alone, then to
/// the base, then to `info`.
fn env_filter(base: &str, env: Option<&str>) -> EnvFilter {
    let env = env.map(str::trim).filter(|value| !value.is_empty());
    match env {
        Some(env) => EnvFilter::try_new(format!("{base},{env}"))
            .or_else(|_| EnvFilter::try_new(env))
            .unwrap_or_else(|_| base_filter(base)),
        None => base_filter(base),
    }
}

fn base_filter(base: &str) -> EnvFilter {
    EnvFilter::try_new(base)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
}
