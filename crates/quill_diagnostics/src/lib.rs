//! Diagnostic creation, severity management, and terminal rendering.
//!
//! Resource compilations report unresolved imports, unreadable files and
//! similar user errors as structured [`Diagnostic`]s instead of failing. The
//! thread-safe [`DiagnosticSink`] accumulates them across parallel
//! sub-builds, and [`TerminalRenderer`] formats them for the CLI.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod location;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use location::Location;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
