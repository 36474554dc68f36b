//! Diagnostic codes reported by the engine.
//!
//! `E301`--`E303` fail a resource compilation; `W301` still produces output.
//! `D001` is reported by front ends that select the legacy hook surface.

use quill_diagnostics::{Category, DiagnosticCode};

/// An `@import`/`@use` specifier did not resolve to a file.
pub const E301: DiagnosticCode = DiagnosticCode::new(Category::Error, 301);

/// A resolved file (or the entry itself) could not be read.
pub const E302: DiagnosticCode = DiagnosticCode::new(Category::Error, 302);

/// A stylesheet referenced an undeclared `$variable`.
pub const E303: DiagnosticCode = DiagnosticCode::new(Category::Error, 303);

/// A circular import was skipped.
pub const W301: DiagnosticCode = DiagnosticCode::new(Category::Warning, 301);

/// The legacy `additional-assets` hook surface is in use.
pub const D001: DiagnosticCode = DiagnosticCode::new(Category::Deprecation, 1);
