//! Diagnostic rendering for terminal output.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Formats a diagnostic into a printable string.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-like terminal format.
///
/// ```text
/// error[E301]: Can't resolve './theme' in '/work/src/app'
///   --> /work/src/app/button.scss:2:1
///    = help: check the path or add an alias in quill.toml
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let ansi = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Note => "36",
        };
        format!("\x1b[1;{ansi}m{text}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = String::new();

        let head = format!("{}[{}]", diag.severity, diag.code);
        out.push_str(&format!("{}: {}\n", self.paint(diag.severity, &head), diag.message));

        if let Some(loc) = &diag.location {
            out.push_str(&format!("  --> {loc}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{Category, DiagnosticCode};
    use crate::location::Location;

    #[test]
    fn render_error_with_location() {
        let diag = Diagnostic::error(
            DiagnosticCode::new(Category::Error, 301),
            "Can't resolve './theme'",
        )
        .with_location(Location::at("/work/src/button.scss", 2, 1));

        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.starts_with("error[E301]: Can't resolve './theme'\n"));
        assert!(output.contains("--> /work/src/button.scss:2:1"));
    }

    #[test]
    fn render_notes_and_help() {
        let diag = Diagnostic::warning(DiagnosticCode::new(Category::Warning, 301), "cycle")
            .with_note("a.css imports itself")
            .with_help("remove the self import");
        let output = TerminalRenderer::new(false).render(&diag);
        assert!(output.contains("warning[W301]: cycle"));
        assert!(output.contains("= note: a.css imports itself"));
        assert!(output.contains("= help: remove the self import"));
        assert!(!output.contains("-->"));
    }

    #[test]
    fn color_wraps_header_only() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Error, 1), "boom");
        let output = TerminalRenderer::new(true).render(&diag);
        assert!(output.starts_with("\x1b[1;31merror[E001]\x1b[0m: boom"));
    }
}
