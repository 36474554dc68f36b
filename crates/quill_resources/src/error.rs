//! Errors returned by resource compilation calls.
//!
//! Build errors inside a resource are diagnostics, not `Err` values. These
//! variants are the failures that make a `get`/`process` call itself fail.

use quill_diagnostics::{Category, Diagnostic, DiagnosticCode, Location};

/// A code module was handed to the resource pipeline.
pub const E401: DiagnosticCode = DiagnosticCode::new(Category::Error, 401);

/// A resource module evaluated to a value of the wrong shape.
pub const E402: DiagnosticCode = DiagnosticCode::new(Category::Error, 402);

/// A resource was requested before a parent build context was bound.
pub const E403: DiagnosticCode = DiagnosticCode::new(Category::Error, 403);

/// The sub-build could not be set up.
pub const E404: DiagnosticCode = DiagnosticCode::new(Category::Error, 404);

/// Failures of a single resource request.
///
/// `Clone` so a result computed once can be handed to every caller waiting
/// on the same in-flight compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// The path has a programming-language source extension.
    #[error("'{path}' is a code module, not a resource")]
    UnsupportedResourceType {
        /// The rejected path.
        path: String,
    },

    /// The emitted module evaluated to neither a string nor an object with a
    /// string `default` field.
    #[error("resource '{resource}' exported {found}; expected a string or an object with a string 'default'")]
    InvalidResourceExport {
        /// The resource key.
        resource: String,
        /// Description of what was exported.
        found: String,
    },

    /// `get` or `process` ran before any `update` bound a parent context.
    #[error("no parent build context; call update() before requesting resources")]
    MissingParentContext,

    /// The child compilation could not be constructed.
    #[error("sub-build for '{resource}' could not start: {message}")]
    SubBuild {
        /// The resource key.
        resource: String,
        /// Underlying engine error.
        message: String,
    },
}

impl ResourceError {
    /// The diagnostic code for this failure.
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ResourceError::UnsupportedResourceType { .. } => E401,
            ResourceError::InvalidResourceExport { .. } => E402,
            ResourceError::MissingParentContext => E403,
            ResourceError::SubBuild { .. } => E404,
        }
    }

    /// Converts the failure into a diagnostic for front ends that report
    /// everything through one channel.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            ResourceError::UnsupportedResourceType { path } => diag
                .with_location(Location::file(path.as_str()))
                .with_help("reference stylesheets and templates only"),
            ResourceError::InvalidResourceExport { resource, .. }
            | ResourceError::SubBuild { resource, .. } => diag.with_location(Location::file(resource.as_str())),
            ResourceError::MissingParentContext => diag,
        }
    }
}
