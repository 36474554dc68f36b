//! Resource kinds and how they are recognised.

use quill_common::NormalizedPath;

/// Source-code extensions that must never enter the resource pipeline.
const CODE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// The transform family applied to a resource entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Plain CSS with `@import` inlining.
    Css,
    /// The Scss subset: imports, partials, variables, line comments.
    Scss,
    /// HTML templates, passed through.
    Html,
    /// Anything else, passed through.
    Raw,
}

impl ResourceKind {
    /// Picks a kind from a file extension (case-insensitive).
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(str::to_ascii_lowercase).as_deref() {
            Some("css") => ResourceKind::Css,
            Some("scss") => ResourceKind::Scss,
            Some("html") | Some("htm") => ResourceKind::Html,
            _ => ResourceKind::Raw,
        }
    }

    /// Picks a kind from a path's extension.
    pub fn from_path(path: &NormalizedPath) -> Self {
        Self::from_extension(path.extension())
    }

    /// Picks a kind from a MIME type. Parameters after `;` are ignored.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "text/css" => ResourceKind::Css,
            "text/x-scss" | "text/scss" => ResourceKind::Scss,
            "text/html" => ResourceKind::Html,
            _ => ResourceKind::Raw,
        }
    }

    /// Extension used for synthetic entries of this kind.
    pub fn extension(self) -> &'static str {
        match self {
            ResourceKind::Css => "css",
            ResourceKind::Scss => "scss",
            ResourceKind::Html => "html",
            ResourceKind::Raw => "txt",
        }
    }

    /// Returns `true` for Css and Scss.
    pub fn is_stylesheet(self) -> bool {
        matches!(self, ResourceKind::Css | ResourceKind::Scss)
    }
}

/// Returns `true` if `path` has a programming-language source extension.
pub fn is_code_module(path: &str) -> bool {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let ext = name[dot + 1..].to_ascii_lowercase();
            CODE_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
