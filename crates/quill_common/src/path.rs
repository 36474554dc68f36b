//! Platform-independent path keys.
//!
//! Every key in the artifact cache and the dependency graph is produced by
//! [`normalize`]. Raw paths must never be used as keys directly, otherwise
//! `src\app\a.css` and `src/app/./a.css` would be cached twice and an edit to
//! one would not invalidate the other.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::Path;

/// A lexically normalized path string.
///
/// Separators are always `/`, there are no `.` segments, `..` only appears
/// at the start of relative paths, and a drive prefix is upper-case.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    /// Returns the normalized string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the key as a [`Path`] for filesystem calls.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Returns `true` for `/...` and `X:/...` paths.
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with('/') || drive_prefix(&self.0).is_some()
    }

    /// Returns the final segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        let name = self.0.rsplit('/').next()?;
        if name.is_empty() || name == ".." || name == "." || name.ends_with(':') {
            None
        } else {
            Some(name)
        }
    }

    /// Returns the extension of the final segment without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let dot = name.rfind('.')?;
        if dot == 0 {
            return None;
        }
        Some(&name[dot + 1..])
    }

    /// Returns the containing directory, or `None` at a root.
    pub fn parent(&self) -> Option<NormalizedPath> {
        self.file_name()?;
        match self.0.rfind('/') {
            Some(idx) => {
                let head = &self.0[..idx];
                if head.is_empty() {
                    Some(NormalizedPath("/".to_string()))
                } else if drive_prefix(&self.0).is_some() && idx == 2 {
                    Some(NormalizedPath(self.0[..3].to_string()))
                } else {
                    Some(NormalizedPath(head.to_string()))
                }
            }
            None => Some(NormalizedPath(".".to_string())),
        }
    }

    /// Joins a relative or absolute path onto this one and normalizes the result.
    ///
    /// An absolute `other` replaces `self`, matching [`Path::join`].
    pub fn join(&self, other: impl AsRef<Path>) -> NormalizedPath {
        let other = normalize(other);
        if other.is_absolute() {
            other
        } else {
            normalize(format!("{}/{}", self.0, other.0))
        }
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl Borrow<str> for NormalizedPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<NormalizedPath> for String {
    fn from(path: NormalizedPath) -> Self {
        path.0
    }
}

/// Canonicalizes a path into its key form without touching the filesystem.
///
/// Backslashes become `/`, repeated separators collapse, `.` segments are
/// dropped, and `..` removes the previous segment. A rooted path never walks
/// above its root; a relative path keeps its leading `..` segments. The empty
/// relative path normalizes to `.`.
pub fn normalize(path: impl AsRef<Path>) -> NormalizedPath {
    let raw = path.as_ref().to_string_lossy().replace('\\', "/");
    let (root, rest) = split_root(&raw);

    let mut segments: Vec<&str> = Vec::new();
    for seg in rest.split('/') {
        match seg {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if root.is_some() => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    let out = match root {
        Some(root) => format!("{root}{body}"),
        None if body.is_empty() => ".".to_string(),
        None => body,
    };
    NormalizedPath(out)
}

/// Splits `X:` or `/` off the front of a slash-separated path.
fn split_root(raw: &str) -> (Option<String>, &str) {
    if let Some(drive) = drive_prefix(raw) {
        return (Some(format!("{}:/", drive.to_ascii_uppercase())), &raw[2..]);
    }
    match raw.strip_prefix('/') {
        Some(rest) => (Some("/".to_string()), rest),
        None => (None, raw),
    }
}

fn drive_prefix(raw: &str) -> Option<char> {
    let mut chars = raw.chars();
    let letter = chars.next()?;
    if letter.is_ascii_alphabetic() && chars.next() == Some(':') {
        match chars.next() {
            None | Some('/') | Some('\\') => Some(letter),
            Some(_) => None,
        }
    } else {
        None
    }
}
