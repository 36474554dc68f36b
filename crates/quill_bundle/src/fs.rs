//! File system abstraction shared by the parent build and its child compilations.
//!
//! The engine never touches `std::fs` directly. [`NativeFs`] reads from disk,
//! [`MemoryFs`] serves an in-memory tree, and [`InlineOverlay`] layers
//! synthetic `quill-resource:` entries over another file system so inline
//! data can be compiled as if it were a file.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use quill_common::{normalize, NormalizedPath};

/// Scheme prefix of synthetic inline entries.
pub const RESOURCE_SCHEME: &str = "quill-resource:";

/// Read access to source files.
pub trait FileSystem: Send + Sync {
    /// Reads a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Returns `true` if `path` names a readable file (not a directory).
    fn exists(&self, path: &Path) -> bool;
}

/// Returns `true` if `path` is a synthetic inline entry.
pub fn is_virtual(path: &str) -> bool {
    path.starts_with(RESOURCE_SCHEME)
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFs;

impl FileSystem for NativeFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// An in-memory file tree keyed by normalized path.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RwLock<BTreeMap<NormalizedPath, String>>,
}

impl MemoryFs {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tree from `(path, content)` pairs.
    pub fn with_files<P: AsRef<Path>, C: Into<String>>(
        files: impl IntoIterator<Item = (P, C)>,
    ) -> Self {
        let fs = Self::new();
        for (path, content) in files {
            fs.write(path, content);
        }
        fs
    }

    /// Creates or replaces a file.
    pub fn write(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize(path), content.into());
    }

    /// Removes a file, returning whether it existed.
    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(normalize(path).as_str())
            .is_some()
    }
}

impl FileSystem for MemoryFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let key = normalize(path);
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| not_found(&key))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(normalize(path).as_str())
    }
}

/// Serves `quill-resource:` entries from memory and delegates everything else.
pub struct InlineOverlay {
    inner: Arc<dyn FileSystem>,
    entries: HashMap<NormalizedPath, String>,
}

impl InlineOverlay {
    /// Wraps `inner` with no synthetic entries.
    pub fn new(inner: Arc<dyn FileSystem>) -> Self {
        Self {
            inner,
            entries: HashMap::new(),
        }
    }

    /// Registers a synthetic entry.
    pub fn insert(&mut self, id: NormalizedPath, data: impl Into<String>) {
        self.entries.insert(id, data.into());
    }
}

impl FileSystem for InlineOverlay {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let key = normalize(path);
        if is_virtual(key.as_str()) {
            return self
                .entries
                .get(key.as_str())
                .cloned()
                .ok_or_else(|| not_found(&key));
        }
        self.inner.read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        let key = normalize(path);
        if is_virtual(key.as_str()) {
            return self.entries.contains_key(key.as_str());
        }
        self.inner.exists(path)
    }
}

fn not_found(path: &NormalizedPath) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_normalizes_keys() {
        let fs = MemoryFs::with_files([("/work\\src/./a.css", "a {}")]);
        assert!(fs.exists(Path::new("/work/src/a.css")));
        assert_eq!(fs.read_to_string(Path::new("/work/src/a.css")).unwrap(), "a {}");
    }

    #[test]
    fn memory_fs_missing_is_not_found() {
        let fs = MemoryFs::new();
        let err = fs.read_to_string(Path::new("/nope.css")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!fs.exists(Path::new("/nope.css")));
    }

    #[test]
    fn memory_fs_write_and_remove() {
        let fs = MemoryFs::new();
        fs.write("/a.css", "one");
        fs.write("/a.css", "two");
        assert_eq!(fs.read_to_string(Path::new("/a.css")).unwrap(), "two");
        assert!(fs.remove("/a.css"));
        assert!(!fs.remove("/a.css"));
    }

    #[test]
    fn native_fs_reads_files_not_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.css");
        std::fs::write(&file, "a {}").unwrap();
        assert!(NativeFs.exists(&file));
        assert!(!NativeFs.exists(dir.path()));
        assert_eq!(NativeFs.read_to_string(&file).unwrap(), "a {}");
    }

    #[test]
    fn overlay_serves_inline_and_delegates() {
        let inner: Arc<dyn FileSystem> = Arc::new(MemoryFs::with_files([("/src/_vars.scss", "$a: 1;")]));
        let mut overlay = InlineOverlay::new(inner);
        overlay.insert(normalize("quill-resource:0.scss"), "@import '/src/vars';");

        assert!(overlay.exists(Path::new("quill-resource:0.scss")));
        assert!(!overlay.exists(Path::new("quill-resource:1.scss")));
        assert_eq!(
            overlay.read_to_string(Path::new("quill-resource:0.scss")).unwrap(),
            "@import '/src/vars';"
        );
        assert_eq!(overlay.read_to_string(Path::new("/src/_vars.scss")).unwrap(), "$a: 1;");
    }

    #[test]
    fn virtual_scheme_detection() {
        assert!(is_virtual("quill-resource:3.css"));
        assert!(!is_virtual("/src/quill-resource.css"));
    }
}
