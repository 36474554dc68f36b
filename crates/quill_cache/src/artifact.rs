//! Compiled resource outputs and the cache that keeps successful ones.

use std::collections::HashMap;

use quill_common::NormalizedPath;

/// The result of compiling one resource through a nested sub-build.
///
/// `content` is empty when the emitted module produced no usable value.
/// `success` is `false` when the sub-build reported any error diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOutput {
    /// The final string artifact (CSS text, template markup, ...).
    pub content: String,
    /// The adjacent source map, if the sub-build produced one.
    pub map: Option<String>,
    /// Whether the sub-build finished without errors.
    pub success: bool,
}

impl CompilationOutput {
    /// A successful output without a source map.
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            map: None,
            success: true,
        }
    }

    /// A failed output.
    pub fn failed(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            map: None,
            success: false,
        }
    }
}

/// Last successful [`CompilationOutput`] per normalized resource path.
///
/// Entries live until evicted by an incremental update or dropped by a full
/// rebuild. Failed outputs are never stored, so a transient error cannot
/// poison later lookups.
#[derive(Debug, Default)]
pub struct ArtifactCache {
    entries: HashMap<NormalizedPath, CompilationOutput>,
}

impl ArtifactCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a resource. A miss is not an error.
    pub fn get(&self, key: &str) -> Option<&CompilationOutput> {
        self.entries.get(key)
    }

    /// Stores `output` for `key` if it is successful.
    ///
    /// Returns whether the output was stored.
    pub fn insert(&mut self, key: NormalizedPath, output: CompilationOutput) -> bool {
        if !output.success {
            tracing::trace!(resource = %key, "not caching failed output");
            return false;
        }
        self.entries.insert(key, output);
        true
    }

    /// Evicts a resource, returning its previous output.
    pub fn remove(&mut self, key: &str) -> Option<CompilationOutput> {
        self.entries.remove(key)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns `true` if `key` has a cached output.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of cached resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_common::normalize;

    #[test]
    fn miss_on_empty_cache() {
        let cache = ArtifactCache::new();
        assert!(cache.get("/work/a.css").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_and_get() {
        let mut cache = ArtifactCache::new();
        assert!(cache.insert(normalize("/work/a.css"), CompilationOutput::ok("a{}")));
        assert_eq!(cache.get("/work/a.css").unwrap().content, "a{}");
        assert!(cache.contains("/work/a.css"));
    }

    #[test]
    fn lookup_uses_normalized_key() {
        let mut cache = ArtifactCache::new();
        cache.insert(normalize("C:\\work\\a.css"), CompilationOutput::ok("a{}"));
        assert!(cache.get(normalize("c:/work/./a.css").as_str()).is_some());
    }

    #[test]
    fn failed_output_is_not_stored() {
        let mut cache = ArtifactCache::new();
        assert!(!cache.insert(normalize("/work/a.css"), CompilationOutput::failed("")));
        assert!(cache.get("/work/a.css").is_none());
    }

    #[test]
    fn failed_output_does_not_replace_good_one() {
        let mut cache = ArtifactCache::new();
        cache.insert(normalize("/work/a.css"), CompilationOutput::ok("a{}"));
        cache.insert(normalize("/work/a.css"), CompilationOutput::failed("broken"));
        assert_eq!(cache.get("/work/a.css").unwrap().content, "a{}");
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = ArtifactCache::new();
        cache.insert(normalize("/a.css"), CompilationOutput::ok("a"));
        cache.insert(normalize("/b.css"), CompilationOutput::ok("b"));
        assert_eq!(cache.remove("/a.css").unwrap().content, "a");
        assert!(cache.remove("/a.css").is_none());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
