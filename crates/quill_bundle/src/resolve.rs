//! Import specifier resolution.
//!
//! Specifiers resolve against the importing file's directory unless a
//! configured alias claims their first segment. Stylesheet kinds probe a
//! fixed list of candidate files; the first one the file system reports as
//! existing wins.

use std::path::Path;

use quill_common::{normalize, NormalizedPath};

use crate::fs::FileSystem;
use crate::kind::ResourceKind;

/// Resolver configuration shared by a compiler and all of its children.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    aliases: Vec<(String, NormalizedPath)>,
}

impl ResolveOptions {
    /// Builds options from `(alias, directory)` pairs.
    ///
    /// Longer aliases are tried first so `@app/styles` beats `@app`.
    pub fn new(aliases: impl IntoIterator<Item = (String, NormalizedPath)>) -> Self {
        let mut aliases: Vec<_> = aliases.into_iter().collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { aliases }
    }

    /// The configured aliases, longest first.
    pub fn aliases(&self) -> &[(String, NormalizedPath)] {
        &self.aliases
    }
}

/// Returns `true` for specifiers that point off the local machine.
pub fn is_remote(specifier: &str) -> bool {
    let lower = specifier.to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("//")
}

/// Resolves specifiers through a file system.
pub struct Resolver<'a> {
    fs: &'a dyn FileSystem,
    options: &'a ResolveOptions,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver.
    pub fn new(fs: &'a dyn FileSystem, options: &'a ResolveOptions) -> Self {
        Self { fs, options }
    }

    /// The path a specifier names before any candidate probing.
    pub fn base_path(&self, specifier: &str, from_dir: &NormalizedPath) -> NormalizedPath {
        for (alias, target) in &self.options.aliases {
            if specifier == alias {
                return target.clone();
            }
            if let Some(rest) = specifier
                .strip_prefix(alias.as_str())
                .and_then(|r| r.strip_prefix('/'))
            {
                return target.join(rest);
            }
        }
        from_dir.join(specifier)
    }

    /// Every file the resolver would try, in order.
    pub fn candidates(&self, specifier: &str, from_dir: &NormalizedPath, kind: ResourceKind) -> Vec<NormalizedPath> {
        let base = self.base_path(specifier, from_dir);
        match kind {
            ResourceKind::Scss => scss_candidates(&base),
            ResourceKind::Css => {
                let with_ext = normalize(format!("{base}.css"));
                vec![base, with_ext]
            }
            ResourceKind::Html | ResourceKind::Raw => vec![base],
        }
    }

    /// Resolves `specifier` imported from a file in `from_dir`.
    ///
    /// Returns `None` for remote specifiers and when no candidate exists.
    pub fn resolve(&self, specifier: &str, from_dir: &NormalizedPath, kind: ResourceKind) -> Option<NormalizedPath> {
        self.probe(specifier, from_dir, kind).resolved
    }

    /// Resolves `specifier` and also reports the candidates tried before the
    /// match.
    ///
    /// Creating any of the missed files later would change the result, so
    /// callers tracking dependencies record them too.
    pub fn probe(&self, specifier: &str, from_dir: &NormalizedPath, kind: ResourceKind) -> Probe {
        let mut probe = Probe::default();
        if is_remote(specifier) {
            return probe;
        }
        for candidate in self.candidates(specifier, from_dir, kind) {
            if self.fs.exists(Path::new(candidate.as_str())) {
                probe.resolved = Some(candidate);
                break;
            }
            probe.missed.push(candidate);
        }
        probe
    }
}

/// Outcome of [`Resolver::probe`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Probe {
    /// The first candidate that exists.
    pub resolved: Option<NormalizedPath>,
    /// Candidates tried before `resolved`, or all of them when nothing
    /// resolved.
    pub missed: Vec<NormalizedPath>,
}

fn scss_candidates(base: &NormalizedPath) -> Vec<NormalizedPath> {
    let mut out = vec![base.clone(), normalize(format!("{base}.scss"))];
    if let (Some(dir), Some(name)) = (base.parent(), base.file_name()) {
        if !name.starts_with('_') {
            out.push(dir.join(format!("_{name}.scss")));
            out.push(dir.join(format!("_{name}")));
        }
    }
    out.push(base.join("_index.scss"));
    out.push(base.join("index.scss"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;

    fn dir(p: &str) -> NormalizedPath {
        normalize(p)
    }

    #[test]
    fn css_relative_with_and_without_extension() {
        let fs = MemoryFs::with_files([("/src/base.css", ""), ("/src/theme/dark.css", "")]);
        let opts = ResolveOptions::default();
        let r = Resolver::new(&fs, &opts);
        assert_eq!(r.resolve("./base.css", &dir("/src"), ResourceKind::Css), Some(normalize("/src/base.css")));
        assert_eq!(r.resolve("theme/dark", &dir("/src"), ResourceKind::Css), Some(normalize("/src/theme/dark.css")));
        assert_eq!(r.resolve("../src/base", &dir("/src/app"), ResourceKind::Css), Some(normalize("/src/base.css")));
        assert_eq!(r.resolve("missing", &dir("/src"), ResourceKind::Css), None);
    }

    #[test]
    fn scss_partials_and_index() {
        let fs = MemoryFs::with_files([
            ("/src/_vars.scss", ""),
            ("/src/mixins/_index.scss", ""),
            ("/src/tokens/index.scss", ""),
        ]);
        let opts = ResolveOptions::default();
        let r = Resolver::new(&fs, &opts);
        assert_eq!(r.resolve("vars", &dir("/src"), ResourceKind::Scss), Some(normalize("/src/_vars.scss")));
        assert_eq!(r.resolve("_vars", &dir("/src"), ResourceKind::Scss), Some(normalize("/src/_vars.scss")));
        assert_eq!(r.resolve("mixins", &dir("/src"), ResourceKind::Scss), Some(normalize("/src/mixins/_index.scss")));
        assert_eq!(r.resolve("tokens", &dir("/src"), ResourceKind::Scss), Some(normalize("/src/tokens/index.scss")));
    }

    #[test]
    fn scss_exact_file_wins_over_partial() {
        let fs = MemoryFs::with_files([("/src/vars.scss", ""), ("/src/_vars.scss", "")]);
        let opts = ResolveOptions::default();
        let r = Resolver::new(&fs, &opts);
        assert_eq!(r.resolve("vars", &dir("/src"), ResourceKind::Scss), Some(normalize("/src/vars.scss")));
    }

    #[test]
    fn aliases_prefer_longest_match() {
        let fs = MemoryFs::with_files([("/lib/styles/_a.scss", ""), ("/app/a.scss", "")]);
        let opts = ResolveOptions::new([
            ("@app".to_string(), normalize("/app")),
            ("@app/styles".to_string(), normalize("/lib/styles")),
        ]);
        let r = Resolver::new(&fs, &opts);
        assert_eq!(r.resolve("@app/styles/a", &dir("/x"), ResourceKind::Scss), Some(normalize("/lib/styles/_a.scss")));
        assert_eq!(r.resolve("@app/a", &dir("/x"), ResourceKind::Scss), Some(normalize("/app/a.scss")));
        assert_eq!(r.base_path("@apps/a", &dir("/x")), normalize("/x/@apps/a"));
    }

    #[test]
    fn remote_specifiers_never_resolve() {
        let fs = MemoryFs::new();
        let opts = ResolveOptions::default();
        let r = Resolver::new(&fs, &opts);
        assert!(is_remote("https://fonts.example/css"));
        assert!(is_remote("//cdn.example/a.css"));
        assert_eq!(r.resolve("http://x/a.css", &dir("/"), ResourceKind::Css), None);
    }

    #[test]
    fn scss_candidate_order() {
        let fs = MemoryFs::new();
        let opts = ResolveOptions::default();
        let r = Resolver::new(&fs, &opts);
        let names: Vec<String> = r
            .candidates("theme", &dir("/s"), ResourceKind::Scss)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            names,
            [
                "/s/theme",
                "/s/theme.scss",
                "/s/_theme.scss",
                "/s/_theme",
                "/s/theme/_index.scss",
                "/s/theme/index.scss",
            ]
        );
    }
}
