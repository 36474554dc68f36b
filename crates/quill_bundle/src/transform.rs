//! Resource transforms: stylesheet import inlining and the Scss subset.
//!
//! A transform turns one entry into an ordered list of [`Chunk`]s, each
//! tagged with the file it came from, plus the set of files it read. The
//! emitter concatenates the chunks; the source map lists their origins.
//!
//! Stylesheets are walked statement by statement. Only statement-level
//! `@import`/`@use` directives are recognised; quoted strings, block
//! comments and `url(...)` arguments are skipped over verbatim.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use quill_common::NormalizedPath;
use quill_diagnostics::{Diagnostic, Location};

use crate::codes::{E301, E302, E303, W301};
use crate::fs::{is_virtual, FileSystem};
use crate::kind::ResourceKind;
use crate::resolve::{is_remote, Resolver};

/// A run of output text and the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The originating file.
    pub source: NormalizedPath,
    /// Transformed text.
    pub text: String,
}

/// Everything a transform produced.
#[derive(Debug, Default)]
pub struct Transformed {
    /// Output text in document order.
    pub chunks: Vec<Chunk>,
    /// Every on-disk file read or probed, including ones that failed.
    pub dependencies: BTreeSet<NormalizedPath>,
    /// Errors and warnings found along the way.
    pub diagnostics: Vec<Diagnostic>,
}

impl Transformed {
    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Reads `entry` through `fs` and applies the transform for `kind`.
///
/// `context` is the directory synthetic entries resolve their imports from.
pub fn transform_entry(
    entry: &NormalizedPath,
    kind: ResourceKind,
    fs: &dyn FileSystem,
    resolver: &Resolver<'_>,
    context: &NormalizedPath,
) -> Transformed {
    let mut out = Transformed::default();
    if !is_virtual(entry.as_str()) {
        out.dependencies.insert(entry.clone());
    }

    let content = match fs.read_to_string(Path::new(entry.as_str())) {
        Ok(content) => content,
        Err(err) => {
            out.diagnostics.push(
                Diagnostic::error(E302, format!("cannot read '{entry}': {err}"))
                    .with_location(Location::file(entry.as_str())),
            );
            return out;
        }
    };

    if kind.is_stylesheet() {
        let mut inliner = StyleInliner {
            fs,
            resolver,
            kind,
            context,
            stack: vec![entry.clone()],
            variables: HashMap::new(),
            out,
        };
        inliner.process_file(entry, &content);
        inliner.out
    } else {
        out.chunks.push(Chunk {
            source: entry.clone(),
            text: content,
        });
        out
    }
}

struct StyleInliner<'a> {
    fs: &'a dyn FileSystem,
    resolver: &'a Resolver<'a>,
    kind: ResourceKind,
    context: &'a NormalizedPath,
    stack: Vec<NormalizedPath>,
    variables: HashMap<String, String>,
    out: Transformed,
}

impl StyleInliner<'_> {
    fn scss(&self) -> bool {
        self.kind == ResourceKind::Scss
    }

    fn directory_of(&self, path: &NormalizedPath) -> NormalizedPath {
        if is_virtual(path.as_str()) {
            return self.context.clone();
        }
        path.parent().unwrap_or_else(|| self.context.clone())
    }

    fn process_file(&mut self, path: &NormalizedPath, content: &str) {
        let text = if self.scss() {
            strip_line_comments(content)
        } else {
            content.to_string()
        };
        let bytes = text.as_bytes();

        let mut i = 0;
        let mut segment_start = 0;
        let mut at_statement_start = true;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' => {
                    i = skip_string(bytes, i);
                    at_statement_start = false;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
                b'{' | b'}' | b';' => {
                    i += 1;
                    at_statement_start = true;
                }
                c if c.is_ascii_whitespace() => i += 1,
                b'@' if at_statement_start && self.is_import_at(&text, i) => {
                    let end = statement_end(bytes, i);
                    self.flush(path, &text, segment_start, i);
                    self.handle_import(path, &text, i, end);
                    i = end;
                    segment_start = end;
                }
                b'$' if at_statement_start && self.scss() => match parse_declaration(&text, i) {
                    Some(decl) => {
                        self.flush(path, &text, segment_start, i);
                        self.declare(path, &text, decl);
                        i = decl.end;
                        segment_start = decl.end;
                    }
                    None => {
                        i += 1;
                        at_statement_start = false;
                    }
                },
                _ => {
                    i += 1;
                    at_statement_start = false;
                }
            }
        }
        self.flush(path, &text, segment_start, bytes.len());
    }

    fn is_import_at(&self, text: &str, at: usize) -> bool {
        keyword_at(text, at, "@import") || (self.scss() && keyword_at(text, at, "@use"))
    }

    fn handle_import(&mut self, path: &NormalizedPath, text: &str, start: usize, end: usize) {
        let directive = text[start..end].trim_end_matches(';').trim();
        let keyword = if directive.starts_with("@import") { "@import" } else { "@use" };
        let rest = &directive[keyword.len()..];

        let (specifiers, trailer) = parse_specifiers(rest);
        let trailer = trailer.trim();
        if specifiers.is_empty() || (!self.scss() && !trailer.is_empty()) {
            // Media-qualified or malformed imports are left for the browser.
            self.push_chunk(path, format!("{directive};"));
            return;
        }

        let from_dir = self.directory_of(path);
        for specifier in specifiers {
            if is_remote(&specifier) || (self.scss() && specifier.ends_with(".css")) {
                self.push_chunk(path, format!("@import url({specifier});"));
                continue;
            }
            let probe = self.resolver.probe(&specifier, &from_dir, self.kind);
            self.out.dependencies.extend(probe.missed);
            match probe.resolved {
                Some(resolved) => self.inline(path, text, start, resolved),
                None => {
                    self.out.diagnostics.push(
                        Diagnostic::error(E301, format!("can't resolve '{specifier}' in '{from_dir}'"))
                            .with_location(Location::in_text(path.as_str(), text, start)),
                    );
                }
            }
        }
    }

    fn inline(&mut self, importer: &NormalizedPath, text: &str, at: usize, resolved: NormalizedPath) {
        self.out.dependencies.insert(resolved.clone());
        if self.stack.contains(&resolved) {
            self.out.diagnostics.push(
                Diagnostic::warning(W301, format!("circular import of '{resolved}' skipped"))
                    .with_location(Location::in_text(importer.as_str(), text, at))
                    .with_note(format!(
                        "import chain: {}",
                        self.stack.iter().map(NormalizedPath::as_str).collect::<Vec<_>>().join(" -> ")
                    )),
            );
            return;
        }

        match self.fs.read_to_string(Path::new(resolved.as_str())) {
            Ok(content) => {
                self.stack.push(resolved.clone());
                self.process_file(&resolved, &content);
                self.stack.pop();
            }
            Err(err) => self.out.diagnostics.push(
                Diagnostic::error(E302, format!("cannot read '{resolved}': {err}"))
                    .with_location(Location::in_text(importer.as_str(), text, at)),
            ),
        }
    }

    fn declare(&mut self, path: &NormalizedPath, text: &str, decl: Declaration) {
        let name = &text[decl.name.0..decl.name.1];
        if decl.is_default && self.variables.contains_key(name) {
            return;
        }
        let raw = &text[decl.value.0..decl.value.1];
        let value = self.substitute(path, text, decl.value.0, raw);
        tracing::trace!(variable = name, value = %value, "scss declaration");
        self.variables.insert(name.to_string(), value);
    }

    fn flush(&mut self, path: &NormalizedPath, text: &str, start: usize, end: usize) {
        let segment = &text[start..end];
        if segment.trim().is_empty() {
            return;
        }
        let output = if self.scss() {
            self.substitute(path, text, start, segment)
        } else {
            segment.to_string()
        };
        self.push_chunk(path, output);
    }

    fn push_chunk(&mut self, path: &NormalizedPath, text: String) {
        match self.out.chunks.last_mut() {
            Some(last) if &last.source == path => last.text.push_str(&text),
            _ => self.out.chunks.push(Chunk {
                source: path.clone(),
                text,
            }),
        }
    }

    /// Replaces `$name` and `#{$name}` in `segment`, which starts at byte
    /// `base` of `text`. Quoted strings are copied untouched.
    fn substitute(&mut self, path: &NormalizedPath, text: &str, base: usize, segment: &str) -> String {
        let bytes = segment.as_bytes();
        let mut out = String::with_capacity(segment.len());
        let mut copied = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' => i = skip_string(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
                b'#' if segment[i..].starts_with("#{$") => {
                    let name_end = ident_end(bytes, i + 3);
                    if name_end > i + 3 && bytes.get(name_end) == Some(&b'}') {
                        out.push_str(&segment[copied..i]);
                        out.push_str(&self.lookup(path, text, base + i, &segment[i + 3..name_end]));
                        i = name_end + 1;
                        copied = i;
                    } else {
                        i += 1;
                    }
                }
                b'$' => {
                    let name_end = ident_end(bytes, i + 1);
                    if name_end > i + 1 {
                        out.push_str(&segment[copied..i]);
                        out.push_str(&self.lookup(path, text, base + i, &segment[i + 1..name_end]));
                        i = name_end;
                        copied = i;
                    } else {
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }
        out.push_str(&segment[copied..]);
        out
    }

    fn lookup(&mut self, path: &NormalizedPath, text: &str, at: usize, name: &str) -> String {
        match self.variables.get(name) {
            Some(value) => value.clone(),
            None => {
                self.out.diagnostics.push(
                    Diagnostic::error(E303, format!("undefined variable ${name}"))
                        .with_location(Location::in_text(path.as_str(), text, at)),
                );
                format!("${name}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Declaration {
    name: (usize, usize),
    value: (usize, usize),
    is_default: bool,
    end: usize,
}

/// Parses `$name: value [!default];` starting at the `$`.
fn parse_declaration(text: &str, at: usize) -> Option<Declaration> {
    let bytes = text.as_bytes();
    let name_start = at + 1;
    let name_end = ident_end(bytes, name_start);
    if name_end == name_start {
        return None;
    }
    let mut i = name_end;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b':') {
        return None;
    }
    let value_start = i + 1;
    let end = statement_end(bytes, value_start);
    let body_end = if end > value_start && bytes[end - 1] == b';' { end - 1 } else { end };

    let mut value = text[value_start..body_end].trim_end();
    let mut is_default = false;
    if let Some(stripped) = value.strip_suffix("!default") {
        value = stripped.trim_end();
        is_default = true;
    }
    let leading = value.len() - value.trim_start().len();
    let value_start = value_start + leading;
    Some(Declaration {
        name: (name_start, name_end),
        value: (value_start, value_start + value.trim_start().len()),
        is_default,
        end,
    })
}

/// Splits the argument list of an import directive into specifiers and
/// whatever follows the last one (media queries, `as ns`, ...).
fn parse_specifiers(rest: &str) -> (Vec<String>, &str) {
    let mut specifiers = Vec::new();
    let mut s = rest.trim_start();
    loop {
        let (spec, after) = if let Some(inner) = s.strip_prefix("url(") {
            match inner.find(')') {
                Some(close) => (unquote(inner[..close].trim()), &inner[close + 1..]),
                None => break,
            }
        } else if let Some(quote) = s.chars().next().filter(|c| *c == '"' || *c == '\'') {
            match s[1..].find(quote) {
                Some(close) => (s[1..close + 1].to_string(), &s[close + 2..]),
                None => break,
            }
        } else {
            break;
        };
        specifiers.push(spec);
        s = after.trim_start();
        match s.strip_prefix(',') {
            Some(next) => s = next.trim_start(),
            None => break,
        }
    }
    (specifiers, s)
}

fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn keyword_at(text: &str, at: usize, keyword: &str) -> bool {
    text[at..].starts_with(keyword)
        && text.as_bytes()
            .get(at + keyword.len())
            .map_or(true, |b| !(b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_'))
}

/// Index just past the `;` ending the statement at `from`, or the end of input.
fn statement_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    let mut parens = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b';' if parens == 0 => return i + 1,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Index just past the closing quote of the string starting at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            b'\n' => return i,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b'_') {
        i += 1;
    }
    i
}

/// Removes `//` comments that are outside strings, block comments and
/// parentheses. Line breaks are kept so diagnostic positions stay valid.
fn strip_line_comments(content: &str) -> String {
    let bytes = content.as_bytes();
    let mut out = String::with_capacity(content.len());
    let mut copied = 0;
    let mut parens = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'(' => {
                parens += 1;
                i += 1;
            }
            b')' => {
                parens = parens.saturating_sub(1);
                i += 1;
            }
            b'/' if parens == 0 && bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&content[copied..i]);
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                copied = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&content[copied..]);
    out
}
