//! Turns transformed chunks into the emitted module and its source map.

use serde::Serialize;

use crate::transform::Chunk;

/// How the emitted module exposes its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportShape {
    /// `exports.default = ...;` (stylesheets).
    Default,
    /// `module.exports = ...;` (templates and raw text).
    Plain,
}

/// Emits a module computing the concatenation of `chunks`.
pub fn emit_module(chunks: &[Chunk], shape: ExportShape) -> String {
    let mut code = String::from("// quill resource module\n");
    let mut names = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        let name = format!("__quill_chunk_{index}");
        code.push_str(&format!("var {name} = {};\n", string_literal(&chunk.text)));
        names.push(name);
    }

    let value = if names.is_empty() {
        "\"\"".to_string()
    } else {
        names.join(" + ")
    };
    match shape {
        ExportShape::Default => code.push_str(&format!("exports.default = {value};\n")),
        ExportShape::Plain => code.push_str(&format!("module.exports = {value};\n")),
    }
    code
}

/// Emits a module that throws `message` when evaluated.
pub fn emit_failure(message: &str) -> String {
    format!("// quill resource module\nthrow {};\n", string_literal(message))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapV3<'a> {
    version: u8,
    file: &'a str,
    sources: Vec<&'a str>,
    sources_content: Vec<String>,
    names: Vec<&'a str>,
    mappings: &'a str,
}

/// Builds a version-3 source map listing every chunk origin once.
///
/// Content from the same source is concatenated in emission order.
pub fn source_map(file: &str, chunks: &[Chunk]) -> String {
    let mut sources: Vec<&str> = Vec::new();
    let mut contents: Vec<String> = Vec::new();
    for chunk in chunks {
        match sources.iter().position(|s| *s == chunk.source.as_str()) {
            Some(index) => contents[index].push_str(&chunk.text),
            None => {
                sources.push(chunk.source.as_str());
                contents.push(chunk.text.clone());
            }
        }
    }
    let map = SourceMapV3 {
        version: 3,
        file,
        sources,
        sources_content: contents,
        names: Vec::new(),
        mappings: "",
    };
    serde_json::to_string(&map).unwrap_or_default()
}

fn string_literal(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
