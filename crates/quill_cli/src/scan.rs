//! Finding component resource references in source modules.
//!
//! Recognized properties:
//!
//! ```text
//! templateUrl: './button.html'
//! styleUrl: './button.scss'
//! styleUrls: ['./button.scss', './theme.css']
//! styles: [`:host { display: block }`]
//! styles: `:host { display: block }`
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;

/// Resources referenced by one source module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    /// The module the references were found in.
    pub module: PathBuf,
    /// The external template, if any.
    pub template: Option<PathBuf>,
    /// External stylesheets in declaration order.
    pub styles: Vec<PathBuf>,
    /// Inline style sources in declaration order.
    pub inline_styles: Vec<String>,
}

impl Component {
    /// The template followed by the external stylesheets.
    pub fn resource_files(&self) -> impl Iterator<Item = &PathBuf> {
        self.template.iter().chain(self.styles.iter())
    }

    fn is_empty(&self) -> bool {
        self.template.is_none() && self.styles.is_empty() && self.inline_styles.is_empty()
    }
}

/// Scans module text for resource properties.
pub struct ComponentScanner {
    property: Regex,
}

impl ComponentScanner {
    /// Compiles the property pattern.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            property: Regex::new(r"\b(templateUrl|styleUrls|styleUrl|styles)\s*:\s*")?,
        })
    }

    /// Extracts the component declared in `content`, read from `module`.
    ///
    /// Relative URLs are resolved against the module's directory. Returns
    /// `None` when the module references no resources.
    pub fn scan(&self, module: &Path, content: &str) -> Option<Component> {
        let base = module.parent().unwrap_or(Path::new(""));
        let mut component = Component {
            module: module.to_path_buf(),
            ..Component::default()
        };

        for caps in self.property.captures_iter(content) {
            let (Some(name), Some(whole)) = (caps.get(1), caps.get(0)) else {
                continue;
            };
            let values = read_literals(&content[whole.end()..]);
            match name.as_str() {
                "templateUrl" => {
                    if let Some(url) = values.into_iter().next() {
                        component.template = Some(base.join(url));
                    }
                }
                "styleUrl" | "styleUrls" => {
                    component
                        .styles
                        .extend(values.into_iter().map(|url| base.join(url)));
                }
                _ => component
                    .inline_styles
                    .extend(values.into_iter().filter(|s| !s.trim().is_empty())),
            }
        }

        (!component.is_empty()).then_some(component)
    }
}

/// Reads a single string literal or a bracketed list of them.
fn read_literals(text: &str) -> Vec<String> {
    let Some(mut rest) = text.strip_prefix('[') else {
        return read_literal(text).map(|(value, _)| vec![value]).unwrap_or_default();
    };

    let mut values = Vec::new();
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        match read_literal(rest) {
            Some((value, used)) => {
                values.push(value);
                rest = &rest[used..];
            }
            None => break,
        }
    }
    values
}

/// Reads one quoted literal at the start of `text`.
///
/// Returns the unescaped value and the number of bytes consumed including
/// both quotes.
fn read_literal(text: &str) -> Option<(String, usize)> {
    let mut chars = text.char_indices();
    let (_, quote) = chars.next()?;
    if !matches!(quote, '\'' | '"' | '`') {
        return None;
    }

    let mut value = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            c if c == quote => return Some((value, i + c.len_utf8())),
            c => value.push(c),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> Option<Component> {
        ComponentScanner::new()
            .unwrap()
            .scan(Path::new("/work/src/app/button.ts"), content)
    }

    #[test]
    fn module_without_resources() {
        assert!(scan("export const answer = 42;").is_none());
    }

    #[test]
    fn template_and_style_urls() {
        let component = scan(
            "@Component({\n  selector: 'app-button',\n  templateUrl: './button.html',\n  styleUrls: ['./button.scss', \"../theme.css\"],\n})",
        )
        .unwrap();
        assert_eq!(
            component.template,
            Some(PathBuf::from("/work/src/app/./button.html"))
        );
        assert_eq!(
            component.styles,
            vec![
                PathBuf::from("/work/src/app/./button.scss"),
                PathBuf::from("/work/src/app/../theme.css"),
            ]
        );
        assert!(component.inline_styles.is_empty());
        assert_eq!(component.resource_files().count(), 3);
    }

    #[test]
    fn singular_style_url() {
        let component = scan("styleUrl: 'card.css'").unwrap();
        assert_eq!(component.styles, vec![PathBuf::from("/work/src/app/card.css")]);
        assert!(component.template.is_none());
    }

    #[test]
    fn inline_styles_array_and_single() {
        let component =
            scan("styles: [`:host { display: block; }`, `a[href] { color: red; }`]").unwrap();
        assert_eq!(
            component.inline_styles,
            vec![":host { display: block; }", "a[href] { color: red; }"]
        );

        let component = scan("styles: `p { margin: 0 }`").unwrap();
        assert_eq!(component.inline_styles, vec!["p { margin: 0 }"]);
    }

    #[test]
    fn blank_inline_styles_are_dropped() {
        assert!(scan("styles: [``, '  ']").is_none());
    }

    #[test]
    fn escapes_in_literals() {
        let component = scan(r"styles: ['a::after { content: \'x\' }']").unwrap();
        assert_eq!(component.inline_styles, vec!["a::after { content: 'x' }"]);
    }

    #[test]
    fn unterminated_literal_is_ignored() {
        assert!(scan("templateUrl: './broken.html").is_none());
    }

    #[test]
    fn similar_identifiers_do_not_match() {
        assert!(scan("const mystyles: string[] = [];").is_none());
    }
}
