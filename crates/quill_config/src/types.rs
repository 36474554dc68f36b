//! Configuration types deserialized from `quill.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `quill.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata and directory layout.
    pub project: ProjectMeta,
    /// Resource build settings.
    #[serde(default)]
    pub build: BuildConfig,
    /// Watch-mode settings.
    #[serde(default)]
    pub watch: WatchConfig,
    /// Log filtering.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Core project metadata required in every `quill.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    pub version: String,
    /// Directories scanned for component modules, relative to the project root.
    ///
    /// Accepts a single string or a list; defaults to `["src"]`.
    #[serde(
        default = "default_sources",
        alias = "source_root",
        deserialize_with = "deserialize_string_or_vec"
    )]
    pub sources: Vec<String>,
    /// Output directory, relative to the project root.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

fn default_sources() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_out_dir() -> String {
    "dist".to_string()
}

/// Deserializes a field that can be either a single string or a list of strings.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a directory or a list of directories")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Settings for resource compilation.
#[derive(Debug, Default, Deserialize)]
pub struct BuildConfig {
    /// Language of inline `styles` in component modules.
    #[serde(default)]
    pub inline_style_language: StyleLanguage,
    /// Emit an adjacent source map for each compiled resource.
    #[serde(default)]
    pub source_maps: bool,
    /// Which engine hook surface child compilations attach to.
    #[serde(default)]
    pub hook_api: HookApi,
    /// Import aliases: a specifier prefix mapped to a directory relative to the project root.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Stylesheet language for inline styles.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StyleLanguage {
    /// Plain CSS (default).
    #[default]
    Css,
    /// SCSS.
    Scss,
}

impl StyleLanguage {
    /// The MIME type passed to the resource loader for inline data.
    pub fn mime_type(self) -> &'static str {
        match self {
            StyleLanguage::Css => "text/css",
            StyleLanguage::Scss => "text/x-scss",
        }
    }
}

/// Engine hook API generation.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HookApi {
    /// Current engine: staged `process-assets` hooks (default).
    #[default]
    ProcessAssets,
    /// Legacy engine: a single `additional-assets` hook.
    AdditionalAssets,
}

/// Watch-mode settings.
#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    /// Milliseconds between change polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    250
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

/// Log filtering for the CLI.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// A level (`info`, `debug`, ...) or a full filter directive string.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl LoggingConfig {
    /// Normalizes `level` into filter directives.
    ///
    /// Plain levels are case-insensitive and `warning` means `warn`; anything
    /// else is passed through untouched. An empty value means `info`.
    pub fn directives(&self) -> String {
        let trimmed = self.level.trim();
        if trimmed.is_empty() {
            return default_level();
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_string(),
            "debug" => "debug".to_string(),
            "info" => "info".to_string(),
            "warn" | "warning" => "warn".to_string(),
            "error" => "error".to_string(),
            _ => trimmed.to_string(),
        }
    }
}
