//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "quill.toml";

/// Loads and validates `<project_dir>/quill.toml`.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `quill.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.version.is_empty() {
        return Err(ConfigError::MissingField("project.version".to_string()));
    }
    if config.project.sources.is_empty() {
        return Err(ConfigError::ValidationError(
            "project.sources must name at least one directory".to_string(),
        ));
    }
    if config.watch.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "watch.poll_interval_ms must be greater than zero".to_string(),
        ));
    }
    if let Some(alias) = config.build.aliases.keys().find(|k| k.trim().is_empty()) {
        return Err(ConfigError::ValidationError(format!(
            "build.aliases contains an empty alias name ({alias:?})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HookApi, StyleLanguage};

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "shop"
version = "0.1.0"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "shop");
        assert_eq!(config.project.sources, vec!["src"]);
        assert_eq!(config.project.out_dir, "dist");
        assert_eq!(config.build.hook_api, HookApi::ProcessAssets);
        assert_eq!(config.watch.poll_interval_ms, 250);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "shop"
version = "1.2.0"
sources = ["src", "projects/ui/src"]
out_dir = "build/web"

[build]
inline_style_language = "scss"
source_maps = true
hook_api = "additional-assets"

[build.aliases]
"@styles" = "src/styles"
"@theme" = "projects/theme"

[watch]
poll_interval_ms = 100

[logging]
level = "debug"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.sources.len(), 2);
        assert_eq!(config.project.out_dir, "build/web");
        assert_eq!(config.build.inline_style_language, StyleLanguage::Scss);
        assert!(config.build.source_maps);
        assert_eq!(config.build.hook_api, HookApi::AdditionalAssets);
        assert_eq!(config.build.aliases["@styles"], "src/styles");
        assert_eq!(config.watch.poll_interval_ms, 100);
        assert_eq!(config.logging.directives(), "debug");
    }

    #[test]
    fn single_source_root_string() {
        let toml = r#"
[project]
name = "shop"
version = "0.1.0"
source_root = "app"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.sources, vec!["app"]);
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
version = "0.1.0"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "project.name"));
    }

    #[test]
    fn missing_version_errors() {
        let toml = r#"
[project]
name = "shop"
version = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "project.version"));
    }

    #[test]
    fn unknown_style_language_is_parse_error() {
        let toml = r#"
[project]
name = "shop"
version = "0.1.0"

[build]
inline_style_language = "less"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let toml = r#"
[project]
name = "shop"
version = "0.1.0"

[watch]
poll_interval_ms = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_alias_rejected() {
        let toml = r#"
[project]
name = "shop"
version = "0.1.0"

[build.aliases]
"" = "src"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_sources_rejected() {
        let toml = r#"
[project]
name = "shop"
version = "0.1.0"
sources = []
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("[project\nname=").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[project]\nname = \"shop\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "shop");
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/quill/project")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
