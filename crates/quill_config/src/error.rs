//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `quill.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.name".to_string());
        assert_eq!(err.to_string(), "missing required field: project.name");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("unknown variant `less`".to_string());
        assert_eq!(
            err.to_string(),
            "failed to parse configuration: unknown variant `less`"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("watch.poll_interval_ms must be > 0".into());
        assert_eq!(
            err.to_string(),
            "validation error: watch.poll_interval_ms must be > 0"
        );
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no quill.toml");
        let err: ConfigError = io_err.into();
        assert!(err.to_string().starts_with("failed to read configuration:"));
    }
}
