//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `skipcheck.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A lifecycle referenced by name is not declared.
    #[error("unknown lifecycle '{0}'")]
    UnknownLifecycle(String),

    /// A phase referenced by a setting is not part of any lifecycle.
    #[error("unknown phase '{phase}' in {setting}")]
    UnknownPhase {
        /// The setting that referenced the phase.
        setting: String,
        /// The phase name that was not found.
        phase: String,
    },

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A `key=value` property assignment could not be parsed.
    #[error("invalid property assignment '{0}'")]
    InvalidProperty(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_lifecycle() {
        let err = ConfigError::UnknownLifecycle("wipe".to_string());
        assert_eq!(format!("{err}"), "unknown lifecycle 'wipe'");
    }

    #[test]
    fn display_unknown_phase() {
        let err = ConfigError::UnknownPhase {
            setting: "check.persist_phase".to_string(),
            phase: "publish".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "unknown phase 'publish' in check.persist_phase"
        );
    }

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.group".to_string());
        assert_eq!(format!("{err}"), "missing required field: project.group");
    }

    #[test]
    fn display_invalid_property() {
        let err = ConfigError::InvalidProperty("=true".to_string());
        assert_eq!(format!("{err}"), "invalid property assignment '=true'");
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
