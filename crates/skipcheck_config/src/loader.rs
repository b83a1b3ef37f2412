//! Configuration file loading and validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::SkipcheckConfig;

/// Name of the per-project configuration file.
pub const CONFIG_FILE: &str = "skipcheck.toml";

/// Walks up from `start` looking for the nearest directory containing `skipcheck.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::ValidationError(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )));
        }
    }
}

/// Loads and validates `<project_dir>/skipcheck.toml`.
pub fn load_config(project_dir: &Path) -> Result<SkipcheckConfig, ConfigError> {
    let content = std::fs::read_to_string(project_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `skipcheck.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<SkipcheckConfig, ConfigError> {
    let config: SkipcheckConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &SkipcheckConfig) -> Result<(), ConfigError> {
    for (field, value) in [
        ("project.group", &config.project.group),
        ("project.artifact", &config.project.artifact),
        ("project.version", &config.project.version),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
    }
    if config.check.source_dir.trim().is_empty() {
        return Err(ConfigError::MissingField("check.source_dir".to_string()));
    }

    let mut ids = HashSet::new();
    for lifecycle in &config.lifecycles {
        if !ids.insert(lifecycle.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "lifecycle '{}' declared more than once",
                lifecycle.id
            )));
        }
    }

    let mut phases = HashSet::new();
    for phase in config.lifecycles.iter().flat_map(|l| &l.phases) {
        if !phases.insert(phase.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "phase '{phase}' appears in more than one position"
            )));
        }
    }

    let reset = config
        .lifecycle(&config.check.reset_lifecycle)
        .ok_or_else(|| ConfigError::UnknownLifecycle(config.check.reset_lifecycle.clone()))?;
    if reset.phases.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "reset lifecycle '{}' has no phases",
            reset.id
        )));
    }
    let order = config.phase_order();
    let boundary = order
        .iter()
        .rposition(|phase| reset.phases.contains(phase))
        .unwrap_or(0);
    if let Some(phase) = order[..boundary]
        .iter()
        .find(|phase| !reset.phases.contains(*phase))
    {
        return Err(ConfigError::ValidationError(format!(
            "phase '{phase}' is ordered before the end of reset lifecycle '{}'",
            reset.id
        )));
    }

    for (setting, phase) in [
        ("check.persist_phase", &config.check.persist_phase),
        (
            "check.invalidate_downstream_after",
            &config.check.invalidate_downstream_after,
        ),
    ] {
        if !phase.is_empty() && !phases.contains(phase.as_str()) {
            return Err(ConfigError::UnknownPhase {
                setting: setting.to_string(),
                phase: phase.clone(),
            });
        }
    }

    for phase in config.steps.keys() {
        if !phases.contains(phase.as_str()) {
            return Err(ConfigError::UnknownPhase {
                setting: "steps".to_string(),
                phase: phase.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[project]
group = "com.example"
artifact = "app"
version = "1.0.0"
"#;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.project.group, "com.example");
        assert_eq!(config.project.artifact, "app");
        assert_eq!(config.project.version, "1.0.0");
        assert!(config.project.options.is_empty());
    }

    #[test]
    fn default_values() {
        let config = load_config_from_str(MINIMAL).unwrap();
        assert_eq!(config.check.source_dir, "src");
        assert_eq!(config.check.persist_phase, "install");
        assert_eq!(config.check.invalidate_downstream_after, "compile");
        assert_eq!(config.check.reset_lifecycle, "clean");
        assert!(!config.check.cascade_reset);
        assert!(config.check.storage.is_none());
        assert_eq!(config.lifecycles.len(), 3);
        assert!(config.properties.is_empty());
        assert!(config.steps.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
group = "com.example"
artifact = "app"
version = "1.0.0"
options = ["ci"]

[check]
source_dir = "source"
storage = "/var/cache/skipcheck"
persist_phase = "package"
invalidate_downstream_after = ""
cascade_reset = true
reset_lifecycle = "wipe"

[[lifecycles]]
id = "wipe"
phases = ["wipe"]

[[lifecycles]]
id = "build"
phases = ["compile", "package"]

[properties]
"build.check.enabled" = true

[steps]
compile = "cargo build"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.options, vec!["ci"]);
        assert_eq!(config.check.source_dir, "source");
        assert_eq!(
            config.check.storage.as_deref(),
            Some(Path::new("/var/cache/skipcheck"))
        );
        assert!(config.check.cascade_reset);
        assert_eq!(config.phase_order(), vec!["wipe", "compile", "package"]);
        assert_eq!(
            config.system_properties().get("build.check.enabled"),
            Some("true")
        );
        assert_eq!(config.steps["compile"], "cargo build");
    }

    #[test]
    fn missing_group_errors() {
        let toml = r#"
[project]
group = ""
artifact = "app"
version = "1.0.0"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "project.group"));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unknown_reset_lifecycle_errors() {
        let toml = format!("{MINIMAL}\n[check]\nreset_lifecycle = \"wipe\"\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLifecycle(ref id) if id == "wipe"));
    }

    #[test]
    fn unknown_persist_phase_errors() {
        let toml = format!("{MINIMAL}\n[check]\npersist_phase = \"publish\"\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPhase { ref phase, .. } if phase == "publish"));
    }

    #[test]
    fn unknown_step_phase_errors() {
        let toml = format!("{MINIMAL}\n[steps]\npublish = \"true\"\n");
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPhase { ref setting, .. } if setting == "steps"));
    }

    #[test]
    fn duplicate_phase_errors() {
        let toml = format!(
            "{MINIMAL}\n[[lifecycles]]\nid = \"clean\"\nphases = [\"clean\"]\n\n[[lifecycles]]\nid = \"build\"\nphases = [\"clean\", \"install\", \"compile\"]\n"
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn duplicate_lifecycle_errors() {
        let toml = format!(
            "{MINIMAL}\n[[lifecycles]]\nid = \"clean\"\nphases = [\"clean\"]\n\n[[lifecycles]]\nid = \"clean\"\nphases = [\"install\", \"compile\"]\n"
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("more than once")));
    }

    #[test]
    fn reset_lifecycle_after_build_phases_errors() {
        let toml = format!(
            "{MINIMAL}\n[[lifecycles]]\nid = \"default\"\nphases = [\"compile\", \"install\"]\n\n[[lifecycles]]\nid = \"clean\"\nphases = [\"clean\"]\n"
        );
        let err = load_config_from_str(&toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::ValidationError(ref m) if m.contains("'compile'") && m.contains("'clean'"))
        );
    }

    #[test]
    fn multi_phase_reset_lifecycle_first_is_accepted() {
        let toml = format!(
            "{MINIMAL}\n[check]\nreset_lifecycle = \"wipe\"\n\n[[lifecycles]]\nid = \"wipe\"\nphases = [\"pre-wipe\", \"wipe\"]\n\n[[lifecycles]]\nid = \"default\"\nphases = [\"compile\"]\n"
        );
        let config = load_config_from_str(&toml).unwrap();
        assert_eq!(config.phase_order(), vec!["pre-wipe", "wipe", "compile"]);
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), MINIMAL).unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.artifact, "app");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(dir.path()).unwrap_err(),
            ConfigError::IoError(_)
        ));
    }

    #[test]
    fn find_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), MINIMAL).unwrap();
        let nested = dir.path().join("src").join("main");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), dir.path());
    }

    #[test]
    fn find_root_fails_without_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_project_root(dir.path()).is_err());
    }
}
