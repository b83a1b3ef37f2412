//! Configuration types deserialized from `skipcheck.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::lifecycle::{standard_lifecycles, LifecycleDef, CLEAN_LIFECYCLE};
use crate::properties::Properties;

/// The top-level configuration parsed from `skipcheck.toml`.
#[derive(Debug, Deserialize)]
pub struct SkipcheckConfig {
    /// Identity of the project this file belongs to.
    pub project: ProjectMeta,
    /// Staleness check settings.
    #[serde(default)]
    pub check: CheckConfig,
    /// Pipeline lifecycles, in canonical order. Defaults to the standard
    /// `clean`, `default` and `site` lifecycles.
    #[serde(default = "standard_lifecycles")]
    pub lifecycles: Vec<LifecycleDef>,
    /// System-level properties (e.g. `build.check.enabled`).
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,
    /// Shell commands the CLI host runs for each phase.
    #[serde(default)]
    pub steps: BTreeMap<String, String>,
}

/// Identity fields of the project.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// Dotted group id.
    pub group: String,
    /// Artifact id.
    pub artifact: String,
    /// Version string.
    pub version: String,
    /// Options that are always active for this project.
    #[serde(default)]
    pub options: Vec<String>,
}

/// The `[check]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    /// Source subdirectory scanned recursively, relative to the project root.
    #[serde(default = "default_source_dir")]
    pub source_dir: String,
    /// Base directory for snapshot records. Relative paths are resolved
    /// against the project root; unset means `<home>/.skipcheck/repository`.
    #[serde(default)]
    pub storage: Option<PathBuf>,
    /// Phase after which a fresh snapshot is recorded.
    #[serde(default = "default_persist_phase")]
    pub persist_phase: String,
    /// Phase after which dependents' snapshots are invalidated. Empty disables.
    #[serde(default = "default_downstream_phase")]
    pub invalidate_downstream_after: String,
    /// Whether running a reset step also invalidates dependents.
    #[serde(default)]
    pub cascade_reset: bool,
    /// Id of the lifecycle whose phases form the reset group.
    #[serde(default = "default_reset_lifecycle")]
    pub reset_lifecycle: String,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            storage: None,
            persist_phase: default_persist_phase(),
            invalidate_downstream_after: default_downstream_phase(),
            cascade_reset: false,
            reset_lifecycle: default_reset_lifecycle(),
        }
    }
}

fn default_source_dir() -> String {
    "src".to_string()
}

fn default_persist_phase() -> String {
    "install".to_string()
}

fn default_downstream_phase() -> String {
    "compile".to_string()
}

fn default_reset_lifecycle() -> String {
    CLEAN_LIFECYCLE.to_string()
}

impl SkipcheckConfig {
    /// Returns the `[properties]` table as system properties.
    ///
    /// Non-string TOML values are rendered with their TOML representation,
    /// so `enabled = true` and `enabled = "true"` are equivalent.
    pub fn system_properties(&self) -> Properties {
        self.properties
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }

    /// Returns the canonical phase order: all lifecycles' phases, concatenated.
    pub fn phase_order(&self) -> Vec<String> {
        self.lifecycles
            .iter()
            .flat_map(|l| l.phases.iter().cloned())
            .collect()
    }

    /// Returns the lifecycle with the given id.
    pub fn lifecycle(&self, id: &str) -> Option<&LifecycleDef> {
        self.lifecycles.iter().find(|l| l.id == id)
    }
}
