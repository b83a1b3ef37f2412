//! Lifecycle definitions and the standard pipeline.

use serde::Deserialize;

/// Id of the standard reset lifecycle.
pub const CLEAN_LIFECYCLE: &str = "clean";

const CLEAN_PHASES: &[&str] = &["pre-clean", "clean", "post-clean"];

const DEFAULT_PHASES: &[&str] = &[
    "validate",
    "initialize",
    "generate-sources",
    "process-sources",
    "generate-resources",
    "process-resources",
    "compile",
    "process-classes",
    "generate-test-sources",
    "process-test-sources",
    "generate-test-resources",
    "process-test-resources",
    "test-compile",
    "process-test-classes",
    "test",
    "prepare-package",
    "package",
    "pre-integration-test",
    "integration-test",
    "post-integration-test",
    "verify",
    "install",
    "deploy",
];

const SITE_PHASES: &[&str] = &["pre-site", "site", "post-site", "site-deploy"];

/// A named, ordered group of phases.
///
/// The canonical phase order of a pipeline is the concatenation of its
/// lifecycles' phase lists in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifecycleDef {
    /// Lifecycle id (e.g. `clean`, `default`).
    pub id: String,
    /// Phases of this lifecycle, in execution order.
    pub phases: Vec<String>,
}

impl LifecycleDef {
    fn from_static(id: &str, phases: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            phases: phases.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Returns the standard `clean`, `default` and `site` lifecycles, in that order.
pub fn standard_lifecycles() -> Vec<LifecycleDef> {
    vec![
        LifecycleDef::from_static(CLEAN_LIFECYCLE, CLEAN_PHASES),
        LifecycleDef::from_static("default", DEFAULT_PHASES),
        LifecycleDef::from_static("site", SITE_PHASES),
    ]
}
