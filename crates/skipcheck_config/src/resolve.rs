//! Resolution of the effective staleness check settings.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::properties::{resolve_flag, Properties, BUILD_CHECK_ENABLED};
use crate::types::SkipcheckConfig;

/// Fully resolved settings for one project and one invocation.
///
/// Combines the file configuration with the user properties of the current
/// invocation. Empty phase settings are normalized to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCheck {
    /// Whether skipping is allowed at all (`build.check.enabled`).
    pub enabled: bool,
    /// Canonical phase order.
    pub phases: Vec<String>,
    /// Phases of the reset lifecycle.
    pub reset_phases: Vec<String>,
    /// Phase after which a snapshot is recorded.
    pub persist_phase: Option<String>,
    /// Phase after which dependents are invalidated.
    pub downstream_phase: Option<String>,
    /// Whether reset steps also invalidate dependents.
    pub cascade_reset: bool,
    /// Source subdirectory name.
    pub source_dir: String,
    /// Absolute base directory for snapshot records.
    pub storage: PathBuf,
}

/// Resolves the effective settings for the project rooted at `project_dir`.
///
/// The enablement flag is looked up in `user` first, then in the file's
/// `[properties]` table, defaulting to `false`.
pub fn resolve_check(
    config: &SkipcheckConfig,
    project_dir: &Path,
    user: &Properties,
) -> Result<ResolvedCheck, ConfigError> {
    let enabled = resolve_flag(user, &config.system_properties(), BUILD_CHECK_ENABLED, false);

    let reset_phases = config
        .lifecycle(&config.check.reset_lifecycle)
        .map(|l| l.phases.clone())
        .ok_or_else(|| ConfigError::UnknownLifecycle(config.check.reset_lifecycle.clone()))?;

    let storage = match &config.check.storage {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => project_dir.join(path),
        None => default_storage(project_dir),
    };

    Ok(ResolvedCheck {
        enabled,
        phases: config.phase_order(),
        reset_phases,
        persist_phase: non_empty(&config.check.persist_phase),
        downstream_phase: non_empty(&config.check.invalidate_downstream_after),
        cascade_reset: config.check.cascade_reset,
        source_dir: config.check.source_dir.clone(),
        storage,
    })
}

/// `<home>/.skipcheck/repository`, or `<project>/.skipcheck` when no home
/// directory can be determined.
fn default_storage(project_dir: &Path) -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".skipcheck").join("repository"),
        None => project_dir.join(".skipcheck"),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
