//! Shared setup for CLI commands.
//!
//! Every command needs the same collaborators: the project root and
//! configuration, the resolved check settings, and the sequencer, scanner
//! and store built from them.

use std::path::PathBuf;

use skipcheck_cache::{FileScanner, SnapshotStore};
use skipcheck_common::{Project, ProjectIdentity};
use skipcheck_config::{find_project_root, load_config, resolve_check, Properties, ResolvedCheck};
use skipcheck_engine::{BuildStep, GateSettings, PhaseSequencer, RebuildDecider};
use tracing::debug;

use crate::GlobalArgs;

/// Resolves the project root directory from global CLI args.
///
/// `--project` is used as given; otherwise the current directory and its
/// parents are searched for `skipcheck.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match &global.project {
        Some(dir) => Ok(dir.clone()),
        None => {
            let cwd = std::env::current_dir()?;
            Ok(find_project_root(&cwd)?)
        }
    }
}

/// Everything a command needs to talk about one project.
pub struct Session {
    /// The project and its active identity.
    pub project: Project,
    /// Effective check settings.
    pub check: ResolvedCheck,
    /// Commands to run per phase.
    pub steps: std::collections::BTreeMap<String, String>,
    /// Phase ordering.
    pub sequencer: PhaseSequencer,
    /// File-set scanner.
    pub scanner: FileScanner,
    /// Snapshot storage.
    pub store: SnapshotStore,
}

impl Session {
    /// Loads the project configuration and builds the collaborators.
    pub fn open(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let root = resolve_project_root(global)?;
        let config = load_config(&root)?;
        let user = Properties::from_assignments(&global.defines)?;
        let check = resolve_check(&config, &root, &user)?;

        let identity = ProjectIdentity::new(
            &config.project.group,
            &config.project.artifact,
            &config.project.version,
        )
        .with_options(config.project.options.iter().cloned())
        .with_options(global.options.iter().cloned());
        debug!(project = %identity, root = %root.display(), storage = %check.storage.display(), "opened project");

        let sequencer = PhaseSequencer::new(check.phases.clone(), &check.reset_phases)?;
        let scanner = FileScanner::new(check.source_dir.clone());
        let store = SnapshotStore::new(check.storage.clone());

        Ok(Self {
            project: Project::new(identity, root),
            check,
            steps: config.steps,
            sequencer,
            scanner,
            store,
        })
    }

    /// A decider over this session's collaborators.
    pub fn decider(&self) -> RebuildDecider<'_> {
        RebuildDecider::new(&self.sequencer, &self.scanner, &self.store)
    }

    /// Gate settings derived from the resolved check settings.
    pub fn gate_settings(&self) -> GateSettings {
        gate_settings(&self.check)
    }
}

/// Maps resolved check settings onto gate settings.
pub fn gate_settings(check: &ResolvedCheck) -> GateSettings {
    GateSettings {
        enabled: check.enabled,
        persist_phase: check.persist_phase.clone(),
        downstream_phase: check.downstream_phase.clone(),
        cascade_reset: check.cascade_reset,
    }
}

/// Builds one step per requested phase.
pub fn steps_from_phases(phases: &[String], explicit: bool) -> Vec<BuildStep> {
    phases
        .iter()
        .map(|phase| {
            let step = BuildStep::for_phase(phase.as_str());
            if explicit {
                step.explicit()
            } else {
                step
            }
        })
        .collect()
}
