//! Skip-aware execution of a requested step list.

use skipcheck_common::{Project, ProjectIdentity};
use tracing::{debug, info, warn};

use crate::decider::{RebuildDecider, Verdict};
use crate::error::GateError;
use crate::step::{BuildStep, StepRunner};

/// Settings that shape how the gate treats a step list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    /// Whether steps may be skipped at all.
    pub enabled: bool,
    /// Phase after which a snapshot is recorded.
    pub persist_phase: Option<String>,
    /// Phase after which dependents are invalidated.
    pub downstream_phase: Option<String>,
    /// Whether reset steps also invalidate dependents.
    pub cascade_reset: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            persist_phase: Some("install".to_string()),
            downstream_phase: Some("compile".to_string()),
            cascade_reset: false,
        }
    }
}

/// What the gate did with a step list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateOutcome {
    /// Names of the steps that ran, in order.
    pub executed: Vec<String>,
    /// Names of the steps that were skipped.
    pub skipped: Vec<String>,
    /// The staleness verdict, if one was needed.
    pub verdict: Option<Verdict>,
}

/// Runs or skips a project's build steps based on its staleness.
#[derive(Debug, Clone)]
pub struct ExecutionGate<'a> {
    decider: RebuildDecider<'a>,
    settings: GateSettings,
}

impl<'a> ExecutionGate<'a> {
    /// Creates a gate.
    pub fn new(decider: RebuildDecider<'a>, settings: GateSettings) -> Self {
        Self { decider, settings }
    }

    /// Executes `steps` for `project` through `runner`.
    ///
    /// Explicitly requested steps always run. Otherwise the reset segment
    /// runs first, invalidating the project's snapshots, and the remainder is
    /// skipped only when checking is enabled, no reset step was requested and
    /// the decider finds the project up to date. The first failing step stops
    /// execution.
    ///
    /// `dependents` are the projects whose snapshots are invalidated once
    /// this project's downstream phase has run.
    pub fn execute<R>(
        &self,
        project: &Project,
        dependents: &[ProjectIdentity],
        steps: &[BuildStep],
        runner: &mut R,
    ) -> Result<GateOutcome, GateError>
    where
        R: StepRunner + ?Sized,
    {
        let sequencer = self.decider.sequencer();
        sequencer.validate(steps)?;
        let mut outcome = GateOutcome::default();
        if steps.is_empty() {
            return Ok(outcome);
        }

        if steps.iter().any(BuildStep::is_explicit) {
            debug!(project = %project, "explicit request, running every step");
            for step in steps {
                let resets = self.is_reset_step(step)?;
                self.run_step(project, dependents, step, resets, runner, &mut outcome)?;
            }
            return Ok(outcome);
        }

        let (reset, remainder) = sequencer.split_reset_segment(steps)?;
        for step in reset {
            self.run_step(project, dependents, step, true, runner, &mut outcome)?;
        }

        if !self.settings.enabled || !reset.is_empty() {
            if !self.settings.enabled {
                debug!(project = %project, "staleness check disabled");
            } else {
                info!(
                    project = %project,
                    boundary = sequencer.boundary(),
                    "reset requested, staleness check skipped"
                );
            }
            for step in remainder {
                let resets = self.is_reset_step(step)?;
                self.run_step(project, dependents, step, resets, runner, &mut outcome)?;
            }
            return Ok(outcome);
        }

        let verdict = self.decider.decide(project, steps)?;
        match &verdict {
            Verdict::NeedRebuild(reason) => {
                info!(project = %project, %reason, "rebuilding");
                for step in remainder {
                    let runs = match step.phase() {
                        Some(phase) => sequencer.is_after_reset_group(phase)?,
                        None => true,
                    };
                    if runs {
                        self.run_step(project, dependents, step, false, runner, &mut outcome)?;
                    } else {
                        outcome.skipped.push(step.name.clone());
                    }
                }
            }
            Verdict::MayBeCached => {
                info!(project = %project, skipped = remainder.len(), "up to date, skipping build steps");
                outcome
                    .skipped
                    .extend(remainder.iter().map(|step| step.name.clone()));
            }
        }
        outcome.verdict = Some(verdict);
        Ok(outcome)
    }

    fn is_reset_step(&self, step: &BuildStep) -> Result<bool, GateError> {
        Ok(match step.phase() {
            Some(phase) => self.decider.sequencer().is_reset_phase(phase)?,
            None => false,
        })
    }

    /// Runs one step with its snapshot hooks.
    ///
    /// With `resets` set the project's snapshots are invalidated before the
    /// step runs. Downstream invalidation and snapshot recording happen only
    /// after the step succeeds.
    fn run_step<R>(
        &self,
        project: &Project,
        dependents: &[ProjectIdentity],
        step: &BuildStep,
        resets: bool,
        runner: &mut R,
        outcome: &mut GateOutcome,
    ) -> Result<(), GateError>
    where
        R: StepRunner + ?Sized,
    {
        let phase = step.phase();

        if resets {
            // Failures are logged inside invalidate.
            let _ = self.decider.invalidate(&project.identity);
            if self.settings.cascade_reset {
                self.decider.invalidate_downstream(project, dependents);
            }
        }

        debug!(project = %project, step = %step, "running step");
        runner.run(step).map_err(|source| GateError::StepFailed {
            step: step.name.clone(),
            source,
        })?;
        outcome.executed.push(step.name.clone());

        if phase.is_some() && phase == self.settings.downstream_phase.as_deref() {
            self.decider.invalidate_downstream(project, dependents);
        }
        if phase.is_some() && phase == self.settings.persist_phase.as_deref() {
            if let Err(e) = self.decider.record_snapshot(project) {
                warn!(project = %project, error = %e, "could not record snapshot");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phases::PhaseSequencer;
    use crate::step::StepError;
    use skipcheck_cache::{FileScanner, SnapshotStore};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        project: Project,
        downstream: Project,
        sequencer: PhaseSequencer,
        scanner: FileScanner,
        store: SnapshotStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().join("app");
            fs::create_dir_all(root.join("src")).unwrap();
            fs::write(root.join("src/a.txt"), "a").unwrap();
            let lib_root = dir.path().join("lib");
            fs::create_dir_all(lib_root.join("src")).unwrap();
            let phases = ["pre-clean", "clean", "compile", "test", "install"]
                .map(String::from)
                .to_vec();
            Self {
                project: Project::new(ProjectIdentity::new("com.example", "app", "1.0"), root),
                downstream: Project::new(
                    ProjectIdentity::new("com.example", "web", "1.0"),
                    lib_root,
                ),
                sequencer: PhaseSequencer::new(phases, &["pre-clean", "clean"]).unwrap(),
                scanner: FileScanner::default(),
                store: SnapshotStore::new(dir.path().join("repo")),
                dir,
            }
        }

        fn gate(&self, settings: GateSettings) -> ExecutionGate<'_> {
            ExecutionGate::new(
                RebuildDecider::new(&self.sequencer, &self.scanner, &self.store),
                settings,
            )
        }

        fn run(&self, settings: GateSettings, steps: &[BuildStep]) -> GateOutcome {
            let mut runner = |_: &BuildStep| -> Result<(), StepError> { Ok(()) };
            self.gate(settings)
                .execute(
                    &self.project,
                    std::slice::from_ref(&self.downstream.identity),
                    steps,
                    &mut runner,
                )
                .unwrap()
        }

        fn has_snapshot(&self, project: &Project) -> bool {
            self.store.exists(&self.store.key_for(&project.identity))
        }

        fn record(&self, project: &Project) {
            RebuildDecider::new(&self.sequencer, &self.scanner, &self.store)
                .record_snapshot(project)
                .unwrap();
        }
    }

    fn enabled() -> GateSettings {
        GateSettings {
            enabled: true,
            ..GateSettings::default()
        }
    }

    fn steps(phases: &[&str]) -> Vec<BuildStep> {
        phases.iter().map(|p| BuildStep::for_phase(*p)).collect()
    }

    #[test]
    fn empty_request_does_nothing() {
        let fx = Fixture::new();
        assert_eq!(fx.run(enabled(), &[]), GateOutcome::default());
    }

    #[test]
    fn disabled_runs_everything_and_records() {
        let fx = Fixture::new();
        let outcome = fx.run(GateSettings::default(), &steps(&["compile", "install"]));
        assert_eq!(outcome.executed, vec!["compile", "install"]);
        assert!(outcome.skipped.is_empty());
        assert!(outcome.verdict.is_none());
        assert!(fx.has_snapshot(&fx.project));
    }

    #[test]
    fn cached_project_skips_remainder() {
        let fx = Fixture::new();
        fx.run(enabled(), &steps(&["compile", "install"]));
        let outcome = fx.run(enabled(), &steps(&["compile", "install"]));
        assert!(outcome.executed.is_empty());
        assert_eq!(outcome.skipped, vec!["compile", "install"]);
        assert_eq!(outcome.verdict, Some(Verdict::MayBeCached));
    }

    #[test]
    fn reset_in_request_runs_everything() {
        let fx = Fixture::new();
        fx.record(&fx.project);
        let outcome = fx.run(enabled(), &steps(&["clean", "compile", "test"]));
        assert_eq!(outcome.executed, vec!["clean", "compile", "test"]);
        assert!(outcome.verdict.is_none());
        assert!(!fx.has_snapshot(&fx.project));
    }

    #[test]
    fn reset_invalidates_even_when_disabled() {
        let fx = Fixture::new();
        fx.record(&fx.project);
        fx.run(GateSettings::default(), &steps(&["clean"]));
        assert!(!fx.has_snapshot(&fx.project));
    }

    #[test]
    fn reset_does_not_cascade_by_default() {
        let fx = Fixture::new();
        fx.record(&fx.downstream);
        fx.run(enabled(), &steps(&["clean"]));
        assert!(fx.has_snapshot(&fx.downstream));

        let cascading = GateSettings {
            cascade_reset: true,
            downstream_phase: None,
            ..enabled()
        };
        fx.run(cascading, &steps(&["clean"]));
        assert!(!fx.has_snapshot(&fx.downstream));
    }

    #[test]
    fn compile_invalidates_dependents() {
        let fx = Fixture::new();
        fx.record(&fx.downstream);
        fx.run(enabled(), &steps(&["compile"]));
        assert!(!fx.has_snapshot(&fx.downstream));
    }

    #[test]
    fn no_downstream_phase_keeps_dependents() {
        let fx = Fixture::new();
        fx.record(&fx.downstream);
        let settings = GateSettings {
            downstream_phase: None,
            ..enabled()
        };
        fx.run(settings, &steps(&["compile"]));
        assert!(fx.has_snapshot(&fx.downstream));
    }

    #[test]
    fn explicit_steps_always_run() {
        let fx = Fixture::new();
        fx.run(enabled(), &steps(&["compile", "install"]));
        let request = vec![
            BuildStep::for_phase("compile"),
            BuildStep::for_phase("install").explicit(),
        ];
        let outcome = fx.run(enabled(), &request);
        assert_eq!(outcome.executed, vec!["compile", "install"]);
        assert!(outcome.verdict.is_none());
    }

    #[test]
    fn rebuild_runs_only_steps_past_reset() {
        let fx = Fixture::new();
        let request = vec![
            BuildStep::unbound("help"),
            BuildStep::for_phase("clean"),
            BuildStep::for_phase("compile"),
        ];
        let outcome = fx.run(enabled(), &request);
        assert_eq!(outcome.executed, vec!["help", "compile"]);
        assert_eq!(outcome.skipped, vec!["clean"]);
        assert!(matches!(outcome.verdict, Some(Verdict::NeedRebuild(_))));
    }

    #[test]
    fn failing_step_stops_execution() {
        let fx = Fixture::new();
        let mut calls = Vec::new();
        let mut runner = |step: &BuildStep| -> Result<(), StepError> {
            calls.push(step.name.clone());
            if step.name == "compile" {
                Err("compilation failed".into())
            } else {
                Ok(())
            }
        };
        let err = fx
            .gate(enabled())
            .execute(
                &fx.project,
                &[],
                &steps(&["compile", "install"]),
                &mut runner,
            )
            .unwrap_err();
        assert!(matches!(err, GateError::StepFailed { ref step, .. } if step == "compile"));
        assert_eq!(calls, vec!["compile"]);
        assert!(!fx.has_snapshot(&fx.project));
    }

    #[test]
    fn every_reset_segment_step_invalidates() {
        let fx = Fixture::new();
        fx.record(&fx.project);
        let sequencer = PhaseSequencer::new(
            ["validate", "clean", "compile", "install"]
                .map(String::from)
                .to_vec(),
            &["clean"],
        )
        .unwrap();
        let gate = ExecutionGate::new(
            RebuildDecider::new(&sequencer, &fx.scanner, &fx.store),
            enabled(),
        );
        let mut runner = |_: &BuildStep| -> Result<(), StepError> { Ok(()) };
        let outcome = gate
            .execute(&fx.project, &[], &steps(&["validate", "compile"]), &mut runner)
            .unwrap();
        assert_eq!(outcome.executed, vec!["validate", "compile"]);
        assert!(outcome.verdict.is_none());
        assert!(!fx.has_snapshot(&fx.project));
    }

    #[test]
    fn unwritable_store_does_not_fail_build() {
        let fx = Fixture::new();
        let blocker = fx.dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = SnapshotStore::new(&blocker);
        let gate = ExecutionGate::new(
            RebuildDecider::new(&fx.sequencer, &fx.scanner, &store),
            enabled(),
        );
        let mut runner = |_: &BuildStep| -> Result<(), StepError> { Ok(()) };

        let outcome = gate
            .execute(
                &fx.project,
                std::slice::from_ref(&fx.downstream.identity),
                &steps(&["compile", "install"]),
                &mut runner,
            )
            .unwrap();
        assert_eq!(outcome.executed, vec!["compile", "install"]);
        assert!(!store.exists(&store.key_for(&fx.project.identity)));

        let outcome = gate
            .execute(&fx.project, &[], &steps(&["clean", "compile"]), &mut runner)
            .unwrap();
        assert_eq!(outcome.executed, vec!["clean", "compile"]);
    }

    #[test]
    fn unknown_phase_aborts_before_running() {
        let fx = Fixture::new();
        let mut ran = false;
        let mut runner = |_: &BuildStep| -> Result<(), StepError> {
            ran = true;
            Ok(())
        };
        let err = fx
            .gate(enabled())
            .execute(&fx.project, &[], &steps(&["compile", "deploy"]), &mut runner)
            .unwrap_err();
        assert!(matches!(err, GateError::Phase(_)));
        assert!(!ran);
    }
}
