//! `skipcheck run`: execute phase commands through the execution gate.
//!
//! Each requested phase becomes one step. A step runs the `[steps]` command
//! configured for its phase through `sh -c` in the project root; phases
//! without a command succeed without doing anything.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use skipcheck_engine::{BuildStep, ExecutionGate, StepError, StepRunner};
use tracing::debug;

use crate::pipeline::{steps_from_phases, Session};
use crate::{GlobalArgs, RunArgs};

/// Runs configured shell commands for build steps.
struct ShellRunner<'a> {
    commands: &'a BTreeMap<String, String>,
    root: &'a Path,
    quiet: bool,
}

impl StepRunner for ShellRunner<'_> {
    fn run(&mut self, step: &BuildStep) -> Result<(), StepError> {
        let Some(command) = step.phase().and_then(|phase| self.commands.get(phase)) else {
            debug!(step = %step, "no command configured");
            return Ok(());
        };
        if !self.quiet {
            eprintln!("   Running {step}: {command}");
        }
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.root)
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("`{command}` exited with {status}").into())
        }
    }
}

/// Runs the `skipcheck run` command.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(global)?;
    let steps = steps_from_phases(&args.phases, args.explicit);
    let gate = ExecutionGate::new(session.decider(), session.gate_settings());
    let mut runner = ShellRunner {
        commands: &session.steps,
        root: session.project.root(),
        quiet: global.quiet,
    };

    let outcome = gate.execute(&session.project, &args.dependents, &steps, &mut runner)?;

    if !global.quiet {
        if outcome.skipped.is_empty() {
            eprintln!(
                "    Finished {} step(s) for {}",
                outcome.executed.len(),
                session.project
            );
        } else {
            eprintln!(
                "    Finished {} step(s) for {}, skipped {}: {}",
                outcome.executed.len(),
                session.project,
                outcome.skipped.len(),
                outcome.skipped.join(", ")
            );
        }
    }
    Ok(0)
}
