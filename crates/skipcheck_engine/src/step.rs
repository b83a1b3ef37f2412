//! Build steps and the runner that executes them.

use std::fmt;

/// Error produced by a [`StepRunner`]. The gate never inspects it.
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Where a step came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOrigin {
    /// Derived from the requested lifecycle phases.
    Pipeline,
    /// Requested directly by the user. Never skipped.
    Explicit,
}

/// One unit of build work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Step name, used in logs and errors.
    pub name: String,
    /// Lifecycle phase the step is bound to, if any.
    pub phase: Option<String>,
    /// How the step was requested.
    pub origin: StepOrigin,
}

impl BuildStep {
    /// A pipeline-derived step bound to `phase`.
    pub fn pipeline(name: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: Some(phase.into()),
            origin: StepOrigin::Pipeline,
        }
    }

    /// A pipeline-derived step named after the phase it is bound to.
    pub fn for_phase(phase: impl Into<String>) -> Self {
        let phase = phase.into();
        Self::pipeline(phase.clone(), phase)
    }

    /// A pipeline-derived step with no phase.
    pub fn unbound(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: None,
            origin: StepOrigin::Pipeline,
        }
    }

    /// Marks the step as explicitly requested.
    pub fn explicit(mut self) -> Self {
        self.origin = StepOrigin::Explicit;
        self
    }

    /// Returns the phase name, if any.
    pub fn phase(&self) -> Option<&str> {
        self.phase.as_deref()
    }

    /// Returns `true` for user-requested steps.
    pub fn is_explicit(&self) -> bool {
        self.origin == StepOrigin::Explicit
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.phase {
            Some(phase) if *phase != self.name => write!(f, "{} ({phase})", self.name),
            _ => f.write_str(&self.name),
        }
    }
}

/// Executes build steps on behalf of the gate.
pub trait StepRunner {
    /// Runs one step.
    fn run(&mut self, step: &BuildStep) -> Result<(), StepError>;
}

impl<F> StepRunner for F
where
    F: FnMut(&BuildStep) -> Result<(), StepError>,
{
    fn run(&mut self, step: &BuildStep) -> Result<(), StepError> {
        self(step)
    }
}
