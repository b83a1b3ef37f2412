//! Canonical lifecycle phase ordering.

use std::collections::HashMap;

use crate::error::PhaseError;
use crate::step::BuildStep;

/// Orders lifecycle phases and locates the end of the reset group.
///
/// The order is fixed at construction. The reset boundary is the latest of
/// the reset phases in that order; a phase is "after the reset group" iff it
/// comes strictly later than the boundary.
#[derive(Debug, Clone)]
pub struct PhaseSequencer {
    phases: Vec<String>,
    index: HashMap<String, usize>,
    reset: Vec<usize>,
    boundary: usize,
}

impl PhaseSequencer {
    /// Creates a sequencer over `phases`, with `reset_group` naming the phases
    /// whose steps wipe prior build output.
    pub fn new<S: AsRef<str>>(phases: Vec<String>, reset_group: &[S]) -> Result<Self, PhaseError> {
        let mut index = HashMap::with_capacity(phases.len());
        for (i, phase) in phases.iter().enumerate() {
            if index.insert(phase.clone(), i).is_some() {
                return Err(PhaseError::DuplicatePhase {
                    phase: phase.clone(),
                });
            }
        }

        let reset = reset_group
            .iter()
            .map(|p| {
                index.get(p.as_ref()).copied().ok_or_else(|| PhaseError::UnknownPhase {
                    phase: p.as_ref().to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let boundary = reset.iter().copied().max().ok_or(PhaseError::EmptyResetGroup)?;

        Ok(Self {
            phases,
            index,
            reset,
            boundary,
        })
    }

    /// The last phase of the reset group.
    pub fn boundary(&self) -> &str {
        &self.phases[self.boundary]
    }

    /// Position of `phase` in the canonical order.
    pub fn position(&self, phase: &str) -> Result<usize, PhaseError> {
        self.index
            .get(phase)
            .copied()
            .ok_or_else(|| PhaseError::UnknownPhase {
                phase: phase.to_string(),
            })
    }

    /// Returns `true` if `phase` belongs to the reset group itself.
    pub fn is_reset_phase(&self, phase: &str) -> Result<bool, PhaseError> {
        let pos = self.position(phase)?;
        Ok(self.reset.contains(&pos))
    }

    /// Returns `true` if `phase` is strictly later than the reset boundary.
    pub fn is_after_reset_group(&self, phase: &str) -> Result<bool, PhaseError> {
        Ok(self.position(phase)? > self.boundary)
    }

    /// Returns the phase of the last step.
    ///
    /// `Ok(None)` means the last step has no phase.
    pub fn resolve_highest_phase<'s>(
        &self,
        steps: &'s [BuildStep],
    ) -> Result<Option<&'s str>, PhaseError> {
        let last = steps.last().ok_or(PhaseError::EmptyInput)?;
        match last.phase() {
            Some(phase) => {
                self.position(phase)?;
                Ok(Some(phase))
            }
            None => Ok(None),
        }
    }

    /// Splits `steps` into the reset segment and the remainder.
    ///
    /// The reset segment is the longest prefix of steps whose phases are at
    /// or before the reset boundary. A step without a phase ends the prefix.
    pub fn split_reset_segment<'s>(
        &self,
        steps: &'s [BuildStep],
    ) -> Result<(&'s [BuildStep], &'s [BuildStep]), PhaseError> {
        let mut end = 0;
        for step in steps {
            match step.phase() {
                Some(phase) if !self.is_after_reset_group(phase)? => end += 1,
                _ => break,
            }
        }
        self.validate(&steps[end..])?;
        Ok(steps.split_at(end))
    }

    /// Checks that every phase-bound step names a known phase.
    pub fn validate(&self, steps: &[BuildStep]) -> Result<(), PhaseError> {
        for phase in steps.iter().filter_map(BuildStep::phase) {
            self.position(phase)?;
        }
        Ok(())
    }
}
