//! Error types for phase resolution and gated execution.
//!
//! Only structural problems surface here. Storage and filesystem failures are
//! absorbed by the decider and turn into a rebuild.

use skipcheck_cache::{CacheError, ScanError};

use crate::step::StepError;

/// Errors raised by the phase sequencer. All of them are fatal: a step list
/// that cannot be ordered must never be guessed at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// A phase name is not part of the canonical order.
    #[error("unknown phase '{phase}'")]
    UnknownPhase {
        /// The offending phase name.
        phase: String,
    },

    /// The highest phase of an empty step list was requested.
    #[error("cannot resolve the highest phase of an empty step list")]
    EmptyInput,

    /// A phase appears more than once in the canonical order.
    #[error("phase '{phase}' appears more than once in the phase order")]
    DuplicatePhase {
        /// The repeated phase name.
        phase: String,
    },

    /// No reset phases were supplied.
    #[error("the reset phase group is empty")]
    EmptyResetGroup,
}

/// Errors returned by [`ExecutionGate::execute`](crate::ExecutionGate::execute).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The step list references an unknown phase.
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// A build step failed. Steps after it were not run.
    #[error("step '{step}' failed: {source}")]
    StepFailed {
        /// Name of the failed step.
        step: String,
        /// The runner's error.
        source: StepError,
    },
}

/// Errors from recording a snapshot. Never fatal to a build.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The project's files could not be enumerated.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The record could not be written.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
