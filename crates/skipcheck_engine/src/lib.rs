//! Staleness decisions and skip-aware step execution.
//!
//! [`PhaseSequencer`] orders lifecycle phases and finds the reset boundary,
//! [`RebuildDecider`] compares a project's files against its last snapshot,
//! and [`ExecutionGate`] runs or skips a requested step list accordingly.

#![warn(missing_docs)]

pub mod decider;
pub mod error;
pub mod gate;
pub mod phases;
pub mod step;

pub use decider::{RebuildDecider, RebuildReason, Verdict};
pub use error::{GateError, PhaseError, RecordError};
pub use gate::{ExecutionGate, GateOutcome, GateSettings};
pub use phases::PhaseSequencer;
pub use step::{BuildStep, StepError, StepOrigin, StepRunner};
