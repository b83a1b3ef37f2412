//! The rebuild decision and snapshot maintenance.
//!
//! Every branch with incomplete evidence resolves to a rebuild. Storage and
//! scan failures are logged and never propagated from [`RebuildDecider::decide`];
//! only an unusable step list is an error.

use std::fmt;

use skipcheck_cache::{CacheError, FileScanner, SnapshotStore};
use skipcheck_common::{Project, ProjectIdentity};
use tracing::{debug, info, warn};

use crate::error::{PhaseError, RecordError};
use crate::phases::PhaseSequencer;
use crate::step::BuildStep;

/// Why a project has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// The request never gets past the reset group.
    NotPastReset,
    /// No snapshot has been recorded.
    NoSnapshot,
    /// A file is newer than the snapshot.
    NewerFiles,
    /// Files were added or removed since the snapshot.
    FileSetChanged {
        /// Files present now but not recorded.
        added: usize,
        /// Recorded files that are gone.
        removed: usize,
    },
    /// The snapshot was replaced while it was being checked.
    SnapshotReplaced,
    /// The snapshot exists but could not be read or decoded.
    CacheUnreadable,
    /// The project's files could not be enumerated.
    ScanFailed,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPastReset => f.write_str("requested phases do not go past the reset group"),
            Self::NoSnapshot => f.write_str("no snapshot recorded"),
            Self::NewerFiles => f.write_str("files changed since the last build"),
            Self::FileSetChanged { added, removed } => {
                write!(f, "file set changed ({added} added, {removed} removed)")
            }
            Self::SnapshotReplaced => f.write_str("snapshot replaced during check"),
            Self::CacheUnreadable => f.write_str("snapshot unreadable"),
            Self::ScanFailed => f.write_str("project files could not be scanned"),
        }
    }
}

/// Outcome of a staleness decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The build steps must run.
    NeedRebuild(RebuildReason),
    /// Nothing relevant changed since the last successful build.
    MayBeCached,
}

impl Verdict {
    /// Returns `true` for [`Verdict::NeedRebuild`].
    pub fn is_rebuild(&self) -> bool {
        matches!(self, Self::NeedRebuild(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedRebuild(reason) => write!(f, "rebuild: {reason}"),
            Self::MayBeCached => f.write_str("up to date"),
        }
    }
}

/// Decides whether a project must rebuild and maintains its snapshots.
#[derive(Debug, Clone, Copy)]
pub struct RebuildDecider<'a> {
    sequencer: &'a PhaseSequencer,
    scanner: &'a FileScanner,
    store: &'a SnapshotStore,
}

impl<'a> RebuildDecider<'a> {
    /// Creates a decider over the given collaborators.
    pub fn new(
        sequencer: &'a PhaseSequencer,
        scanner: &'a FileScanner,
        store: &'a SnapshotStore,
    ) -> Self {
        Self {
            sequencer,
            scanner,
            store,
        }
    }

    /// The phase sequencer in use.
    pub fn sequencer(&self) -> &'a PhaseSequencer {
        self.sequencer
    }

    /// Decides whether `project` must rebuild to run `steps`.
    ///
    /// Fails only if `steps` is empty or names an unknown phase.
    pub fn decide(&self, project: &Project, steps: &[BuildStep]) -> Result<Verdict, PhaseError> {
        let highest = self.sequencer.resolve_highest_phase(steps)?;
        self.sequencer.validate(steps)?;

        let past_reset = match highest {
            Some(phase) => self.sequencer.is_after_reset_group(phase)?,
            None => false,
        };
        let verdict = if past_reset {
            self.check_snapshot(project)
        } else {
            Verdict::NeedRebuild(RebuildReason::NotPastReset)
        };
        debug!(project = %project, %verdict, "staleness decision");
        Ok(verdict)
    }

    fn check_snapshot(&self, project: &Project) -> Verdict {
        let key = self.store.key_for(&project.identity);
        if !self.store.exists(&key) {
            debug!(project = %project, path = %key.path().display(), "no snapshot");
            return Verdict::NeedRebuild(RebuildReason::NoSnapshot);
        }

        let reference = match self.store.recorded_at(&key) {
            Ok(time) => time,
            Err(e) => return unreadable(project, e),
        };
        match self.scanner.has_any_newer_than(project.root(), reference) {
            Ok(true) => return Verdict::NeedRebuild(RebuildReason::NewerFiles),
            Ok(false) => {}
            Err(e) => {
                warn!(project = %project, error = %e, "could not scan for newer files");
                return Verdict::NeedRebuild(RebuildReason::ScanFailed);
            }
        }

        let snapshot = match self.store.read(&key) {
            Ok(snapshot) => snapshot,
            Err(e) => return unreadable(project, e),
        };
        if snapshot.recorded_at != reference {
            return Verdict::NeedRebuild(RebuildReason::SnapshotReplaced);
        }

        let current = match self.scanner.list_files(project.root()) {
            Ok(files) => files,
            Err(e) => {
                warn!(project = %project, error = %e, "could not list project files");
                return Verdict::NeedRebuild(RebuildReason::ScanFailed);
            }
        };
        if current != snapshot.files {
            let added = current.difference(&snapshot.files).count();
            let removed = snapshot.files.difference(&current).count();
            return Verdict::NeedRebuild(RebuildReason::FileSetChanged { added, removed });
        }
        Verdict::MayBeCached
    }

    /// Records the project's current file set. Returns the number of files.
    ///
    /// The record's timestamp is taken before the scan starts. A failed or
    /// cancelled scan publishes nothing.
    pub fn record_snapshot(&self, project: &Project) -> Result<usize, RecordError> {
        let key = self.store.key_for(&project.identity);
        let pending = self.store.begin_write(&key)?;
        let files = self.scanner.list_files(project.root())?;
        pending.commit(&files)?;
        info!(project = %project, files = files.len(), "recorded snapshot");
        Ok(files.len())
    }

    /// Deletes every snapshot of `identity`, whatever its options.
    ///
    /// A failed delete is retried once, then logged and returned.
    pub fn invalidate(&self, identity: &ProjectIdentity) -> Result<usize, CacheError> {
        let prefix = self.store.prefix_for(identity);
        let removed = match self.store.delete_all_matching_prefix(&prefix) {
            Ok(removed) => removed,
            Err(first) => {
                debug!(project = %identity, error = %first, "retrying snapshot invalidation");
                self.store.delete_all_matching_prefix(&prefix).map_err(|e| {
                    warn!(project = %identity, error = %e, "could not invalidate snapshot");
                    e
                })?
            }
        };
        if removed > 0 {
            debug!(project = %identity, removed, "invalidated snapshots");
        }
        Ok(removed)
    }

    /// Invalidates the snapshots of every project depending on `project`.
    /// Returns the number of records removed; failures are logged.
    pub fn invalidate_downstream(&self, project: &Project, dependents: &[ProjectIdentity]) -> usize {
        let removed = dependents
            .iter()
            .filter_map(|dependent| self.invalidate(dependent).ok())
            .sum();
        debug!(project = %project, dependents = dependents.len(), removed, "invalidated downstream snapshots");
        removed
    }
}

fn unreadable(project: &Project, err: CacheError) -> Verdict {
    if err.is_miss() {
        debug!(project = %project, error = %err, "snapshot vanished");
        Verdict::NeedRebuild(RebuildReason::NoSnapshot)
    } else {
        warn!(project = %project, error = %err, "ignoring unusable snapshot");
        Verdict::NeedRebuild(RebuildReason::CacheUnreadable)
    }
}
