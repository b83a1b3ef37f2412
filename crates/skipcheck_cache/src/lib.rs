//! Snapshot storage and file-set scanning for the staleness check.
//!
//! [`FileScanner`] enumerates the files that make up a project and
//! [`SnapshotStore`] persists the set seen at the last successful build as a
//! versioned, checksummed record that is published atomically.

#![warn(missing_docs)]

pub mod error;
pub mod record;
pub mod scanner;
pub mod store;

pub use error::{CacheError, ScanError};
pub use record::{decode_record, encode_record, RecordHeader, RECORD_FORMAT_VERSION};
pub use scanner::{FileScanner, FileSet, DEFAULT_SOURCE_DIR};
pub use store::{PendingSnapshot, Snapshot, SnapshotKey, SnapshotPrefix, SnapshotStore, SNAPSHOT_EXT};
