//! Error types for snapshot storage and file-set scanning.

use std::path::PathBuf;

/// Errors that can occur while reading, writing or deleting snapshot records.
///
/// Callers deciding whether to rebuild treat every read error as "no usable
/// cache": [`is_miss`](Self::is_miss) separates an absent record from a
/// present but unusable one ([`is_corrupt`](Self::is_corrupt)) for reporting.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing snapshot files.
    #[error("snapshot I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No snapshot record exists for the requested key.
    #[error("no snapshot at {path}")]
    Missing {
        /// The expected record path.
        path: PathBuf,
    },

    /// The record header is missing, truncated or has the wrong magic bytes.
    #[error("invalid snapshot header in {path}: {reason}")]
    InvalidHeader {
        /// The record path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored checksum does not match the checksum of the payload.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The record path.
        path: PathBuf,
        /// The checksum stored in the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// The record was written in a different format version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The record path.
        path: PathBuf,
        /// The format version this build reads.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// The record belongs to a different project identity.
    #[error("identity mismatch in {path}: expected '{expected}', found '{actual}'")]
    IdentityMismatch {
        /// The record path.
        path: PathBuf,
        /// Identity the caller asked for.
        expected: String,
        /// Identity stored in the record.
        actual: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("snapshot serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}

impl CacheError {
    /// Returns `true` if the record simply does not exist.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// Returns `true` if a record exists but cannot be used.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::InvalidHeader { .. }
                | Self::ChecksumMismatch { .. }
                | Self::VersionMismatch { .. }
                | Self::IdentityMismatch { .. }
                | Self::Serialization { .. }
        )
    }
}

/// Errors that can occur while enumerating a project's files.
///
/// A scan failure means the file set is unknown. It never means "no files".
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Reading file metadata failed.
    #[error("failed to scan {path}: {source}")]
    Io {
        /// The path being inspected.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// The directory being walked.
        path: PathBuf,
        /// The underlying traversal error.
        source: walkdir::Error,
    },

    /// A file name could not be represented as UTF-8.
    #[error("file name is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// The scan was cancelled by the host.
    #[error("scan cancelled")]
    Cancelled,
}
