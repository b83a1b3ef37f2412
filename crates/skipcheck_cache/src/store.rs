//! On-disk snapshot storage.
//!
//! Snapshots live at
//! `<base>/<group segments>/<artifact>/<version>/<artifact>-<version>[-<opt>...].files`.
//! Every option variant of one project shares a directory and a file-name
//! stem, so all of them can be invalidated together without looking at any
//! other project's records.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use filetime::FileTime;
use skipcheck_common::ProjectIdentity;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CacheError;
use crate::record::{decode_record, encode_record};
use crate::scanner::FileSet;

/// File extension of snapshot records.
pub const SNAPSHOT_EXT: &str = "files";

/// Location shared by every option variant of one project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotPrefix {
    dir: PathBuf,
    stem: String,
}

impl SnapshotPrefix {
    /// Directory holding the records.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The `<artifact>-<version>` file-name stem.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    fn matches(&self, file_name: &str) -> bool {
        let Some(base) = file_name.strip_suffix(SNAPSHOT_EXT).and_then(|b| b.strip_suffix('.'))
        else {
            return false;
        };
        base == self.stem
            || base
                .strip_prefix(self.stem.as_str())
                .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// Storage key of a single snapshot record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    prefix: SnapshotPrefix,
    file_name: String,
    identity: String,
}

impl SnapshotKey {
    /// Full path of the record.
    pub fn path(&self) -> PathBuf {
        self.prefix.dir.join(&self.file_name)
    }

    /// Record file name, including the option suffix.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Identity tag written into the record header.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The prefix shared with the project's other option variants.
    pub fn prefix(&self) -> &SnapshotPrefix {
        &self.prefix
    }
}

/// A decoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The recorded file set.
    pub files: FileSet,
    /// Modification time of the record, the reference for newer-file checks.
    pub recorded_at: SystemTime,
}

/// Reads, writes and deletes snapshot records under a base directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    base_dir: PathBuf,
}

impl SnapshotStore {
    /// Creates a store rooted at `base_dir`. Nothing is created on disk until
    /// the first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the location shared by all option variants of `identity`.
    pub fn prefix_for(&self, identity: &ProjectIdentity) -> SnapshotPrefix {
        let mut dir = self.base_dir.clone();
        for segment in identity.group.split('.') {
            dir.push(escape_component(segment));
        }
        let artifact = escape_component(&identity.artifact);
        let version = escape_component(&identity.version);
        dir.push(&artifact);
        dir.push(&version);
        SnapshotPrefix {
            dir,
            stem: format!("{artifact}-{version}"),
        }
    }

    /// Returns the key of the record for `identity` and its exact option set.
    pub fn key_for(&self, identity: &ProjectIdentity) -> SnapshotKey {
        let prefix = self.prefix_for(identity);
        let options: Vec<String> = identity.options.iter().map(|o| escape_option(o)).collect();

        let mut file_name = prefix.stem.clone();
        for option in &options {
            file_name.push('-');
            file_name.push_str(option);
        }
        file_name.push('.');
        file_name.push_str(SNAPSHOT_EXT);

        SnapshotKey {
            identity: format!("{}[{}]", identity.coordinates(), options.join(",")),
            prefix,
            file_name,
        }
    }

    /// Returns `true` if a record is present for `key`.
    pub fn exists(&self, key: &SnapshotKey) -> bool {
        key.path().is_file()
    }

    /// Returns the record's modification time.
    pub fn recorded_at(&self, key: &SnapshotKey) -> Result<SystemTime, CacheError> {
        let path = key.path();
        let meta = fs::metadata(&path).map_err(|e| io_error(&path, e))?;
        meta.modified().map_err(|e| io_error(&path, e))
    }

    /// Reads and validates the record for `key`.
    ///
    /// The content and the timestamp come from the same open handle, so a
    /// concurrent replacement cannot pair one record's files with another's
    /// timestamp.
    pub fn read(&self, key: &SnapshotKey) -> Result<Snapshot, CacheError> {
        let path = key.path();
        let mut file = File::open(&path).map_err(|e| io_error(&path, e))?;
        let recorded_at = file
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| io_error(&path, e))?;
        let mut raw = Vec::new();
        file.read_to_end(&mut raw).map_err(|e| io_error(&path, e))?;

        let files = decode_record(&path, key.identity(), &raw)?;
        Ok(Snapshot { files, recorded_at })
    }

    /// Starts a write for `key`.
    ///
    /// The temporary record is created now, and its modification time becomes
    /// the snapshot's reference. Scan the project after this call and pass
    /// the result to [`PendingSnapshot::commit`]; any file touched while
    /// scanning is then strictly newer than the published record.
    pub fn begin_write(&self, key: &SnapshotKey) -> Result<PendingSnapshot, CacheError> {
        let dir = key.prefix.dir();
        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let file = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| io_error(dir, e))?;
        let reference = file
            .as_file()
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| io_error(file.path(), e))?;
        Ok(PendingSnapshot {
            key: key.clone(),
            file,
            reference,
        })
    }

    /// Writes `files` as the record for `key`, replacing any previous one.
    pub fn write(&self, key: &SnapshotKey, files: &FileSet) -> Result<(), CacheError> {
        self.begin_write(key)?.commit(files)
    }

    /// Deletes the record for `key`. Returns `false` if there was none.
    pub fn delete(&self, key: &SnapshotKey) -> Result<bool, CacheError> {
        let path = key.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "deleted snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    /// Deletes every option variant sharing `prefix`. Returns the number of
    /// records removed.
    pub fn delete_all_matching_prefix(&self, prefix: &SnapshotPrefix) -> Result<usize, CacheError> {
        let entries = match fs::read_dir(prefix.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error(prefix.dir(), e)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(prefix.dir(), e))?;
            let name = entry.file_name();
            if !name.to_str().is_some_and(|n| prefix.matches(n)) {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&path, e)),
            }
        }
        debug!(dir = %prefix.dir().display(), stem = prefix.stem(), removed, "deleted snapshot variants");
        Ok(removed)
    }
}

/// A record being written. Dropping it without committing removes the
/// temporary file and leaves any previous record untouched.
#[derive(Debug)]
pub struct PendingSnapshot {
    key: SnapshotKey,
    file: NamedTempFile,
    reference: SystemTime,
}

impl PendingSnapshot {
    #[cfg(test)]
    fn reference(&self) -> SystemTime {
        self.reference
    }

    /// Encodes `files`, syncs the record and renames it into place.
    pub fn commit(mut self, files: &FileSet) -> Result<(), CacheError> {
        let bytes = encode_record(self.key.identity(), files)?;
        let tmp = self.file.path().to_path_buf();

        self.file
            .write_all(&bytes)
            .map_err(|e| io_error(&tmp, e))?;
        filetime::set_file_handle_times(
            self.file.as_file(),
            None,
            Some(FileTime::from_system_time(self.reference)),
        )
        .map_err(|e| io_error(&tmp, e))?;
        self.file.as_file().sync_all().map_err(|e| io_error(&tmp, e))?;

        let path = self.key.path();
        self.file
            .persist(&path)
            .map_err(|e| io_error(&path, e.error))?;
        debug!(path = %path.display(), entries = files.len(), "wrote snapshot");
        Ok(())
    }
}

fn io_error(path: &Path, source: io::Error) -> CacheError {
    if source.kind() == io::ErrorKind::NotFound {
        CacheError::Missing {
            path: path.to_path_buf(),
        }
    } else {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Escapes characters and names that would change the directory structure.
fn escape_component(value: &str) -> String {
    match value {
        "" => "%00".to_string(),
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => escape(value, &['%', '/', '\\']),
    }
}

/// Escapes characters that would make the option suffix ambiguous.
fn escape_option(value: &str) -> String {
    escape(value, &['%', '-', '/', '\\'])
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}
