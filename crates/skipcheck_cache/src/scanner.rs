//! Enumeration of the files that make up a project.
//!
//! A project's file set is every regular file under its source directory
//! (recursively) plus the non-hidden regular files directly in its root
//! (one level only). Paths are reported relative to the project root with
//! `/` separators, so the set is independent of where the checkout lives.

use std::collections::BTreeSet;
use std::io;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use skipcheck_common::CancelFlag;
use walkdir::{DirEntry, WalkDir};

use crate::error::ScanError;

/// A set of project-relative file paths.
pub type FileSet = BTreeSet<String>;

/// Default name of the recursively scanned source directory.
pub const DEFAULT_SOURCE_DIR: &str = "src";

/// Walks a project's source tree and root directory.
#[derive(Debug, Clone)]
pub struct FileScanner {
    source_dir: String,
    cancel: CancelFlag,
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_DIR)
    }
}

impl FileScanner {
    /// Creates a scanner that recurses into `<root>/<source_dir>`.
    pub fn new(source_dir: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            cancel: CancelFlag::new(),
        }
    }

    /// Attaches a cancellation flag polled between directory entries.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the source directory name.
    pub fn source_dir(&self) -> &str {
        &self.source_dir
    }

    /// Lists every file in the project's scan scope.
    pub fn list_files(&self, root: &Path) -> Result<FileSet, ScanError> {
        let mut files = FileSet::new();
        self.visit(root, None, &mut |rel| {
            files.insert(rel);
            ControlFlow::Continue(())
        })?;
        Ok(files)
    }

    /// Lists the files whose modification time is strictly after `reference`.
    pub fn list_files_newer_than(
        &self,
        root: &Path,
        reference: SystemTime,
    ) -> Result<FileSet, ScanError> {
        let mut files = FileSet::new();
        self.visit(root, Some(reference), &mut |rel| {
            files.insert(rel);
            ControlFlow::Continue(())
        })?;
        Ok(files)
    }

    /// Returns `true` as soon as one file newer than `reference` is found.
    pub fn has_any_newer_than(&self, root: &Path, reference: SystemTime) -> Result<bool, ScanError> {
        let mut found = false;
        self.visit(root, Some(reference), &mut |_| {
            found = true;
            ControlFlow::Break(())
        })?;
        Ok(found)
    }

    /// Visits the scan scope, calling `f` for every file that passes the
    /// optional `newer_than` filter, until `f` breaks.
    fn visit(
        &self,
        root: &Path,
        newer_than: Option<SystemTime>,
        f: &mut dyn FnMut(String) -> ControlFlow<()>,
    ) -> Result<(), ScanError> {
        let source = root.join(&self.source_dir);
        let walkers = [
            (WalkDir::new(&source).follow_links(false), false),
            (
                WalkDir::new(root).min_depth(1).max_depth(1).follow_links(false),
                true,
            ),
        ];

        for (walker, at_root) in walkers {
            for entry in walker {
                if self.cancel.is_cancelled() {
                    return Err(ScanError::Cancelled);
                }
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) if is_not_found(&err) && (err.depth() > 0 || !at_root) => {
                        // Missing source tree, or a file removed mid-walk.
                        continue;
                    }
                    Err(err) => {
                        let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| {
                            if at_root {
                                root.to_path_buf()
                            } else {
                                source.clone()
                            }
                        });
                        return Err(ScanError::Walk { path, source: err });
                    }
                };
                if !entry.file_type().is_file() || (at_root && is_hidden(&entry)) {
                    continue;
                }
                if let Some(reference) = newer_than {
                    match modified(&entry) {
                        Ok(Some(mtime)) if mtime > reference => {}
                        Ok(_) => continue,
                        Err(source) => {
                            return Err(ScanError::Io {
                                path: entry.path().to_path_buf(),
                                source,
                            })
                        }
                    }
                }
                if f(relative_path(root, entry.path())?).is_break() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound)
}

/// Returns the entry's modification time, or `None` if it vanished.
fn modified(entry: &DirEntry) -> io::Result<Option<SystemTime>> {
    match entry.metadata() {
        Ok(meta) => meta.modified().map(Some),
        Err(err) if is_not_found(&err) => Ok(None),
        Err(err) => Err(err
            .into_io_error()
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "metadata unavailable"))),
    }
}

/// Joins the components of `path` below `root` with `/`. Names that are not
/// valid UTF-8 are rejected rather than lossily converted.
fn relative_path(root: &Path, path: &Path) -> Result<String, ScanError> {
    let rel: PathBuf = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let parts = rel
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| ScanError::NonUtf8Path {
                path: path.to_path_buf(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("/"))
}
