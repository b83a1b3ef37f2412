//! Project identities and their on-disk locations.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// The identity of one buildable unit in a multi-module build.
///
/// Identical tuples always map to the same cache entry. The option set is kept
/// sorted so that the order in which the host activated options never changes
/// the identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectIdentity {
    /// Dotted group id (e.g. `com.example`).
    pub group: String,
    /// Artifact id, unique within the group.
    pub artifact: String,
    /// Version string.
    pub version: String,
    /// Active build options (profiles), sorted and deduplicated.
    pub options: BTreeSet<String>,
}

impl ProjectIdentity {
    /// Creates an identity with no active options.
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
            options: BTreeSet::new(),
        }
    }

    /// Returns this identity with the given options added to the active set.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Returns `group:artifact:version`, without the option set.
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl fmt::Display for ProjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)?;
        if !self.options.is_empty() {
            let opts: Vec<&str> = self.options.iter().map(String::as_str).collect();
            write!(f, " [{}]", opts.join(","))?;
        }
        Ok(())
    }
}

/// Error returned when parsing `group:artifact:version` coordinates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid project coordinates '{input}': expected group:artifact:version")]
pub struct ParseIdentityError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for ProjectIdentity {
    type Err = ParseIdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [group, artifact, version]
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Self::new(*group, *artifact, *version))
            }
            _ => Err(ParseIdentityError {
                input: s.to_string(),
            }),
        }
    }
}

/// A project as seen by the staleness check: its identity plus the
/// directory its sources live under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    /// Cache identity of the project.
    pub identity: ProjectIdentity,
    /// Project root directory (the one holding the build descriptor).
    pub root: PathBuf,
}

impl Project {
    /// Creates a project rooted at `root`.
    pub fn new(identity: ProjectIdentity, root: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            root: root.into(),
        }
    }

    /// Returns the project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.identity.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_are_sorted_and_deduplicated() {
        let a = ProjectIdentity::new("g", "a", "1").with_options(["b", "a", "b"]);
        let b = ProjectIdentity::new("g", "a", "1").with_options(["a", "b"]);
        assert_eq!(a, b);
        assert_eq!(a.options.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn different_options_differ() {
        let a = ProjectIdentity::new("g", "a", "1").with_options(["opt=a"]);
        let b = ProjectIdentity::new("g", "a", "1").with_options(["opt=b"]);
        assert_ne!(a, b);
        assert_eq!(a.coordinates(), b.coordinates());
    }

    #[test]
    fn display_without_options() {
        let id = ProjectIdentity::new("com.example", "app", "1.0");
        assert_eq!(id.to_string(), "com.example:app:1.0");
        assert_eq!(id.coordinates(), "com.example:app:1.0");
    }

    #[test]
    fn display_with_options() {
        let id = ProjectIdentity::new("com.example", "app", "1.0").with_options(["ci", "fast"]);
        assert_eq!(id.to_string(), "com.example:app:1.0 [ci,fast]");
    }

    #[test]
    fn parse_coordinates() {
        let id: ProjectIdentity = "com.example:lib:2.1".parse().unwrap();
        assert_eq!(id.group, "com.example");
        assert_eq!(id.artifact, "lib");
        assert_eq!(id.version, "2.1");
        assert!(id.options.is_empty());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("com.example:lib".parse::<ProjectIdentity>().is_err());
        assert!("a:b:c:d".parse::<ProjectIdentity>().is_err());
        assert!("a::c".parse::<ProjectIdentity>().is_err());
        let err = "bad".parse::<ProjectIdentity>().unwrap_err();
        assert!(err.to_string().contains("'bad'"));
    }

    #[test]
    fn project_display_uses_identity() {
        let p = Project::new(ProjectIdentity::new("g", "a", "1"), "/tmp/a");
        assert_eq!(p.to_string(), "g:a:1");
        assert_eq!(p.root(), Path::new("/tmp/a"));
    }
}
