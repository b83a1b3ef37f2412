//! User and system property layers.

use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Property key that switches the staleness check on.
pub const BUILD_CHECK_ENABLED: &str = "build.check.enabled";

/// A flat string-to-string property table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// Creates an empty property table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the value of `key`, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if no property is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses `key=value` assignments as given on a command line.
    ///
    /// A bare `key` sets the property to `"true"`.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut props = Self::new();
        for assignment in assignments {
            let raw = assignment.as_ref();
            let (key, value) = match raw.split_once('=') {
                Some((key, value)) => (key.trim(), value),
                None => (raw.trim(), "true"),
            };
            if key.is_empty() {
                return Err(ConfigError::InvalidProperty(raw.to_string()));
            }
            props.insert(key, value);
        }
        Ok(props)
    }
}

impl FromIterator<(String, String)> for Properties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolves a boolean property: user properties first, then system
/// properties, then `default`.
///
/// A present value is `true` only if it equals `"true"` ignoring ASCII case;
/// any other present value is `false`.
pub fn resolve_flag(user: &Properties, system: &Properties, key: &str, default: bool) -> bool {
    match user.get(key).or_else(|| system.get(key)) {
        Some(value) => value.eq_ignore_ascii_case("true"),
        None => default,
    }
}
