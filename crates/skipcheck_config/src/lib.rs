//! Parsing and validation of `skipcheck.toml` project configuration files.
//!
//! This crate reads the project configuration file, resolves the staleness
//! check enablement flag from user and system properties, and flattens the
//! declared lifecycles into the canonical phase order used by the engine.

#![warn(missing_docs)]

pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod properties;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use lifecycle::{standard_lifecycles, LifecycleDef};
pub use loader::{find_project_root, load_config, load_config_from_str, CONFIG_FILE};
pub use properties::{resolve_flag, Properties, BUILD_CHECK_ENABLED};
pub use resolve::{resolve_check, ResolvedCheck};
pub use types::*;
