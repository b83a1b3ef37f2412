//! Shared foundational types used across the skipcheck crates.
//!
//! This crate provides project identities (the tuple every cache entry is keyed
//! by) and a cooperative cancellation flag for long-running filesystem scans.

#![warn(missing_docs)]

pub mod cancel;
pub mod identity;

pub use cancel::CancelFlag;
pub use identity::{ParseIdentityError, Project, ProjectIdentity};
