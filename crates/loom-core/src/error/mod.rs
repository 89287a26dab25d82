//! Error types for Loom
//!
//! A single crate-wide error enum, [`LoomError`], covers configuration,
//! provider, storage and serialization failures. Tool-call protocol
//! violations have their own enum, [`crate::tools::ToolParseError`], which
//! converts into `LoomError::Parse` when it crosses the client boundary.

mod constructors;
mod conversions;
mod types;

pub use types::{LoomError, LoomResult, ResultExt};
