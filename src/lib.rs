//! Arbor: a content-addressed version-control engine
//!
//! The crate is split the same way a repository is:
//!
//! - `areas`: stateful parts of a repository (object database, index, refs, workspace)
//! - `artifacts`: object model, file formats and the algorithms built on top of them
//! - `commands`: one operation per file, each implemented on [`Repository`]
//! - `errors`: the error kinds surfaced to callers

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;

pub use areas::repository::Repository;
pub use errors::ArborError;
